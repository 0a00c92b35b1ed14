use std::env;
use std::sync::{Arc, Mutex, OnceLock};

use baja_cli::commands::list::{self, ListArgs};
use baja_cli::commands::{config, migrate, seed};
use baja_core::domain::actor::{Actor, ActorRole};
use baja_core::domain::request::DeclineType;
use baja_core::workflow::{CommandContext, CreateRequestCommand, EvaluationCommand};
use baja_core::DecommissionService;
use baja_db::{
    connect_with_settings, migrations, DemoEquipmentDataset, InMemoryDocumentStore,
    SqlEquipmentCatalog, SqlRequestRepository,
};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(
        &[("BAJA_DATABASE_URL", "sqlite::memory:"), ("BAJA_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
        },
    );
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("BAJA_DATABASE_URL", "postgres://localhost/baja")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_demo_catalog_idempotently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = file_database_url(dir.path());

    with_env(&[("BAJA_DATABASE_URL", url.as_str())], || {
        let first = seed::run(false);
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");

        let message = first_payload["message"].as_str().unwrap_or("");
        assert!(message.contains("  - EQ-AUTO-001: Autoclave 23L"));
        assert!(message.contains("  - EQ-US-005: Ultrasonic scaler"));

        let second = seed::run(false);
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        assert_eq!(first_payload["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn seed_clean_removes_demo_catalog() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = file_database_url(dir.path());

    with_env(&[("BAJA_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run(false).exit_code, 0);

        let cleaned = seed::run(true);
        assert_eq!(cleaned.exit_code, 0);
        assert_eq!(parse_payload(&cleaned.output)["message"], "removed 5 demo equipment rows");

        let again = seed::run(true);
        assert_eq!(parse_payload(&again.output)["message"], "removed 0 demo equipment rows");
    });
}

#[test]
fn config_attributes_env_sources() {
    with_env(
        &[("BAJA_WORKFLOW_REQUEST_CODE_PREFIX", "EQ"), ("BAJA_LOG_LEVEL", "debug")],
        || {
            let output = config::run();

            assert!(output.starts_with("effective config"));
            assert!(output.contains(
                "- workflow.request_code_prefix = EQ (source: env (BAJA_WORKFLOW_REQUEST_CODE_PREFIX))"
            ));
            assert!(output.contains("- logging.level = debug (source: env (BAJA_LOG_LEVEL))"));
            assert!(output.contains("- server.port = 8080 (source: default)"));
        },
    );
}

#[test]
fn list_rejects_unknown_state_before_touching_the_database() {
    with_env(&[("BAJA_DATABASE_URL", "postgres://not-used")], || {
        let result =
            list::run(ListArgs { state: Some("archived".to_string()), ..ListArgs::default() });

        assert_eq!(result.exit_code, 2);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "list");
        assert_eq!(payload["error_class"], "invalid_argument");
    });
}

#[test]
fn list_reports_filtered_page_with_total() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = file_database_url(dir.path());
    store_two_requests_one_approved(&url);

    with_env(&[("BAJA_DATABASE_URL", url.as_str())], || {
        let pending =
            list::run(ListArgs { state: Some("pending".to_string()), ..ListArgs::default() });
        assert_eq!(pending.exit_code, 0, "unexpected output: {}", pending.output);

        let payload = parse_payload(&pending.output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["total"], 1);
        assert_eq!(payload["data"]["items"][0]["state"], "pending");
        assert_eq!(payload["data"]["items"][0]["equipment_code"], "EQ-MON-002");

        let everything = list::run(ListArgs {
            page_size: Some(1),
            order_by: Some("equipment_name".to_string()),
            order_direction: Some("asc".to_string()),
            ..ListArgs::default()
        });
        let payload = parse_payload(&everything.output);
        assert_eq!(payload["data"]["total"], 2);
        assert_eq!(payload["data"]["total_pages"], 2);
        assert_eq!(payload["data"]["items"][0]["equipment_name"], "Autoclave 23L");
    });
}

fn store_two_requests_one_approved(url: &str) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    runtime.block_on(async {
        let pool = connect_with_settings(url, 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoEquipmentDataset::load(&pool).await.expect("seed equipment");

        let service = DecommissionService::new(
            Arc::new(SqlRequestRepository::new(pool.clone())),
            Arc::new(InMemoryDocumentStore::default()),
            Arc::new(SqlEquipmentCatalog::new(pool.clone())),
        );
        let admin =
            CommandContext::new(Actor::new("admin", "Admin", ActorRole::Administrator), "cli-test");

        let autoclave = service
            .create_request(
                &admin,
                CreateRequestCommand::new(
                    "EQ-AUTO-001",
                    DeclineType::IrreparableDamage,
                    "chamber cracked",
                    "Dr. Rojas",
                ),
            )
            .await
            .expect("create autoclave request");
        service
            .create_request(
                &admin,
                CreateRequestCommand::new(
                    "EQ-MON-002",
                    DeclineType::TechnologicalObsolescence,
                    "vendor ended support",
                    "Dr. Rojas",
                ),
            )
            .await
            .expect("create monitor request");
        service
            .approve_request(&admin, &autoclave.id, EvaluationCommand::new("beyond repair"))
            .await
            .expect("approve autoclave request");

        pool.close().await;
    });
}

fn file_database_url(dir: &std::path::Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("baja.db").display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BAJA_DATABASE_URL",
        "BAJA_DATABASE_MAX_CONNECTIONS",
        "BAJA_DATABASE_TIMEOUT_SECS",
        "BAJA_SERVER_BIND_ADDRESS",
        "BAJA_SERVER_PORT",
        "BAJA_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "BAJA_WORKFLOW_REQUEST_CODE_PREFIX",
        "BAJA_WORKFLOW_DEFAULT_PAGE_SIZE",
        "BAJA_WORKFLOW_MAX_PAGE_SIZE",
        "BAJA_DOCUMENTS_ROOT",
        "BAJA_DOCUMENTS_MAX_SIZE_BYTES",
        "BAJA_LOGGING_LEVEL",
        "BAJA_LOGGING_FORMAT",
        "BAJA_LOG_LEVEL",
        "BAJA_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
