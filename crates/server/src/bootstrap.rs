use std::sync::Arc;

use baja_core::config::{AppConfig, ConfigError, LoadOptions};
use baja_core::{DecommissionService, DocumentStore, ListingService};
use baja_db::{
    connect, migrations, DbPool, FsDocumentStore, SqlEquipmentCatalog,
    SqlRequestRepository,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub documents: Arc<dyn DocumentStore>,
    pub service: DecommissionService,
    pub listing: ListingService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

#[cfg_attr(not(test), allow(dead_code))]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let repository = Arc::new(SqlRequestRepository::new(db_pool.clone()));
    let documents: Arc<dyn DocumentStore> =
        Arc::new(FsDocumentStore::new(config.documents.root.clone()));
    let service = DecommissionService::new(
        repository.clone(),
        documents.clone(),
        Arc::new(SqlEquipmentCatalog::new(db_pool.clone())),
    )
    .with_settings(config.workflow_settings());
    let listing = ListingService::new(repository).with_settings(config.listing_settings());

    info!(
        event_name = "system.bootstrap.workflow_ready",
        correlation_id = "bootstrap",
        request_code_prefix = %config.workflow.request_code_prefix,
        documents_root = %config.documents.root.display(),
        "decommission workflow wired"
    );

    Ok(Application { config, db_pool, documents, service, listing })
}

#[cfg(test)]
mod tests {
    use baja_core::config::{ConfigOverrides, LoadOptions};
    use baja_core::domain::actor::{Actor, ActorRole};
    use baja_core::domain::equipment::EquipmentSnapshot;
    use baja_core::domain::request::{DeclineType, RequestState};
    use baja_core::workflow::{CommandContext, CreateRequestCommand};
    use baja_core::ListQuery;
    use baja_db::SqlEquipmentCatalog;

    use crate::bootstrap::bootstrap;

    fn overrides(database_url: &str, documents_root: std::path::PathBuf) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                documents_root: Some(documents_root),
                request_code_prefix: Some("BJ".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_database_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = bootstrap(overrides("postgres://nowhere", dir.path().to_path_buf())).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn bootstrapped_workflow_creates_and_lists_requests() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = overrides("sqlite::memory:?cache=shared", dir.path().join("documents"));
        let app = bootstrap(options).await.expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('decommission_request', 'equipment')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema should exist after bootstrap");
        assert_eq!(table_count, 2);

        SqlEquipmentCatalog::new(app.db_pool.clone())
            .upsert(&EquipmentSnapshot::new("EQ-900", "Autoclave 23L"))
            .await
            .expect("register equipment");

        let ctx = CommandContext::new(
            Actor::new("u-1", "Front desk", ActorRole::Requester),
            "bootstrap-test",
        );
        let created = app
            .service
            .create_request(
                &ctx,
                CreateRequestCommand::new(
                    "EQ-900",
                    DeclineType::TechnologicalObsolescence,
                    "no spare parts available",
                    "Dr. Rojas",
                ),
            )
            .await
            .expect("create request");
        assert!(created.request_code.0.starts_with("BJ-"));
        assert_eq!(created.state(), RequestState::Pending);

        let listed = app.listing.list(ListQuery::approval_queue()).await.expect("list");
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].id, created.id);
    }
}
