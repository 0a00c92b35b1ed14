use std::env;
use std::fs;
use std::path::Path;

use baja_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for setting in effective_values(&config) {
        let source = field_source(
            setting.key_path,
            setting.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(setting.key_path, &setting.value, source));
    }

    lines.join("\n")
}

struct Setting {
    key_path: &'static str,
    /// Accepted env keys, first match wins.
    env_keys: &'static [&'static str],
    value: String,
}

fn setting(key_path: &'static str, env_keys: &'static [&'static str], value: String) -> Setting {
    Setting { key_path, env_keys, value }
}

fn effective_values(config: &AppConfig) -> Vec<Setting> {
    vec![
        setting("database.url", &["BAJA_DATABASE_URL"], config.database.url.clone()),
        setting(
            "database.max_connections",
            &["BAJA_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        setting(
            "database.timeout_secs",
            &["BAJA_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        setting(
            "server.bind_address",
            &["BAJA_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        setting("server.port", &["BAJA_SERVER_PORT"], config.server.port.to_string()),
        setting(
            "server.graceful_shutdown_secs",
            &["BAJA_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        setting(
            "workflow.request_code_prefix",
            &["BAJA_WORKFLOW_REQUEST_CODE_PREFIX"],
            config.workflow.request_code_prefix.clone(),
        ),
        setting(
            "workflow.default_page_size",
            &["BAJA_WORKFLOW_DEFAULT_PAGE_SIZE"],
            config.workflow.default_page_size.to_string(),
        ),
        setting(
            "workflow.max_page_size",
            &["BAJA_WORKFLOW_MAX_PAGE_SIZE"],
            config.workflow.max_page_size.to_string(),
        ),
        setting(
            "documents.root",
            &["BAJA_DOCUMENTS_ROOT"],
            config.documents.root.display().to_string(),
        ),
        setting(
            "documents.max_size_bytes",
            &["BAJA_DOCUMENTS_MAX_SIZE_BYTES"],
            config.documents.max_size_bytes.to_string(),
        ),
        setting(
            "logging.level",
            &["BAJA_LOGGING_LEVEL", "BAJA_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        setting(
            "logging.format",
            &["BAJA_LOGGING_FORMAT", "BAJA_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn nested_key_paths_are_found_in_the_file() {
        let doc: Value = "[workflow]\nrequest_code_prefix = \"EQ\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "workflow.request_code_prefix"));
        assert!(!contains_path(&doc, "workflow.max_page_size"));
        assert!(!contains_path(&doc, "documents.root"));
    }

    #[test]
    fn file_source_names_the_file_when_no_env_key_is_set() {
        let doc: Value = "[documents]\nroot = \"/srv/baja\"\n".parse().expect("toml");

        let source = field_source(
            "documents.root",
            &["BAJA_TEST_UNSET_DOCUMENTS_ROOT"],
            Some(&doc),
            Some(Path::new("config/baja.toml")),
        );

        assert_eq!(source, "file (config/baja.toml)");
        assert_eq!(
            field_source("server.port", &["BAJA_TEST_UNSET_PORT"], Some(&doc), None),
            "default"
        );
    }
}
