use std::env;
use std::fs;
use std::path::Path;

use parley_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use super::{CommandResult, EXIT_CONFIG_INVALID};

/// One inspectable setting: dotted key in the config file, the environment
/// variables that override it (first match wins), and how to render it.
struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    render: fn(&AppConfig) -> String,
}

const FIELDS: &[Field] = &[
    Field {
        key: "backend.base_url",
        env_keys: &["PARLEY_BACKEND_URL"],
        render: |config| config.backend.base_url.clone(),
    },
    Field {
        key: "backend.api_version",
        env_keys: &["PARLEY_BACKEND_API_VERSION"],
        render: |config| config.backend.api_version.clone(),
    },
    Field {
        key: "backend.version_date",
        env_keys: &["PARLEY_BACKEND_VERSION_DATE"],
        render: |config| config.backend.version_date.clone(),
    },
    Field {
        key: "backend.username",
        env_keys: &["PARLEY_BACKEND_USERNAME", "WATSON_USERNAME"],
        render: |config| config.backend.username.clone(),
    },
    Field {
        key: "backend.password",
        env_keys: &["PARLEY_BACKEND_PASSWORD", "WATSON_PASSWORD"],
        render: |config| redact_secret(config.backend.password.expose_secret()),
    },
    Field {
        key: "backend.workspace_id",
        env_keys: &["PARLEY_BACKEND_WORKSPACE_ID", "WATSON_WORKSPACE_ID"],
        render: |config| config.backend.workspace_id.clone(),
    },
    Field {
        key: "server.bind_address",
        env_keys: &["PARLEY_SERVER_BIND_ADDRESS"],
        render: |config| config.server.bind_address.clone(),
    },
    Field {
        key: "server.port",
        env_keys: &["PARLEY_SERVER_PORT"],
        render: |config| config.server.port.to_string(),
    },
    Field {
        key: "server.body_limit_bytes",
        env_keys: &["PARLEY_SERVER_BODY_LIMIT_BYTES"],
        render: |config| config.server.body_limit_bytes.to_string(),
    },
    Field {
        key: "logging.level",
        env_keys: &["PARLEY_LOGGING_LEVEL", "PARLEY_LOG_LEVEL"],
        render: |config| config.logging.level.clone(),
    },
    Field {
        key: "logging.format",
        env_keys: &["PARLEY_LOGGING_FORMAT", "PARLEY_LOG_FORMAT"],
        render: |config| format!("{:?}", config.logging.format),
    },
];

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG_INVALID,
            );
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = config_file_path.as_deref().and_then(load_config_file_doc);

    CommandResult {
        exit_code: 0,
        output: render(&config, config_file_doc.as_ref(), config_file_path.as_deref()),
    }
}

fn render(config: &AppConfig, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(FIELDS.iter().map(|field| {
        render_line(field.key, &(field.render)(config), field_source(field, file_doc, file_path))
    }));
    lines.join("\n")
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env_is_set(key)) {
        return format!("env ({env_key})");
    }

    if file_doc.is_some_and(|doc| contains_path(doc, field.key)) {
        let file_path = file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

/// Blank values are ignored by the loader, so they are not a source either.
fn env_is_set(key: &str) -> bool {
    env::var(key).is_ok_and(|value| !value.trim().is_empty())
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

fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        "<empty>".to_string()
    } else {
        "<redacted>".to_string()
    }
}
