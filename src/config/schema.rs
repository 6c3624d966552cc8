use std::collections::HashMap;
use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use url::Url;

pub const ENV_PREFIX: &str = "DBADMIN";
pub const DEFAULT_USER_AGENT: &str = concat!("dbadmin/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct DbAdminConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub ui: Ui,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Backend {
    /// Origin the `/api/...` paths are appended to
    pub base_url: String,
    pub user_agent: String,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Ui {
    pub notification_ttl_ms: u64,
    pub export_file_name: String,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            notification_ttl_ms: 3000,
            export_file_name: "sql_result_export.xlsx".to_string(),
        }
    }
}

pub fn validate_config(config: DbAdminConfig) -> Result<DbAdminConfig, ConfigError> {
    let url = Url::parse(&config.backend.base_url).map_err(|e| {
        ConfigError::Message(format!(
            "Invalid backend.base_url {:?}: {e}",
            config.backend.base_url
        ))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Message(format!(
            "backend.base_url must be an http(s) URL, got scheme {:?}",
            url.scheme()
        )));
    }

    if config.ui.notification_ttl_ms == 0 {
        return Err(ConfigError::Message(
            "ui.notification_ttl_ms must be greater than zero".to_string(),
        ));
    }

    Ok(config)
}

fn environment(env_override: Option<HashMap<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .source(env_override)
}

pub fn load_config(path: &Path) -> Result<DbAdminConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path))
        .add_source(environment(None));

    config.build()?.try_deserialize().and_then(validate_config)
}

/// Defaults plus whatever the environment sets; used when no config file is given.
pub fn load_config_from_env() -> Result<DbAdminConfig, ConfigError> {
    load_config_from_string("", false, None)
}

// Load a config from a string (to test our structs are defined correctly)
pub fn load_config_from_string(
    config_str: &str,
    skip_validation: bool,
    env_override: Option<HashMap<String, String>>,
) -> Result<DbAdminConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(config_str, FileFormat::Toml))
        .add_source(environment(env_override));

    if skip_validation {
        config.build()?.try_deserialize()
    } else {
        config.build()?.try_deserialize().and_then(validate_config)
    }
}
