//! Configuration loading from an optional TOML file and environment variables.

mod server;

pub use server::ServerConfig;

use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "entities=debug,tower_http=info".
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "entities=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Loads configuration from `path` (a missing file means defaults), then
/// applies environment overrides:
///
/// - `ENTITIES_HOST`, `ENTITIES_PORT`
/// - `ENTITIES_DATA_DIR`, `ENTITIES_TEXT_STORAGE`
/// - `ENTITIES_LOG_LEVEL`, `ENTITIES_LOG_JSON` ("true" or "1")
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Like [`load_config`], reading overrides through `lookup`.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("failed to parse {}: {e}", p.display())))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %p.display(), "config file not found, using defaults");
                Config::default()
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "failed to read {}: {e}",
                    p.display()
                )));
            }
        },
        None => Config::default(),
    };

    if let Some(host) = lookup("ENTITIES_HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("ENTITIES_PORT") {
        config.server.port = port
            .parse()
            .map_err(|e| Error::Config(format!("invalid ENTITIES_PORT '{port}': {e}")))?;
    }
    if let Some(data_dir) = lookup("ENTITIES_DATA_DIR") {
        config.server.data_dir = data_dir.into();
    }
    if let Some(text_storage) = lookup("ENTITIES_TEXT_STORAGE") {
        config.server.text_storage = Some(text_storage.into());
    }
    if let Some(level) = lookup("ENTITIES_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("ENTITIES_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
