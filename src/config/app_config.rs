use serde::Deserialize;
use std::{collections::HashMap, path::PathBuf};

use super::loader::ConfigLoader;
use super::registry_config::{PartialRegistryConfig, RegistryConfig};
use crate::errors::ConfigError;
use crate::logging::{LogFormat, LoggingConfig};

pub const ENV_CONFIG_PATH: &str = "INSTANCER_CONFIG";
pub const ENV_LOG: &str = "INSTANCER_LOG";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

/// Partial configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialConfig {
    registry: Option<PartialRegistryConfig>,
    logging: Option<PartialLoggingConfig>,
}

/// `[logging]` section
#[derive(Deserialize, Debug, Default)]
pub struct PartialLoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
    pub show_target: Option<bool>,
}

impl Config {
    /// Load configuration from the file named by `INSTANCER_CONFIG` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_config()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        ConfigLoader::with_path(path).load_config()
    }

    /// Parse a TOML document, ignoring the environment
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let partial = toml::from_str::<PartialConfig>(content)
            .map_err(|e| ConfigError::TomlParse("<string>".to_string(), e))?;
        Self::from_partial_and_env(Some(partial), HashMap::new())
    }

    /// Create Config from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let registry = RegistryConfig::from_env_or_file(partial.registry, &env_map)?;
        let logging = logging_from_env_or_file(partial.logging, &env_map)?;

        Ok(Config { registry, logging })
    }
}

fn logging_from_env_or_file(
    partial: Option<PartialLoggingConfig>,
    env_map: &HashMap<String, String>,
) -> Result<LoggingConfig, ConfigError> {
    let partial = partial.unwrap_or_default();
    let mut logging = LoggingConfig::default();

    if let Some(format) = partial.format {
        logging.format = format.parse::<LogFormat>()?;
    }
    if let Some(show_target) = partial.show_target {
        logging.show_target = show_target;
    }
    logging.directive = env_map.get(ENV_LOG).cloned().or(partial.level);

    Ok(logging)
}
