use std::{collections::HashMap, env, fs, path::PathBuf};

use super::app_config::{Config, PartialConfig, ENV_CONFIG_PATH};
use crate::errors::ConfigError;

const ENV_PREFIX: &str = "INSTANCER_";

/// Configuration loader responsible for loading config from a file and the environment
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Use the file named by `INSTANCER_CONFIG`, if any
    pub fn new() -> Self {
        Self {
            path: env::var_os(ENV_CONFIG_PATH).map(PathBuf::from),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Load complete configuration
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        self.load_config_with_env(self.collect_env_vars())
    }

    /// Load with an explicit environment map (for testing)
    pub fn load_config_with_env(
        &self,
        env_map: HashMap<String, String>,
    ) -> Result<Config, ConfigError> {
        let partial = match &self.path {
            Some(path) => Some(self.load_partial_config(path)?),
            None => None,
        };

        let config = Config::from_partial_and_env(partial, env_map)?;
        tracing::debug!(path = ?self.path, registry = ?config.registry, "Configuration loaded");
        Ok(config)
    }

    fn load_partial_config(&self, path: &PathBuf) -> Result<PartialConfig, ConfigError> {
        let display = path.display().to_string();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(display.clone(), e))?;
        toml::from_str(&content).map_err(|e| ConfigError::TomlParse(display, e))
    }

    fn collect_env_vars(&self) -> HashMap<String, String> {
        env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
