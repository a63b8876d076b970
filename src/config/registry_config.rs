use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::ConfigError;

pub const ENV_RECORD_STATS: &str = "INSTANCER_RECORD_STATS";
pub const ENV_CONSTRUCTOR_SELECTION: &str = "INSTANCER_CONSTRUCTOR_SELECTION";

/// How the default-construction tier picks among matching constructors
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstructorSelection {
    /// The first matching constructor in declaration order wins
    #[default]
    #[serde(rename = "first")]
    FirstMatch,
    /// Exactly one constructor may match; more is an error
    #[serde(rename = "unique")]
    Unique,
}

impl FromStr for ConstructorSelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_match" => Ok(Self::FirstMatch),
            "unique" => Ok(Self::Unique),
            other => Err(ConfigError::InvalidValue {
                key: ENV_CONSTRUCTOR_SELECTION.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Resolution registry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Whether resolution counters are maintained
    pub record_stats: bool,
    pub constructor_selection: ConstructorSelection,
}

/// Partial registry configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialRegistryConfig {
    pub record_stats: Option<bool>,
    pub constructor_selection: Option<ConstructorSelection>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            record_stats: default_record_stats(),
            constructor_selection: ConstructorSelection::default(),
        }
    }
}

impl RegistryConfig {
    /// Create RegistryConfig from partial config with defaults
    pub fn from_partial(partial: Option<PartialRegistryConfig>) -> Self {
        let partial = partial.unwrap_or_default();

        Self {
            record_stats: partial.record_stats.unwrap_or_else(default_record_stats),
            constructor_selection: partial.constructor_selection.unwrap_or_default(),
        }
    }

    /// Environment values take precedence over the file
    pub fn from_env_or_file(
        partial: Option<PartialRegistryConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::from_partial(partial);

        if let Some(value) = env_map.get(ENV_RECORD_STATS) {
            config.record_stats = parse_bool(ENV_RECORD_STATS, value)?;
        }
        if let Some(value) = env_map.get(ENV_CONSTRUCTOR_SELECTION) {
            config.constructor_selection = value.parse()?;
        }

        Ok(config)
    }
}

fn default_record_stats() -> bool {
    true
}

pub(crate) fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
