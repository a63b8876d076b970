pub mod app_config;
pub mod loader;
pub mod registry_config;

// Re-export commonly used types
pub use app_config::{Config, PartialConfig, ENV_CONFIG_PATH, ENV_LOG};
pub use loader::ConfigLoader;
pub use registry_config::{
    ConstructorSelection, RegistryConfig, ENV_CONSTRUCTOR_SELECTION, ENV_RECORD_STATS,
};
