// Configuration management module
// Resolves the validated runtime configuration from config.toml and
// environment overrides before anything else runs.

pub mod settings;

pub use settings::{Config, ConfigError, ModelParams, OllamaConfig, Provider, RemoteConfig};

/// Get the default data directory for the application
#[inline]
pub fn default_data_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("plsql-chat"))
        .ok_or(ConfigError::DirectoryError)
}
