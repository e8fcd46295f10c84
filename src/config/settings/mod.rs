#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:latest";
pub const DEFAULT_REMOTE_MODEL: &str = "anthropic.claude-v2";
pub const DEFAULT_API_KEY_ENV: &str = "PLSQL_CHAT_API_KEY";

const ENV_PREFIX: &str = "PLSQL_CHAT_";

/// Which language-model backend answers questions.
///
/// A closed set: selection happens once at configuration time, and an
/// unrecognized value is rejected here rather than at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Locally reachable inference service (Ollama)
    Local,
    /// Managed cloud inference gateway
    Remote,
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "ollama" => Ok(Provider::Local),
            "remote" | "bedrock" => Ok(Provider::Remote),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Local => write!(f, "local"),
            Provider::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Provider,
    pub ollama: OllamaConfig,
    pub remote: RemoteConfig,
    pub params: ModelParams,
    #[serde(skip)]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Explicit gateway endpoint; derived from the region when unset
    pub endpoint: Option<String>,
    pub region: String,
    pub model_id: String,
    /// Name of the environment variable holding the API credential
    pub api_key_env: String,
}

/// Per-session generation and retrieval parameters.
///
/// Validated on construction; `retrieval_k` is additionally clamped to the
/// index size at query time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelParams {
    pub temperature: f32,
    pub context_length: u32,
    pub top_k: u32,
    pub retrieval_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::Local,
            ollama: OllamaConfig::default(),
            remote: RemoteConfig::default(),
            params: ModelParams::default(),
            data_dir: PathBuf::new(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            model_id: DEFAULT_REMOTE_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            context_length: 2048,
            top_k: 40,
            retrieval_k: 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Data directory not found or could not be created")]
    DirectoryError,
    #[error("Unknown provider: '{0}' (expected 'local' or 'remote')")]
    UnknownProvider(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid region: {0} (cannot be empty)")]
    InvalidRegion(String),
    #[error("Invalid temperature: {0} (must be between 0.0 and 1.0)")]
    InvalidTemperature(f32),
    #[error("Invalid context length: {0} (must be positive)")]
    InvalidContextLength(u32),
    #[error("Invalid top-k: {0} (must be positive)")]
    InvalidTopK(u32),
    #[error("Invalid retrieval-k: {0} (must be positive)")]
    InvalidRetrievalK(usize),
    #[error("Invalid value for {key}: '{value}'")]
    InvalidEnvValue { key: String, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from `config.toml` in the data directory, then
    /// apply environment overrides and validate.
    ///
    /// A missing config file is not an error; defaults apply.
    #[inline]
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let config_path = data_dir.join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Config::default()
        };
        config.data_dir = data_dir.to_path_buf();

        config
            .apply_env_overrides()
            .context("Failed to apply environment overrides")?;

        config
            .validate()
            .context("Configuration validation failed")?;

        info!(
            "Configuration loaded: provider={}, data_dir={}",
            config.provider,
            config.data_dir.display()
        );
        Ok(config)
    }

    /// Persist the current configuration to `config.toml`.
    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("Failed to create data directory: {}", self.data_dir.display())
        })?;

        let config_path = self.data_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_value("PROVIDER") {
            self.provider = value.parse()?;
        }
        if let Some(value) = env_value("OLLAMA_HOST") {
            self.ollama.host = value;
        }
        if let Some(value) = env_value("OLLAMA_PORT") {
            self.ollama.port = value.parse().map_err(|_| ConfigError::InvalidEnvValue {
                key: format!("{ENV_PREFIX}OLLAMA_PORT"),
                value,
            })?;
        }
        if let Some(value) = env_value("OLLAMA_MODEL") {
            self.ollama.model = value;
        }
        if let Some(value) = env_value("REMOTE_ENDPOINT") {
            self.remote.endpoint = Some(value);
        }
        if let Some(value) = env_value("REMOTE_REGION") {
            self.remote.region = value;
        }
        if let Some(value) = env_value("REMOTE_MODEL") {
            self.remote.model_id = value;
        }
        if let Some(value) = env_value("TEMPERATURE") {
            self.params.temperature =
                value.parse().map_err(|_| ConfigError::InvalidEnvValue {
                    key: format!("{ENV_PREFIX}TEMPERATURE"),
                    value,
                })?;
        }
        if let Some(value) = env_value("RETRIEVAL_K") {
            self.params.retrieval_k =
                value.parse().map_err(|_| ConfigError::InvalidEnvValue {
                    key: format!("{ENV_PREFIX}RETRIEVAL_K"),
                    value,
                })?;
        }
        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.remote.validate()?;
        self.params.validate()?;
        Ok(())
    }

    /// Path of the persisted similarity-search structure file
    #[inline]
    pub fn vectors_path(&self) -> PathBuf {
        self.data_dir.join("vectorstore").join("index.vectors.json")
    }

    /// Path of the persisted ID-to-chunk mapping file
    #[inline]
    pub fn chunks_path(&self) -> PathBuf {
        self.data_dir.join("vectorstore").join("index.chunks.json")
    }

    /// Path of the corpus package metadata file
    #[inline]
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata").join("packages.json")
    }

    /// Directory where chat transcripts are written
    #[inline]
    pub fn transcripts_dir(&self) -> PathBuf {
        self.data_dir.join("transcripts")
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        self.base_url().map(|_| ())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl RemoteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::InvalidRegion(self.region.clone()));
        }

        if self.model_id.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model_id.clone()));
        }

        self.effective_endpoint().map(|_| ())
    }

    /// The gateway endpoint, derived from the region unless set explicitly.
    pub fn effective_endpoint(&self) -> Result<Url, ConfigError> {
        let url_str = self
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-gateway.{}.amazonaws.com", self.region));
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl ModelParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if self.context_length == 0 {
            return Err(ConfigError::InvalidContextLength(self.context_length));
        }

        if self.top_k == 0 {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if self.retrieval_k == 0 {
            return Err(ConfigError::InvalidRetrievalK(self.retrieval_k));
        }

        Ok(())
    }
}

/// Read a `PLSQL_CHAT_*` environment variable, trimming whitespace and
/// stripping trailing `#` comments. Empty values count as unset.
fn env_value(suffix: &str) -> Option<String> {
    let raw = std::env::var(format!("{ENV_PREFIX}{suffix}")).ok()?;
    let cleaned = raw
        .split('#')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    if cleaned.is_empty() {
        if !raw.trim().is_empty() {
            warn!("Ignoring empty value for {ENV_PREFIX}{suffix}");
        }
        None
    } else {
        Some(cleaned)
    }
}
