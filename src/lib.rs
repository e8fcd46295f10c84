use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vector index file missing: {}", .0.display())]
    IndexMissing(PathBuf),

    #[error("Vector index unreadable: {0}")]
    IndexUnreadable(String),

    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(String),

    #[error("Model construction failed: {0}")]
    ModelConstructionFailed(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for ChatError {
    fn from(err: config::ConfigError) -> Self {
        ChatError::Config(err.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod index;
pub mod kb;
pub mod memory;
pub mod providers;
