use std::io;

use taskdeck_core::api::ApiError;
use taskdeck_core::config::ConfigError;
use thiserror::Error;

use crate::config_profiles::ProfileError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] taskdeck_core::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Environment(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    InvalidResource(String),
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },
}
