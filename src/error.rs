//! Harvest job error types

use thiserror::Error;

use crate::github::GitHubError;

/// Errors raised by collection jobs, checkpoints and writers
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

impl From<tempfile::PersistError> for HarvestError {
    fn from(err: tempfile::PersistError) -> Self {
        HarvestError::Io(err.error)
    }
}

/// Convenience result alias for harvest operations
pub type HarvestResult<T> = Result<T, HarvestError>;
