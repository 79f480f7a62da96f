//! Error types for the ingestion crate.

use surge_common::SurgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Table has no data rows")]
    Empty,

    #[error("Blocking task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Surge(#[from] SurgeError),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;

impl From<tokio::task::JoinError> for IngestionError {
    fn from(err: tokio::task::JoinError) -> Self {
        IngestionError::Task(err.to_string())
    }
}

impl From<IngestionError> for SurgeError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::FileRead(e) => SurgeError::Io(e),
            IngestionError::Parse { .. } | IngestionError::Empty => SurgeError::ReadFailed(err.to_string()),
            IngestionError::Task(msg) => SurgeError::TransformFailed(msg),
            IngestionError::Surge(e) => e,
        }
    }
}
