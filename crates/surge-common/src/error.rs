//! Error types for the storm-surge pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias using SurgeError.
pub type SurgeResult<T> = Result<T, SurgeError>;

/// Primary error type shared by every pipeline stage.
#[derive(Debug, Error)]
pub enum SurgeError {
    // === Stage taxonomy ===
    /// An expected input file or directory is missing.
    #[error("Source absent: {}", .0.display())]
    SourceAbsent(PathBuf),

    /// An existing input could not be parsed or decoded.
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Writing an artifact or converting geometry failed.
    #[error("Transform failed: {0}")]
    TransformFailed(String),

    /// The completion sentinel never appeared.
    #[error("Timed out after {waited:?} waiting for {}", .sentinel.display())]
    Timeout { sentinel: PathBuf, waited: Duration },

    // === Model / job errors ===
    #[error("Surge model failed: {0}")]
    ModelFailed(String),

    #[error("Invalid track: {0}")]
    InvalidTrack(String),

    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("cancelled")]
    Cancelled,

    // === Infrastructure errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SurgeError {
    /// Short machine-readable label, used as a log/metrics field.
    pub fn kind(&self) -> &'static str {
        match self {
            SurgeError::SourceAbsent(_) => "source_absent",
            SurgeError::ReadFailed(_) => "read_failed",
            SurgeError::TransformFailed(_) => "transform_failed",
            SurgeError::Timeout { .. } => "timeout",
            SurgeError::ModelFailed(_) => "model_failed",
            SurgeError::InvalidTrack(_) => "invalid_track",
            SurgeError::InvalidTransition { .. } => "invalid_transition",
            SurgeError::Cancelled => "cancelled",
            SurgeError::Database(_) => "database",
            SurgeError::Queue(_) => "queue",
            SurgeError::Io(_) => "io",
        }
    }
}

impl From<serde_json::Error> for SurgeError {
    fn from(err: serde_json::Error) -> Self {
        SurgeError::ReadFailed(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(SurgeError::SourceAbsent("/x".into()).kind(), "source_absent");
        assert_eq!(
            SurgeError::Timeout {
                sentinel: "/x/log.flag_surge".into(),
                waited: Duration::from_secs(3)
            }
            .kind(),
            "timeout"
        );
    }

    #[test]
    fn test_display_includes_path() {
        let err = SurgeError::SourceAbsent("/data/zmax_center.dat.nc".into());
        assert!(err.to_string().contains("zmax_center.dat.nc"));
    }
}
