//! Error types for polygon extraction and post-processing.

use std::path::PathBuf;

use raster::RasterError;
use surge_common::SurgeError;
use thiserror::Error;

pub type FloodplainResult<T> = Result<T, FloodplainError>;

#[derive(Error, Debug)]
pub enum FloodplainError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
}

impl From<geojson::Error> for FloodplainError {
    fn from(err: geojson::Error) -> Self {
        FloodplainError::GeoJson(err.to_string())
    }
}

impl From<FloodplainError> for SurgeError {
    fn from(err: FloodplainError) -> Self {
        match err {
            FloodplainError::NotFound(path) => SurgeError::SourceAbsent(path),
            FloodplainError::GeoJson(msg) => SurgeError::ReadFailed(msg),
            other => SurgeError::TransformFailed(other.to_string()),
        }
    }
}
