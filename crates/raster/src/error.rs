//! Error types for raster encoding and decoding.

use surge_common::SurgeError;
use thiserror::Error;

pub type RasterResult<T> = Result<T, RasterError>;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Missing georeference: {0}")]
    MissingGeoreference(String),

    #[error("Unsupported raster: {0}")]
    Unsupported(String),
}

impl From<RasterError> for SurgeError {
    fn from(err: RasterError) -> Self {
        SurgeError::TransformFailed(err.to_string())
    }
}
