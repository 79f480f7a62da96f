//! Records handed to the persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{FloodLevel, TrackBranch};

/// Kind of a registered coverage file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFileKind {
    NetCdf,
    GeoTiff,
}

impl RasterFileKind {
    pub fn code(&self) -> i32 {
        match self {
            RasterFileKind::NetCdf => 6101,
            RasterFileKind::GeoTiff => 6102,
        }
    }
}

/// Metadata of a NetCDF input or GeoTIFF product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterFileRecord {
    pub job_id: Uuid,
    pub ty_code: String,
    pub branch: TrackBranch,
    pub kind: RasterFileKind,
    /// Directory relative to the model root.
    pub relative_path: String,
    pub file_name: String,
    pub issue_timestamp: DateTime<Utc>,
}

/// One stored exceedance polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodPolygonRecord {
    pub job_id: Uuid,
    pub ty_code: String,
    pub branch: TrackBranch,
    pub level: FloodLevel,
    pub threshold: f64,
    /// GeoJSON geometry object.
    pub geometry: serde_json::Value,
    /// Area in squared degrees.
    pub area: f64,
    pub issue_timestamp: DateTime<Utc>,
}
