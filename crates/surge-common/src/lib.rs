//! Common types and utilities shared across the storm-surge pipeline crates.

pub mod branch;
pub mod crs;
pub mod error;
pub mod grid;
pub mod job;
pub mod level;
pub mod records;
pub mod station;
pub mod time;
pub mod track;

pub use branch::TrackBranch;
pub use crs::CrsCode;
pub use error::{SurgeError, SurgeResult};
pub use grid::{GeoTransform, SurgeGrid};
pub use job::{Job, JobStatus};
pub use level::{FloodLevel, SurgeUnit};
pub use records::{FloodPolygonRecord, RasterFileKind, RasterFileRecord};
pub use station::{StationSeriesContext, StationSurgeSample};
pub use track::{CaseInfo, Track, TrackPoint};
