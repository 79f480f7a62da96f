//! Surge result ingestion.
//!
//! Turns the outputs of one model run into persisted artifacts:
//!
//! - [`StationSeriesIngestor`] reads the per-branch station tables and stores
//!   one hourly series per station, one transaction per station
//! - [`CoveragePipeline`] rasterizes every gridded output, extracts the flood
//!   level polygons, masks and smooths them and stores one batch per
//!   branch and level
//!
//! Failures are scoped: a bad station, file, branch or level is logged and
//! reported, and the remaining work continues.

pub mod config;
pub mod coverage;
pub mod error;
pub mod station;

pub use config::CoverageConfig;
pub use coverage::{BranchReport, CoverageJob, CoveragePipeline, CoverageReport, LevelReport};
pub use error::{IngestionError, Result};
pub use station::{parse_station_table, FileReport, IngestReport, StationSeriesIngestor, StationTable};
