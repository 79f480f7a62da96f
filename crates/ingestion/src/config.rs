//! Settings of the coverage chain.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use surge_common::{FloodLevel, SurgeUnit};

/// What to extract from each gridded output and how to post-process it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Source variable in the NetCDF files.
    pub variable: String,
    /// Values with `|v| < significance` become nodata.
    pub significance: f32,
    pub levels: Vec<FloodLevel>,
    /// Unit of the raster values; decides how level centimetres compare.
    pub unit: SurgeUnit,
    /// Chaikin passes; 0 disables smoothing.
    pub smoothing_passes: u32,
    /// GeoJSON with land/exclusion polygons; masking is skipped when unset.
    pub exclusion_path: Option<PathBuf>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            variable: raster::ZMAX_VARIABLE.to_string(),
            significance: raster::DEFAULT_SIGNIFICANCE,
            levels: FloodLevel::ALL.to_vec(),
            unit: SurgeUnit::Meters,
            smoothing_passes: floodplain::DEFAULT_PASSES,
            exclusion_path: None,
        }
    }
}

impl CoverageConfig {
    /// `(level, threshold)` pairs in raster units.
    pub fn thresholds(&self) -> Vec<(FloodLevel, f64)> {
        self.levels.iter().map(|l| (*l, l.threshold(self.unit))).collect()
    }
}
