//! Threshold exceedance extraction: raster -> binary mask -> polygons.

use std::path::{Path, PathBuf};

use raster::{read_geotiff, write_geotiff};
use surge_common::{SurgeGrid, TrackBranch};
use tracing::{info, instrument};

use crate::error::{FloodplainError, FloodplainResult};
use crate::features::{to_feature_collection, write_feature_collection};
use crate::types::ExceedancePolygon;
use crate::vectorize::polygonize;

/// In-memory extraction result.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub polygons: Vec<ExceedancePolygon>,
    /// 1.0 where the threshold is exceeded, NaN (nodata) elsewhere.
    pub mask: SurgeGrid,
    pub exceeding_cells: usize,
}

/// Extraction result plus the artifacts written for it.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub polygons: Vec<ExceedancePolygon>,
    pub geojson_path: PathBuf,
    pub mask_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IsoSurfaceExtractor;

impl IsoSurfaceExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Polygonize the cells of `grid` with `value > threshold`. NaN never
    /// exceeds. An all-below grid yields no polygons.
    pub fn extract_grid(
        &self,
        grid: &SurgeGrid,
        threshold: f64,
        branch: TrackBranch,
    ) -> ExtractionResult {
        let exceeds: Vec<bool> = grid
            .data
            .iter()
            .map(|&v| !v.is_nan() && f64::from(v) > threshold)
            .collect();
        let exceeding_cells = exceeds.iter().filter(|&&b| b).count();

        let mask = SurgeGrid {
            width: grid.width,
            height: grid.height,
            data: exceeds
                .iter()
                .map(|&b| if b { 1.0 } else { f32::NAN })
                .collect(),
            transform: grid.transform,
            crs: grid.crs,
        };

        let polygons = if exceeding_cells == 0 {
            Vec::new()
        } else {
            polygonize(&exceeds, grid.width, grid.height, &grid.transform)
                .into_iter()
                .filter_map(|p| ExceedancePolygon::new(p, threshold, branch))
                .collect()
        };

        ExtractionResult {
            polygons,
            mask,
            exceeding_cells,
        }
    }

    /// Read the GeoTIFF at `raster_path`, extract at `threshold` and write
    /// `<name>.geojson` plus the companion `<name>_mask.tif` into `output_dir`.
    #[instrument(skip(self, output_dir))]
    pub fn extract(
        &self,
        raster_path: &Path,
        threshold: f64,
        branch: TrackBranch,
        output_dir: &Path,
        name: &str,
    ) -> FloodplainResult<ExtractionOutput> {
        if !raster_path.is_file() {
            return Err(FloodplainError::NotFound(raster_path.to_path_buf()));
        }
        let grid = read_geotiff(raster_path)?;
        let result = self.extract_grid(&grid, threshold, branch);

        std::fs::create_dir_all(output_dir)?;
        let geojson_path = output_dir.join(format!("{}.geojson", name));
        let mask_path = output_dir.join(format!("{}_mask.tif", name));

        write_feature_collection(&geojson_path, &to_feature_collection(&result.polygons))?;
        write_geotiff(&mask_path, &result.mask)?;

        info!(
            threshold,
            branch = %branch,
            cells = result.exceeding_cells,
            polygons = result.polygons.len(),
            geojson = %geojson_path.display(),
            "Extracted exceedance polygons"
        );

        Ok(ExtractionOutput {
            polygons: result.polygons,
            geojson_path,
            mask_path,
        })
    }
}
