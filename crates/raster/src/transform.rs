//! NetCDF maximum-surge field -> north-up, masked GeoTIFF.

use std::path::{Path, PathBuf};

use netcdf_parser::{read_surge_field, SurgeField, ZMAX_VARIABLE};
use rayon::prelude::*;
use surge_common::{GeoTransform, SurgeError, SurgeGrid, SurgeResult, TrackBranch};
use tracing::{info, instrument, warn};

use crate::geotiff::write_geotiff;

/// Magnitude below which surge values are treated as numerical noise.
pub const DEFAULT_SIGNIFICANCE: f32 = 0.3;

/// Relative spacing deviation tolerated before a grid is reported irregular.
const SPACING_TOLERANCE: f64 = 0.01;

/// Result of one successful transform.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub path: PathBuf,
    pub branch: TrackBranch,
    pub grid: SurgeGrid,
}

/// Converts the model's gridded surge output into GeoTIFF.
#[derive(Debug, Clone)]
pub struct RasterTransformer {
    variable: String,
    significance: f32,
}

impl Default for RasterTransformer {
    fn default() -> Self {
        Self::new(ZMAX_VARIABLE, DEFAULT_SIGNIFICANCE)
    }
}

impl RasterTransformer {
    pub fn new(variable: impl Into<String>, significance: f32) -> Self {
        Self {
            variable: variable.into(),
            significance: significance.abs(),
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Read `input`, normalize it and write the GeoTIFF into `output_dir`.
    ///
    /// Errors: missing input -> `SourceAbsent`; unreadable input ->
    /// `ReadFailed`; failure writing the raster -> `TransformFailed`.
    #[instrument(skip(self), fields(variable = %self.variable))]
    pub fn transform(&self, input: &Path, output_dir: &Path) -> SurgeResult<TransformOutput> {
        if !input.is_file() {
            return Err(SurgeError::SourceAbsent(input.to_path_buf()));
        }

        let file_name = input
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SurgeError::ReadFailed(format!("bad file name: {}", input.display())))?;
        let branch = TrackBranch::from_file_name(file_name);

        let field = read_surge_field(input, &self.variable)?;
        let grid = normalize_field(field, self.significance)?;

        std::fs::create_dir_all(output_dir)
            .map_err(|e| SurgeError::TransformFailed(format!("{}: {}", output_dir.display(), e)))?;
        let path = output_dir.join(output_file_name(file_name));
        write_geotiff(&path, &grid)
            .map_err(|e| SurgeError::TransformFailed(format!("{}: {}", path.display(), e)))?;

        info!(
            output = %path.display(),
            branch = %branch,
            width = grid.width,
            height = grid.height,
            valid_cells = grid.valid_count(),
            "Surge field rasterized"
        );

        Ok(TransformOutput { path, branch, grid })
    }
}

/// Output name for an input file: the first two `.`-separated parts are
/// kept and the extension becomes `tif`.
///
/// `zmax_center.dat.nc` -> `zmax_center.dat.tif`, `zmax_left.nc` ->
/// `zmax_left.tif`.
pub fn output_file_name(input_name: &str) -> String {
    let parts: Vec<&str> = input_name.split('.').collect();
    let keep = match parts.len() {
        0 | 1 => parts.len(),
        2 => 1,
        _ => 2,
    };
    let mut out: Vec<&str> = parts[..keep].to_vec();
    out.push("tif");
    out.join(".")
}

/// Mask insignificant values and reorient the field north-up with
/// ascending longitudes. The grid shape is unchanged.
pub fn normalize_field(field: SurgeField, significance: f32) -> SurgeResult<SurgeGrid> {
    let (nx, ny) = (field.width(), field.height());
    if nx < 2 || ny < 2 {
        return Err(SurgeError::ReadFailed(format!(
            "grid too small to georeference: {}x{}",
            nx, ny
        )));
    }

    let row_order = sorted_indices(&field.lats, true);
    let col_order = sorted_indices(&field.lons, false);

    let mut data = vec![f32::NAN; nx * ny];
    data.par_chunks_mut(nx)
        .zip(row_order.par_iter())
        .for_each(|(row, &src_row)| {
            for (dst, &src_col) in row.iter_mut().zip(col_order.iter()) {
                let v = field.values[src_row * nx + src_col];
                *dst = if v <= -significance || v >= significance {
                    v
                } else {
                    f32::NAN
                };
            }
        });

    let lons: Vec<f64> = col_order.iter().map(|&i| field.lons[i]).collect();
    let lats: Vec<f64> = row_order.iter().map(|&i| field.lats[i]).collect();
    let dx = axis_spacing(&lons, "lon");
    let dy = axis_spacing(&lats, "lat");

    let transform = GeoTransform::north_up_from_centers(lons[0], lats[0], dx, dy);
    SurgeGrid::new(nx, ny, data, transform)
}

/// Indices that order `coords` ascending (or descending).
fn sorted_indices(coords: &[f64], descending: bool) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..coords.len()).collect();
    idx.sort_by(|&a, &b| {
        let ord = coords[a].total_cmp(&coords[b]);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    idx
}

/// Mean absolute spacing of a sorted axis; warns when steps are uneven.
fn axis_spacing(sorted: &[f64], axis: &str) -> f64 {
    let n = sorted.len();
    let mean = (sorted[n - 1] - sorted[0]).abs() / (n - 1) as f64;
    let worst = sorted
        .windows(2)
        .map(|w| ((w[1] - w[0]).abs() - mean).abs())
        .fold(0.0_f64, f64::max);
    if mean > 0.0 && worst / mean > SPACING_TOLERANCE {
        warn!(axis = axis, mean_spacing = mean, max_deviation = worst, "Irregular grid spacing");
    }
    mean
}
