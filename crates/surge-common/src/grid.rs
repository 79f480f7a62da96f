//! Regular lat/lon surge grids and their affine georeferencing.

use crate::{CrsCode, SurgeError, SurgeResult};
use serde::{Deserialize, Serialize};

/// Affine transform from pixel space (column, row) to geographic space.
///
/// `origin_x`/`origin_y` is the outer corner of pixel (0, 0). For a
/// north-up raster `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// North-up transform for a grid whose cell *centers* start at
    /// (`west_center`, `north_center`) with spacing `dx`, `dy` (both positive).
    pub fn north_up_from_centers(west_center: f64, north_center: f64, dx: f64, dy: f64) -> Self {
        Self {
            origin_x: west_center - dx / 2.0,
            origin_y: north_center + dy / 2.0,
            pixel_width: dx,
            pixel_height: -dy,
        }
    }

    /// Map fractional pixel coordinates to geographic coordinates.
    /// Integer inputs address pixel corners.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Geographic coordinates of the center of pixel (`col`, `row`).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Area of one cell in squared coordinate units.
    pub fn cell_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }

    pub fn is_north_up(&self) -> bool {
        self.pixel_width > 0.0 && self.pixel_height < 0.0
    }
}

/// A single-band surge field over a regular lat/lon grid, stored row-major
/// with row 0 at the top of the raster.
#[derive(Debug, Clone, PartialEq)]
pub struct SurgeGrid {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
    pub transform: GeoTransform,
    pub crs: CrsCode,
}

impl SurgeGrid {
    /// Build a grid, checking that `data` matches `width * height`.
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f32>,
        transform: GeoTransform,
    ) -> SurgeResult<Self> {
        if data.len() != width * height {
            return Err(SurgeError::ReadFailed(format!(
                "grid data length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            transform,
            crs: CrsCode::Epsg4326,
        })
    }

    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Number of cells holding data (not NaN).
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_north_up_from_centers() {
        let t = GeoTransform::north_up_from_centers(118.0, 25.0, 0.5, 0.25);
        assert!(t.is_north_up());
        assert_eq!(t.pixel_center(0, 0), (118.0, 25.0));
        assert_eq!(t.pixel_to_geo(0.0, 0.0), (117.75, 25.125));
        assert!((t.cell_area() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_grid_rejects_bad_length() {
        let t = GeoTransform::new(0.0, 0.0, 1.0, -1.0);
        assert!(SurgeGrid::new(2, 2, vec![0.0; 3], t).is_err());
    }

    #[test]
    fn test_grid_stats() {
        let t = GeoTransform::new(0.0, 0.0, 1.0, -1.0);
        let grid = SurgeGrid::new(2, 2, vec![0.5, f32::NAN, -1.0, 2.0], t).unwrap();
        assert_eq!(grid.valid_count(), 3);
        assert_eq!(grid.get(1, 1), Some(2.0));
        assert_eq!(grid.get(2, 0), None);
    }
}
