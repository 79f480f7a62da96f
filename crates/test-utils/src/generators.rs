//! Synthetic surge grids and geometries with predictable shapes.

use geo::{Coord, LineString, Polygon};
use surge_common::{GeoTransform, SurgeGrid};

/// North-up transform with square `cell` sized pixels whose top-left
/// corner is (`west`, `north`).
pub fn north_up(west: f64, north: f64, cell: f64) -> GeoTransform {
    GeoTransform::new(west, north, cell, -cell)
}

/// A grid drawn from ASCII rows: `#` cells get `value`, `~` cells get NaN,
/// anything else is 0.0.
///
/// ```
/// use test_utils::{grid_from_pattern, north_up};
///
/// let grid = grid_from_pattern(&["#.", ".#"], 2.0, north_up(0.0, 2.0, 1.0));
/// assert_eq!(grid.data, vec![2.0, 0.0, 0.0, 2.0]);
/// ```
pub fn grid_from_pattern(rows: &[&str], value: f32, transform: GeoTransform) -> SurgeGrid {
    let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
    let data: Vec<f32> = rows
        .iter()
        .flat_map(|r| {
            r.chars().map(move |c| match c {
                '#' => value,
                '~' => f32::NAN,
                _ => 0.0,
            })
        })
        .collect();
    SurgeGrid::new(width, rows.len(), data, transform).expect("pattern rows must have equal length")
}

/// A radially symmetric surge dome: `peak` at the grid center falling
/// linearly to 0 at the nearest edge.
pub fn surge_dome(width: usize, height: usize, peak: f32, transform: GeoTransform) -> SurgeGrid {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let radius = cx.min(cy).max(1.0);
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let d = ((col as f32 - cx).powi(2) + (row as f32 - cy).powi(2)).sqrt();
            data.push((peak * (1.0 - d / radius)).max(0.0));
        }
    }
    SurgeGrid::new(width, height, data, transform).expect("dome dimensions are consistent")
}

/// Closed regular polygon approximating a circle.
pub fn circle(center: (f64, f64), radius: f64, segments: usize) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let a = i as f64 / segments as f64 * std::f64::consts::TAU;
            Coord {
                x: center.0 + radius * a.cos(),
                y: center.1 + radius * a.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::new(coords), vec![])
}

/// Axis-aligned square polygon.
pub fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
            (x0, y0),
        ]),
        vec![],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_nan_marker() {
        let g = grid_from_pattern(&["#~."], 1.5, north_up(0.0, 1.0, 1.0));
        assert_eq!(g.data[0], 1.5);
        assert!(g.data[1].is_nan());
        assert_eq!(g.data[2], 0.0);
    }

    #[test]
    fn test_dome_peak_at_center() {
        let g = surge_dome(5, 5, 3.0, north_up(0.0, 5.0, 1.0));
        assert_eq!(g.get(2, 2), Some(3.0));
        assert_eq!(g.get(0, 2), Some(0.0));
    }

    #[test]
    fn test_circle_is_closed() {
        let c = circle((0.0, 0.0), 1.0, 16);
        assert_eq!(c.exterior().0.len(), 17);
        assert!(c.exterior().is_closed());
    }
}
