//! Exceedance polygon type.

use geo::{Area, Polygon};
use surge_common::TrackBranch;

/// Rings enclosing less than this (squared degrees) are treated as degenerate.
pub const MIN_AREA: f64 = 1e-12;

/// A closed region where the surge field exceeds `threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceedancePolygon {
    polygon: Polygon<f64>,
    pub threshold: f64,
    pub branch: TrackBranch,
}

impl ExceedancePolygon {
    /// Returns `None` for degenerate input: an exterior with fewer than four
    /// points, an open ring, or zero enclosed area.
    pub fn new(polygon: Polygon<f64>, threshold: f64, branch: TrackBranch) -> Option<Self> {
        let exterior = polygon.exterior();
        if exterior.0.len() < 4 || !exterior.is_closed() {
            return None;
        }
        if polygon.unsigned_area() <= MIN_AREA {
            return None;
        }
        Some(Self {
            polygon,
            threshold,
            branch,
        })
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn into_polygon(self) -> Polygon<f64> {
        self.polygon
    }

    /// Same tags, different geometry. Degenerate results are rejected.
    pub fn with_polygon(&self, polygon: Polygon<f64>) -> Option<Self> {
        Self::new(polygon, self.threshold, self.branch)
    }

    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }
}
