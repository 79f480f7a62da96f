//! Subtract an exclusion layer (typically land) from exceedance polygons.

use std::path::Path;

use geo::{Area, BooleanOps, MultiPolygon, Polygon};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::FloodplainResult;
use crate::features::{collection_polygons, read_feature_collection};
use crate::types::ExceedancePolygon;

/// Holds the union of all exclusion polygons, computed once.
#[derive(Debug, Clone)]
pub struct PolygonMasker {
    exclusion: MultiPolygon<f64>,
}

impl PolygonMasker {
    pub fn new(exclusion: Vec<Polygon<f64>>) -> Self {
        let mut iter = exclusion.into_iter();
        let exclusion = match iter.next() {
            Some(first) => iter.fold(MultiPolygon::new(vec![first]), |acc, p| {
                acc.union(&MultiPolygon::new(vec![p]))
            }),
            None => MultiPolygon::new(Vec::new()),
        };
        Self { exclusion }
    }

    /// Load the exclusion layer from a GeoJSON file.
    pub fn from_geojson(path: &Path) -> FloodplainResult<Self> {
        let collection = read_feature_collection(path)?;
        let polygons = collection_polygons(&collection);
        info!(
            path = %path.display(),
            polygons = polygons.len(),
            "Loaded exclusion mask"
        );
        Ok(Self::new(polygons))
    }

    pub fn exclusion(&self) -> &MultiPolygon<f64> {
        &self.exclusion
    }

    /// Difference of every polygon against the exclusion union. Polygons
    /// left empty are dropped; a polygon split in pieces yields one
    /// polygon per piece.
    pub fn apply(&self, polygons: Vec<ExceedancePolygon>) -> Vec<ExceedancePolygon> {
        if self.exclusion.0.is_empty() {
            return polygons;
        }
        let before = polygons.len();
        let out: Vec<ExceedancePolygon> = polygons
            .into_par_iter()
            .flat_map_iter(|p| {
                let remaining = MultiPolygon::new(vec![p.polygon().clone()]).difference(&self.exclusion);
                remaining
                    .0
                    .into_iter()
                    .filter_map(|part| p.with_polygon(part))
                    .collect::<Vec<_>>()
            })
            .collect();
        debug!(
            before,
            after = out.len(),
            exclusion_area = self.exclusion.unsigned_area(),
            "Masked polygons"
        );
        out
    }
}
