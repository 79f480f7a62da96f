//! GeoJSON import/export of exceedance polygons.

use std::fs;
use std::path::Path;

use geo::{Geometry, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use serde_json::Value as JsonValue;

use crate::error::{FloodplainError, FloodplainResult};
use crate::types::ExceedancePolygon;

/// Build a feature collection, one feature per polygon, tagged with the
/// threshold that produced it and its branch.
pub fn to_feature_collection(polygons: &[ExceedancePolygon]) -> FeatureCollection {
    let features = polygons
        .iter()
        .map(|p| {
            let mut properties = JsonObject::new();
            properties.insert("threshold".to_string(), JsonValue::from(p.threshold));
            properties.insert("branch".to_string(), JsonValue::from(p.branch.as_str()));
            properties.insert("area".to_string(), JsonValue::from(p.area()));

            Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(p.polygon()))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Every polygon in a collection, regardless of properties.
pub fn collection_polygons(collection: &FeatureCollection) -> Vec<Polygon<f64>> {
    collection.features.iter().flat_map(feature_polygons).collect()
}

fn feature_polygons(feature: &Feature) -> Vec<Polygon<f64>> {
    let Some(geometry) = feature.geometry.clone() else {
        return Vec::new();
    };
    match Geometry::<f64>::try_from(geometry) {
        Ok(Geometry::Polygon(p)) => vec![p],
        Ok(Geometry::MultiPolygon(mp)) => mp.0,
        Ok(Geometry::GeometryCollection(gc)) => gc
            .0
            .into_iter()
            .flat_map(|g| match g {
                Geometry::Polygon(p) => vec![p],
                Geometry::MultiPolygon(mp) => mp.0,
                _ => Vec::new(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn write_feature_collection(path: &Path, collection: &FeatureCollection) -> FloodplainResult<()> {
    let json = serde_json::to_string(collection)
        .map_err(|e| FloodplainError::GeoJson(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a GeoJSON file. A bare Feature or Geometry is wrapped into a
/// one-feature collection.
pub fn read_feature_collection(path: &Path) -> FloodplainResult<FeatureCollection> {
    if !path.is_file() {
        return Err(FloodplainError::NotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let geojson: GeoJson = text.parse()?;
    Ok(match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(f) => FeatureCollection {
            bbox: None,
            features: vec![f],
            foreign_members: None,
        },
        GeoJson::Geometry(g) => FeatureCollection {
            bbox: None,
            features: vec![Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            foreign_members: None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use surge_common::TrackBranch;

    #[test]
    fn test_properties_carry_threshold_and_branch() {
        let p = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let e = ExceedancePolygon::new(p, 1.5, TrackBranch::Left).unwrap();
        let fc = to_feature_collection(&[e.clone()]);

        assert_eq!(fc.features.len(), 1);
        let feature = &fc.features[0];
        assert_eq!(feature.property("threshold").and_then(JsonValue::as_f64), Some(1.5));
        assert_eq!(feature.property("branch").and_then(JsonValue::as_str), Some("left"));

        assert_eq!(collection_polygons(&fc), vec![e.polygon().clone()]);
    }

    #[test]
    fn test_missing_file() {
        let err = read_feature_collection(Path::new("/nonexistent/land.geojson")).unwrap_err();
        assert!(matches!(err, FloodplainError::NotFound(_)));
    }
}
