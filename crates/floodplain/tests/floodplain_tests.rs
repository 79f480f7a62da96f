//! Extraction, masking and smoothing properties over synthetic grids.

use floodplain::features::read_feature_collection;
use floodplain::{IsoSurfaceExtractor, PolygonMasker, PolygonSmoother};
use geo::{Area, BooleanOps, Coord, MultiPolygon};
use raster::write_geotiff;
use surge_common::TrackBranch;
use test_utils::{assert_approx_eq, circle, grid_from_pattern, north_up, square, surge_dome};

// ============================================================================
// IsoSurfaceExtractor
// ============================================================================

#[test]
fn test_single_exceeding_cell_has_cell_area() {
    let grid = grid_from_pattern(&["...", ".#.", "..."], 2.0, north_up(120.0, 30.0, 0.25));
    let result = IsoSurfaceExtractor::new().extract_grid(&grid, 1.0, TrackBranch::Center);

    assert_eq!(result.polygons.len(), 1);
    assert_approx_eq!(result.polygons[0].area(), 0.0625, 1e-12);
    assert_eq!(result.polygons[0].threshold, 1.0);
    assert_eq!(result.exceeding_cells, 1);
}

#[test]
fn test_all_zero_grid_writes_empty_collection() {
    let dir = tempfile::tempdir().unwrap();
    let grid = grid_from_pattern(&["....", "...."], 0.0, north_up(120.0, 30.0, 0.25));
    let tif = dir.path().join("zmax_slow.tif");
    write_geotiff(&tif, &grid).unwrap();

    let output = IsoSurfaceExtractor::new()
        .extract(&tif, 0.5, TrackBranch::Slow, dir.path(), "zmax_slow_gt50")
        .unwrap();

    assert!(output.polygons.is_empty());
    let collection = read_feature_collection(&output.geojson_path).unwrap();
    assert!(collection.features.is_empty());
    assert!(output.mask_path.is_file());
}

#[test]
fn test_threshold_is_strict() {
    let grid = grid_from_pattern(&["##", "##"], 1.5, north_up(0.0, 2.0, 1.0));
    let extractor = IsoSurfaceExtractor::new();
    assert!(extractor.extract_grid(&grid, 1.5, TrackBranch::Center).polygons.is_empty());
    assert_eq!(extractor.extract_grid(&grid, 1.49, TrackBranch::Center).polygons.len(), 1);
}

// ============================================================================
// PolygonMasker
// ============================================================================

#[test]
fn test_masked_chain_never_enters_exclusion() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("zmax_center.tif");
    write_geotiff(&tif, &surge_dome(31, 31, 3.0, north_up(110.0, 25.0, 0.1))).unwrap();

    let extracted = IsoSurfaceExtractor::new()
        .extract(&tif, 1.0, TrackBranch::Center, dir.path(), "zmax_center_gt100")
        .unwrap();
    assert_eq!(extracted.polygons.len(), 1);
    let before = extracted.polygons[0].area();

    // West half of the grid is land.
    let masker = PolygonMasker::new(vec![square(100.0, 15.0, 11.55)]);
    let masked = masker.apply(extracted.polygons);
    let smoothed = PolygonSmoother::default().smooth(masked);

    assert_eq!(smoothed.len(), 1);
    assert!(smoothed[0].area() < before);
    for p in &smoothed {
        let overlap = MultiPolygon::new(vec![p.polygon().clone()]).intersection(masker.exclusion());
        assert!(overlap.unsigned_area() < 1e-9, "overlap {}", overlap.unsigned_area());
        assert_eq!(p.branch, TrackBranch::Center);
    }
}

#[test]
fn test_polygon_inside_exclusion_is_dropped() {
    let grid = grid_from_pattern(&["#..", "...", "..#"], 2.0, north_up(0.0, 3.0, 1.0));
    let polygons = IsoSurfaceExtractor::new()
        .extract_grid(&grid, 1.0, TrackBranch::Left)
        .polygons;
    assert_eq!(polygons.len(), 2);

    // Covers the top-left cell only.
    let masker = PolygonMasker::new(vec![square(-0.5, 1.5, 2.0)]);
    let kept = masker.apply(polygons);

    assert_eq!(kept.len(), 1);
    assert_approx_eq!(kept[0].area(), 1.0, 1e-9);
}

// ============================================================================
// PolygonSmoother
// ============================================================================

#[test]
fn test_smoothing_a_circle_stays_close() {
    let original = circle((0.0, 0.0), 1.0, 64);
    let smoothed = PolygonSmoother::default().smooth_polygon(&original);

    let ratio = smoothed.unsigned_area() / original.unsigned_area();
    assert!((0.99..=1.0).contains(&ratio), "area ratio {}", ratio);

    for c in smoothed.exterior().coords() {
        let r = (c.x * c.x + c.y * c.y).sqrt();
        assert!((0.99..=1.0 + 1e-9).contains(&r), "radius {}", r);
    }
}

#[test]
fn test_closure_holds_for_any_pass_count() {
    let original = square(3.0, 4.0, 2.0);
    for passes in 0..6 {
        let smoothed = PolygonSmoother::new(passes).smooth_polygon(&original);
        let coords: Vec<Coord<f64>> = smoothed.exterior().coords().copied().collect();
        assert_eq!(coords.first(), coords.last(), "passes = {}", passes);
    }
}
