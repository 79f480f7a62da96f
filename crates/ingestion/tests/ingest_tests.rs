//! Station series ingest and coverage pipeline behaviour against the
//! in-memory store.

use std::sync::Arc;

use chrono::Utc;
use floodplain::PolygonMasker;
use ingestion::{CoverageConfig, CoverageJob, CoveragePipeline, StationSeriesIngestor};
use raster::write_geotiff;
use surge_common::time::from_epoch_secs;
use surge_common::{FloodLevel, RasterFileKind, StationSeriesContext, SurgeError, TrackBranch};
use test_utils::{
    north_up, square, surge_dome, write_dome_netcdf, write_fixture, MemoryStore, STATION_TABLE_CENTER, STATION_TABLE_CORRUPT,
    STATION_TABLE_EMPTY, STATION_TABLE_NO_HOUR,
};
use uuid::Uuid;

fn context() -> StationSeriesContext {
    StationSeriesContext {
        ty_code: "2504".into(),
        issue_timestamp: from_epoch_secs(1_700_000_000).unwrap(),
        forecast_start: from_epoch_secs(1_700_000_000).unwrap(),
    }
}

fn coverage_job(root: &std::path::Path) -> CoverageJob {
    CoverageJob {
        job_id: Uuid::new_v4(),
        ty_code: "2504".into(),
        issue_timestamp: Utc::now(),
        model_root: root.to_path_buf(),
        raster_dir: root.join("out"),
        product_dir: root.join("out").join("products"),
    }
}

// ============================================================================
// Station series
// ============================================================================

#[tokio::test]
async fn test_station_scenario_values_and_times() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "zmax_center.dat", STATION_TABLE_CENTER);
    let store = Arc::new(MemoryStore::new());
    let ingestor = StationSeriesIngestor::new(store.clone());

    let report = ingestor.ingest_dir(dir.path(), Uuid::new_v4(), &context()).await.unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].branch, TrackBranch::Center);
    assert_eq!(report.records_written(), 9);

    let a = store.samples_for("A");
    let values: Vec<f64> = a.iter().map(|s| s.surge_value).collect();
    assert_eq!(values, vec![10.5, 0.0, 12.0]);
    let times: Vec<i64> = a.iter().map(|s| s.forecast_timestamp.timestamp()).collect();
    assert_eq!(times, vec![1_700_000_000, 1_700_003_600, 1_700_007_200]);
    assert!(a.iter().all(|s| s.branch == TrackBranch::Center));
}

#[tokio::test]
async fn test_failing_station_does_not_abort_siblings() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "zmax_left.dat", STATION_TABLE_CENTER);
    let store = Arc::new(MemoryStore::new());
    store.fail_station("B");

    let report = StationSeriesIngestor::new(store.clone())
        .ingest_dir(dir.path(), Uuid::new_v4(), &context())
        .await
        .unwrap();

    assert_eq!(report.files[0].failed_stations, vec!["B".to_string()]);
    assert_eq!(report.files[0].stations_written, 2);
    assert_eq!(store.samples_for("A").len(), 3);
    assert!(store.samples_for("B").is_empty());
    assert_eq!(store.samples_for("C").len(), 3);
}

#[tokio::test]
async fn test_bad_files_are_skipped_and_rest_ingested() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "a_center.dat", STATION_TABLE_CORRUPT);
    write_fixture(dir.path(), "b_fast.dat", STATION_TABLE_EMPTY);
    write_fixture(dir.path(), "c_slow.dat", STATION_TABLE_NO_HOUR);
    let store = Arc::new(MemoryStore::new());

    let report = StationSeriesIngestor::new(store.clone())
        .ingest_dir(dir.path(), Uuid::new_v4(), &context())
        .await
        .unwrap();

    assert_eq!(report.files.len(), 3);
    assert!(report.files[0].skipped.is_some());
    assert!(report.files[1].skipped.is_some());
    assert!(report.files[2].skipped.is_none());
    assert_eq!(report.files_ingested(), 1);
    assert!(store.samples().iter().all(|s| s.branch == TrackBranch::Slow));
    assert_eq!(store.samples().len(), 6);
}

#[tokio::test]
async fn test_missing_station_dir_is_source_absent() {
    let dir = tempfile::tempdir().unwrap();
    let result = StationSeriesIngestor::new(Arc::new(MemoryStore::new()))
        .ingest_dir(&dir.path().join("station"), Uuid::new_v4(), &context())
        .await;
    assert!(matches!(result, Err(SurgeError::SourceAbsent(_))));
}

// ============================================================================
// Coverage pipeline
// ============================================================================

#[tokio::test]
async fn test_levels_extracted_from_geotiff() {
    let dir = tempfile::tempdir().unwrap();
    let job = coverage_job(dir.path());
    std::fs::create_dir_all(&job.product_dir).unwrap();
    let tif = job.product_dir.join("zmax_center.dat.tif");
    write_geotiff(&tif, &surge_dome(21, 21, 3.0, north_up(110.0, 22.0, 0.1))).unwrap();

    let store = Arc::new(MemoryStore::new());
    let pipeline = CoveragePipeline::new(store.clone(), &CoverageConfig::default()).unwrap();
    let levels = pipeline.extract_levels(&job, &tif, TrackBranch::Center).await;

    assert_eq!(levels.len(), 3);
    for level in &levels {
        assert!(level.error.is_none(), "{:?}", level);
        assert_eq!(level.polygons_stored, 1);
    }
    let polygons = store.polygons();
    assert_eq!(polygons.len(), 3);
    assert!(polygons[0].area > polygons[1].area);
    assert!(polygons[1].area > polygons[2].area);
    assert_eq!(polygons[0].geometry["type"], "Polygon");
    assert!(job.product_dir.join("zmax_center.dat_gt100.geojson").is_file());
    assert!(job.product_dir.join("zmax_center.dat_gt200_mask.tif").is_file());
}

#[tokio::test]
async fn test_failed_level_batch_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let job = coverage_job(dir.path());
    std::fs::create_dir_all(&job.product_dir).unwrap();
    let tif = job.product_dir.join("zmax_right.tif");
    write_geotiff(&tif, &surge_dome(21, 21, 3.0, north_up(110.0, 22.0, 0.1))).unwrap();

    let store = Arc::new(MemoryStore::new());
    store.fail_polygon_batch(TrackBranch::Right, FloodLevel::Gte150);
    let pipeline = CoveragePipeline::new(store.clone(), &CoverageConfig::default()).unwrap();
    let levels = pipeline.extract_levels(&job, &tif, TrackBranch::Right).await;

    assert!(levels[0].error.is_none());
    assert!(levels[1].error.is_some());
    assert!(levels[2].error.is_none());
    assert_eq!(store.polygons().len(), 2);
}

#[tokio::test]
async fn test_exclusion_covering_everything_stores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let job = coverage_job(dir.path());
    std::fs::create_dir_all(&job.product_dir).unwrap();
    let tif = job.product_dir.join("zmax_fast.tif");
    write_geotiff(&tif, &surge_dome(21, 21, 3.0, north_up(110.0, 22.0, 0.1))).unwrap();

    let store = Arc::new(MemoryStore::new());
    let pipeline = CoveragePipeline::new(store.clone(), &CoverageConfig::default())
        .unwrap()
        .with_masker(PolygonMasker::new(vec![square(100.0, 10.0, 20.0)]));
    let levels = pipeline.extract_levels(&job, &tif, TrackBranch::Fast).await;

    assert!(levels.iter().all(|l| l.error.is_none() && l.polygons_stored == 0));
    assert!(store.polygons().is_empty());
}

#[tokio::test]
async fn test_missing_raster_dir_is_source_absent() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = CoveragePipeline::new(Arc::new(MemoryStore::new()), &CoverageConfig::default()).unwrap();
    let result = pipeline.run(&coverage_job(dir.path())).await;
    assert!(matches!(result, Err(SurgeError::SourceAbsent(_))));
}

#[tokio::test]
async fn test_unreadable_netcdf_fails_only_its_branch() {
    let dir = tempfile::tempdir().unwrap();
    let job = coverage_job(dir.path());
    std::fs::create_dir_all(&job.raster_dir).unwrap();
    std::fs::write(job.raster_dir.join("zmax_center.dat.nc"), b"not netcdf").unwrap();
    std::fs::write(job.raster_dir.join("readme.txt"), b"ignored").unwrap();

    let store = Arc::new(MemoryStore::new());
    let pipeline = CoveragePipeline::new(store.clone(), &CoverageConfig::default()).unwrap();
    let report = pipeline.run(&job).await.unwrap();

    assert_eq!(report.branches.len(), 1);
    assert_eq!(report.branches[0].branch, TrackBranch::Center);
    assert!(report.branches[0].error.is_some());
    assert_eq!(report.rasters_produced(), 0);
    // The NetCDF input is still registered.
    assert_eq!(store.rasters().len(), 1);
}

#[tokio::test]
async fn test_model_outputs_to_stored_polygons() {
    let dir = tempfile::tempdir().unwrap();
    let job = coverage_job(dir.path());
    std::fs::create_dir_all(&job.raster_dir).unwrap();
    write_dome_netcdf(&job.raster_dir.join("zmax_center.dat.nc"), 21, 3.0);
    write_dome_netcdf(&job.raster_dir.join("zmax_left.dat.nc"), 21, 1.2);

    let store = Arc::new(MemoryStore::new());
    let pipeline = CoveragePipeline::new(store.clone(), &CoverageConfig::default()).unwrap();
    let report = pipeline.run(&job).await.unwrap();

    assert_eq!(report.rasters_produced(), 2);
    assert_eq!(report.failed_levels(), 0);
    let center = report.branches.iter().find(|b| b.branch == TrackBranch::Center).unwrap();
    let left = report.branches.iter().find(|b| b.branch == TrackBranch::Left).unwrap();
    assert_eq!(center.geotiff.as_deref(), Some(job.product_dir.join("zmax_center.dat.tif").as_path()));
    assert!(center.levels.iter().all(|l| l.polygons_stored == 1));
    // a 1.2m peak only reaches the lowest level
    let left_counts: Vec<usize> = left.levels.iter().map(|l| l.polygons_stored).collect();
    assert_eq!(left_counts, vec![1, 0, 0]);
    assert_eq!(report.polygons_stored(), 4);

    let rasters = store.rasters();
    assert_eq!(rasters.iter().filter(|r| r.kind == RasterFileKind::NetCdf).count(), 2);
    assert_eq!(rasters.iter().filter(|r| r.kind == RasterFileKind::GeoTiff).count(), 2);
    assert!(rasters.iter().all(|r| r.relative_path.starts_with("out")));
}

#[tokio::test]
async fn test_registration_failure_keeps_branch() {
    let dir = tempfile::tempdir().unwrap();
    let job = coverage_job(dir.path());
    std::fs::create_dir_all(&job.raster_dir).unwrap();
    write_dome_netcdf(&job.raster_dir.join("zmax_right.dat.nc"), 21, 3.0);

    let store = Arc::new(MemoryStore::new());
    store.fail_raster_registration();
    let pipeline = CoveragePipeline::new(store.clone(), &CoverageConfig::default()).unwrap();
    let report = pipeline.run(&job).await.unwrap();

    assert!(store.rasters().is_empty());
    assert_eq!(report.rasters_produced(), 1);
    assert!(report.branches[0].error.is_none());
    assert_eq!(store.polygons().len(), 3);
}
