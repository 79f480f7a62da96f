//! Job state machine runs against a scripted stand-in for the surge model
//! and the in-memory store.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ingestion::{BranchReport, CoverageConfig, CoveragePipeline, CoverageReport, FileReport, IngestReport};
use storage::SurgeStore;
use surge_common::{JobStatus, SurgeError, TrackBranch};
use surge_model::{CompletionWatcher, ModelLayout, ModelRunner, CASE_INFO_FILE, TRACK_FILE};
use surge_worker::{new_job, required_stage_failure, SurgePipeline};
use test_utils::{sample_request, write_dome_netcdf, MemoryStore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn pipeline(root: &Path, script: &str, timeout: Duration, store: Arc<MemoryStore>) -> SurgePipeline {
    let layout = ModelLayout::new(root, "admin");
    let runner = ModelRunner::new(layout, "sh", vec!["-c".to_string(), script.to_string()]);
    let watcher = CompletionWatcher::new(Duration::from_millis(20), timeout);
    let coverage = CoveragePipeline::new(store.clone(), &CoverageConfig::default()).unwrap();
    SurgePipeline::from_parts(store, runner, watcher, coverage)
}

const STATIONS_ONLY: &str = r#"
mkdir -p "$SURGE_OUTPUT_DIR/station"
printf 'hour A B\n0 1.0 2.0\n1 NaN 3.0\n' > "$SURGE_OUTPUT_DIR/station/zmax_center.dat"
touch "$SURGE_OUTPUT_DIR/log.flag_surge"
"#;

/// Station table plus the gridded output copied from `<root>/zmax_fixture.nc`.
const FULL_RUN: &str = r#"
mkdir -p "$SURGE_OUTPUT_DIR/station"
printf 'hour A B\n0 1.0 2.0\n1 NaN 3.0\n' > "$SURGE_OUTPUT_DIR/station/zmax_center.dat"
cp ../zmax_fixture.nc "$SURGE_OUTPUT_DIR/zmax_center.dat.nc"
touch "$SURGE_OUTPUT_DIR/log.flag_surge"
"#;

/// Waits, then reports the case number it finds in its own input as the
/// surge at station A.
const ECHO_CASE_NUMBER: &str = r#"
sleep 0.3
num=$(sed -n 's/.*"tc_num": *"\([^"]*\)".*/\1/p' "../user_in/{user}/tc_info.json")
mkdir -p "user_out/$SURGE_USER/station"
printf 'hour A\n0 %s\n' "$num" > "user_out/$SURGE_USER/station/zmax_center.dat"
touch "user_out/$SURGE_USER/log.flag_surge"
"#;

// ============================================================================
// Completed runs
// ============================================================================

#[tokio::test]
async fn test_full_run_completes() {
    let dir = tempfile::tempdir().unwrap();
    write_dome_netcdf(&dir.path().join("zmax_fixture.nc"), 21, 3.0);
    let store = Arc::new(MemoryStore::new());
    let job_id = Uuid::new_v4();

    let pipeline = pipeline(dir.path(), FULL_RUN, Duration::from_secs(10), store.clone());
    let outcome = pipeline
        .run(job_id, &sample_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, JobStatus::Completed, "{:?}", outcome.error);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.coverage.unwrap().rasters_produced(), 1);
    assert_eq!(store.samples_for_job(job_id).len(), 4);
    assert_eq!(store.rasters().len(), 2);
    assert_eq!(store.polygons().len(), 3);

    let products = ModelLayout::new(dir.path(), "admin").for_job(job_id).product_dir();
    assert!(products.join("zmax_center.dat.tif").is_file());

    let stored = store.job(job_id).unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert!(stored.error_message.is_none());
    assert_eq!(
        store.transitions(),
        vec![(job_id, JobStatus::InProgress), (job_id, JobStatus::Completed)]
    );
}

#[tokio::test]
async fn test_overlapping_jobs_keep_their_own_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(pipeline(dir.path(), ECHO_CASE_NUMBER, Duration::from_secs(10), store.clone()));

    let first_id = Uuid::new_v4();
    let second_id = Uuid::new_v4();
    let mut second_request = sample_request();
    second_request.ty_detail.ty_code = "9999".to_string();

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            pipeline
                .run(first_id, &sample_request(), &CancellationToken::new())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = pipeline
        .run(second_id, &second_request, &CancellationToken::new())
        .await
        .unwrap();
    let first = first.await.unwrap().unwrap();

    // Both fail for lack of rasters but only after reading their own outputs.
    assert!(first.stations.is_some());
    assert!(second.stations.is_some());
    let values = |id| -> Vec<f64> { store.samples_for_job(id).iter().map(|s| s.surge_value).collect() };
    assert_eq!(values(first_id), vec![2504.0]);
    assert_eq!(values(second_id), vec![9999.0]);
}

// ============================================================================
// Stage failures
// ============================================================================

#[tokio::test]
async fn test_missing_rasters_fail_job_but_keep_station_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let job = new_job(&sample_request()).unwrap();
    store.create_job(&job).await.unwrap();

    let pipeline = pipeline(dir.path(), STATIONS_ONLY, Duration::from_secs(10), store.clone());
    let outcome = pipeline
        .run(job.id, &sample_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, JobStatus::Failed);
    assert!(outcome.error.unwrap().contains("raster"));
    assert_eq!(store.samples().len(), 4);
    let a: Vec<f64> = store.samples_for("A").iter().map(|s| s.surge_value).collect();
    assert_eq!(a, vec![1.0, 0.0]);

    let input = ModelLayout::new(dir.path(), "admin").for_job(job.id).input_dir();
    assert!(input.join(CASE_INFO_FILE).is_file());
    assert!(input.join(TRACK_FILE).is_file());

    let stored = store.job(job.id).unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(stored.completion_time.is_some());
}

#[tokio::test]
async fn test_timeout_skips_downstream_stages() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let job_id = Uuid::new_v4();

    let pipeline = pipeline(dir.path(), "true", Duration::from_millis(150), store.clone());
    let outcome = pipeline
        .run(job_id, &sample_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, JobStatus::Failed);
    assert!(outcome.error.unwrap().contains("Timed out"));
    assert!(outcome.stations.is_none());
    assert!(store.samples().is_empty());
    assert!(store.rasters().is_empty());
    assert_eq!(
        store.transitions(),
        vec![(job_id, JobStatus::InProgress), (job_id, JobStatus::Failed)]
    );
}

#[tokio::test]
async fn test_model_exit_failure_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let started = Instant::now();

    let pipeline = pipeline(dir.path(), "exit 7", Duration::from_secs(30), store.clone());
    let outcome = pipeline
        .run(Uuid::new_v4(), &sample_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, JobStatus::Failed);
    assert!(outcome.error.unwrap().contains("Surge model failed"));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_cancellation_marks_job_failed() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let job_id = Uuid::new_v4();
    let pipeline = pipeline(dir.path(), "sleep 30", Duration::from_secs(60), store.clone());
    let outcome = pipeline.run(job_id, &sample_request(), &cancel).await.unwrap();

    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(outcome.error.as_deref(), Some("cancelled"));
    assert_eq!(store.job(job_id).unwrap().error_message.as_deref(), Some("cancelled"));
}

#[tokio::test]
async fn test_invalid_track_never_reaches_model() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut request = sample_request();
    request.ty_path_list.swap(0, 1);

    let job_id = Uuid::new_v4();
    let pipeline = pipeline(dir.path(), STATIONS_ONLY, Duration::from_secs(5), store.clone());
    let outcome = pipeline
        .run(job_id, &request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, JobStatus::Failed);
    assert!(outcome.error.unwrap().contains("Invalid track"));
    let layout = ModelLayout::new(dir.path(), "admin").for_job(job_id);
    assert!(!layout.input_dir().exists());
    assert!(!layout.sentinel().exists());
}

#[tokio::test]
async fn test_finished_job_is_not_reopened() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let job_id = Uuid::new_v4();
    let pipeline = pipeline(dir.path(), "exit 1", Duration::from_secs(5), store.clone());

    pipeline
        .run(job_id, &sample_request(), &CancellationToken::new())
        .await
        .unwrap();
    let again = pipeline.run(job_id, &sample_request(), &CancellationToken::new()).await;

    assert!(matches!(again, Err(SurgeError::InvalidTransition { .. })));
    assert_eq!(store.job(job_id).unwrap().status, JobStatus::Failed);
}

// ============================================================================
// Terminal status rules
// ============================================================================

fn file(skipped: Option<&str>) -> FileReport {
    FileReport {
        path: "zmax_center.dat".into(),
        branch: TrackBranch::Center,
        records_written: if skipped.is_none() { 10 } else { 0 },
        stations_written: if skipped.is_none() { 5 } else { 0 },
        failed_stations: Vec::new(),
        skipped: skipped.map(str::to_string),
    }
}

fn branch(ok: bool) -> BranchReport {
    BranchReport {
        source: "zmax_center.dat.nc".into(),
        branch: TrackBranch::Center,
        geotiff: ok.then(|| "zmax_center.dat.tif".into()),
        levels: Vec::new(),
        error: (!ok).then(|| "read failed".to_string()),
    }
}

#[test]
fn test_partial_results_still_complete() {
    let stations = IngestReport {
        files: vec![file(None), file(Some("Table has no data rows"))],
    };
    let coverage = CoverageReport {
        branches: vec![branch(true), branch(false)],
    };
    assert_eq!(required_stage_failure(&stations, &coverage), None);
}

#[test]
fn test_no_usable_output_fails() {
    let ok_stations = IngestReport { files: vec![file(None)] };
    let no_stations = IngestReport {
        files: vec![file(Some("bad"))],
    };
    let ok_coverage = CoverageReport {
        branches: vec![branch(true)],
    };
    let no_coverage = CoverageReport {
        branches: vec![branch(false)],
    };

    assert!(required_stage_failure(&no_stations, &ok_coverage).is_some());
    assert!(required_stage_failure(&ok_stations, &no_coverage).is_some());
    assert!(required_stage_failure(&ok_stations, &CoverageReport::default()).is_some());
}
