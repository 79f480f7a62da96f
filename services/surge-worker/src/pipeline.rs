//! The per-job state machine.
//!
//! pending -> in_progress -> write track files -> launch model -> wait for
//! the sentinel -> {station series, coverage} -> completed | failed.

use std::sync::Arc;
use std::time::Instant;

use ingestion::{CoverageJob, CoveragePipeline, CoverageReport, IngestReport, StationSeriesIngestor};
use metrics::{counter, histogram};
use storage::SurgeStore;
use surge_common::track::SurgeRequest;
use surge_common::{Job, JobStatus, StationSeriesContext, SurgeError, SurgeResult};
use surge_model::{CompletionWatcher, ModelRunner, TrackFileWriter, WatchOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;

/// Final state of one job run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub status: JobStatus,
    pub stations: Option<IngestReport>,
    pub coverage: Option<CoverageReport>,
    pub error: Option<String>,
}

/// Everything one job needs, shared by all jobs of a worker.
#[derive(Clone)]
pub struct SurgePipeline {
    store: Arc<dyn SurgeStore>,
    writer: TrackFileWriter,
    runner: ModelRunner,
    watcher: CompletionWatcher,
    stations: StationSeriesIngestor,
    coverage: CoveragePipeline,
}

impl SurgePipeline {
    pub fn new(store: Arc<dyn SurgeStore>, config: &WorkerConfig) -> SurgeResult<Self> {
        let runner = ModelRunner::from_command_line(config.model.layout(), &config.model.command)?;
        let coverage = CoveragePipeline::new(store.clone(), &config.coverage)?;
        Ok(Self::from_parts(store, runner, config.watcher.watcher(), coverage))
    }

    pub fn from_parts(
        store: Arc<dyn SurgeStore>,
        runner: ModelRunner,
        watcher: CompletionWatcher,
        coverage: CoveragePipeline,
    ) -> Self {
        Self {
            stations: StationSeriesIngestor::new(store.clone()),
            store,
            writer: TrackFileWriter::new(),
            runner,
            watcher,
            coverage,
        }
    }

    pub fn store(&self) -> &Arc<dyn SurgeStore> {
        &self.store
    }

    /// Run one job to a terminal status. Stage failures end up in the
    /// outcome; only bookkeeping failures (job row updates) are errors.
    #[instrument(skip(self, request, cancel), fields(ty_code = %request.ty_detail.ty_code))]
    pub async fn run(
        &self,
        job_id: Uuid,
        request: &SurgeRequest,
        cancel: &CancellationToken,
    ) -> SurgeResult<PipelineOutcome> {
        self.ensure_job(job_id, request).await?;
        self.store.update_job_status(job_id, JobStatus::InProgress, None).await?;
        let started = Instant::now();

        let outcome = match self.execute(job_id, request, cancel).await {
            Ok((stations, coverage)) => {
                let failure = required_stage_failure(&stations, &coverage);
                PipelineOutcome {
                    status: if failure.is_some() { JobStatus::Failed } else { JobStatus::Completed },
                    error: failure,
                    stations: Some(stations),
                    coverage: Some(coverage),
                }
            }
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Surge job failed");
                PipelineOutcome {
                    status: JobStatus::Failed,
                    stations: None,
                    coverage: None,
                    error: Some(e.to_string()),
                }
            }
        };

        self.store
            .update_job_status(job_id, outcome.status, outcome.error.as_deref())
            .await?;

        counter!("surge_jobs_total", "status" => outcome.status.as_str()).increment(1);
        histogram!("surge_job_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(
            status = %outcome.status,
            elapsed_secs = started.elapsed().as_secs_f64(),
            error = outcome.error.as_deref().unwrap_or(""),
            "Surge job finished"
        );
        Ok(outcome)
    }

    async fn ensure_job(&self, job_id: Uuid, request: &SurgeRequest) -> SurgeResult<()> {
        if self.store.get_job(job_id).await?.is_some() {
            return Ok(());
        }
        let job = Job {
            id: job_id,
            ..Job::new(request.ty_detail.ty_code.clone(), serde_json::to_value(request)?)
        };
        self.store.create_job(&job).await
    }

    async fn execute(
        &self,
        job_id: Uuid,
        request: &SurgeRequest,
        cancel: &CancellationToken,
    ) -> SurgeResult<(IngestReport, CoverageReport)> {
        let (case, track) = request.clone().into_parts()?;
        let runner = self.runner.for_job(job_id);
        let layout = runner.layout();
        info!(input = %layout.input_dir().display(), output = %layout.output_dir().display(), "Job model directories");

        runner.prepare().await?;
        self.writer.write(&layout.input_dir(), &case, &track).await?;

        self.run_model(&runner, cancel).await?;

        let ctx = StationSeriesContext {
            ty_code: case.code.clone(),
            issue_timestamp: case.submitted_at,
            forecast_start: track.start(),
        };
        let coverage_job = CoverageJob {
            job_id,
            ty_code: case.code.clone(),
            issue_timestamp: case.submitted_at,
            model_root: layout.root.clone(),
            raster_dir: layout.output_dir(),
            product_dir: layout.product_dir(),
        };

        let station_dir = layout.station_dir();
        let (stations, coverage) = tokio::join!(
            self.stations.ingest_dir(&station_dir, job_id, &ctx),
            self.coverage.run(&coverage_job)
        );
        let stations = stations?;
        let coverage = coverage?;

        counter!("surge_station_records_total").increment(stations.records_written() as u64);
        counter!("surge_polygons_stored_total").increment(coverage.polygons_stored() as u64);
        Ok((stations, coverage))
    }

    /// Launch the model and wait for its sentinel. A non-zero exit fails
    /// immediately; a clean exit keeps waiting for the sentinel.
    async fn run_model(&self, runner: &ModelRunner, cancel: &CancellationToken) -> SurgeResult<()> {
        let sentinel = runner.layout().sentinel();
        let mut process = runner.launch()?;

        let watch = self.watcher.wait_cancellable(&sentinel, cancel);
        tokio::pin!(watch);
        let mut exited = false;

        let outcome = loop {
            tokio::select! {
                outcome = &mut watch => break outcome,
                status = process.wait_success(), if !exited => {
                    status?;
                    exited = true;
                }
            }
        };

        match outcome {
            Some(WatchOutcome::Signaled { elapsed }) => {
                histogram!("surge_watcher_wait_seconds").record(elapsed.as_secs_f64());
                Ok(())
            }
            Some(WatchOutcome::TimedOut { elapsed }) => {
                histogram!("surge_watcher_wait_seconds").record(elapsed.as_secs_f64());
                Err(SurgeError::Timeout {
                    sentinel: sentinel.clone(),
                    waited: elapsed,
                })
            }
            None => Err(SurgeError::Cancelled),
        }
    }
}

/// Reason to fail a job whose stages ran: no station table was ingested or
/// no raster was produced. Partial gaps only get logged.
pub fn required_stage_failure(stations: &IngestReport, coverage: &CoverageReport) -> Option<String> {
    if stations.files_ingested() == 0 {
        return Some("no station table could be ingested".to_string());
    }
    if coverage.rasters_produced() == 0 {
        return Some("no surge raster could be produced".to_string());
    }

    let skipped = stations.files.len() - stations.files_ingested();
    if skipped > 0 || stations.failed_stations() > 0 || coverage.failed_levels() > 0 {
        warn!(
            skipped_tables = skipped,
            failed_stations = stations.failed_stations(),
            failed_branches = coverage.branches.len() - coverage.rasters_produced(),
            failed_levels = coverage.failed_levels(),
            "Job completed with gaps"
        );
    }
    None
}
