//! Job submission and the queue consumer loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use storage::{ClaimedJob, JobQueue, SurgeJob, SurgeStore};
use surge_common::track::SurgeRequest;
use surge_common::{Job, SurgeResult};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::pipeline::{PipelineOutcome, SurgePipeline};

/// Validate a request and build its pending job row. Invalid tracks are
/// rejected here, before anything is stored or queued.
pub fn new_job(request: &SurgeRequest) -> SurgeResult<Job> {
    let (case, track) = request.clone().into_parts()?;
    let job = Job::new(case.code, serde_json::to_value(request)?);
    info!(job_id = %job.id, ty_code = %job.ty_code, samples = track.len(), "Accepted surge request");
    Ok(job)
}

/// Store a pending job and put it on the queue.
pub async fn submit(store: &dyn SurgeStore, queue: &mut JobQueue, request: SurgeRequest) -> SurgeResult<Uuid> {
    let job = new_job(&request)?;
    store.create_job(&job).await?;
    let entry_id = queue.enqueue(&SurgeJob::new(job.id, request)).await?;
    info!(job_id = %job.id, entry_id = %entry_id, "Surge job queued");
    Ok(job.id)
}

/// Consumes the job stream, running each job as its own task.
pub struct Worker {
    queue: JobQueue,
    pipeline: Arc<SurgePipeline>,
    permits: Arc<Semaphore>,
    max_jobs: usize,
    consumer: String,
    block_ms: usize,
}

impl Worker {
    pub fn new(queue: JobQueue, pipeline: SurgePipeline, config: &WorkerConfig) -> Self {
        Self {
            queue,
            pipeline: Arc::new(pipeline),
            permits: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            max_jobs: config.max_concurrent_jobs,
            consumer: config.consumer_name.clone(),
            block_ms: config.claim_block_ms,
        }
    }

    /// Claim and run jobs until `cancel` fires, then wait for the jobs in
    /// flight. Their completion waits observe the same token.
    pub async fn run_forever(&mut self, cancel: CancellationToken) -> Result<()> {
        info!(consumer = %self.consumer, max_jobs = self.max_jobs, "Worker started");

        loop {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = self.permits.clone().acquire_owned() => permit?,
            };

            let claimed = tokio::select! {
                _ = cancel.cancelled() => break,
                claimed = self.queue.claim_next(&self.consumer, self.block_ms) => claimed,
            };

            match claimed {
                Ok(Some(claimed)) => {
                    let pipeline = self.pipeline.clone();
                    let queue = self.queue.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        process_claimed(&pipeline, queue, claimed, &cancel).await;
                        drop(permit);
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to read job queue");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!("Shutting down, waiting for running jobs");
        let _all = self.permits.acquire_many(self.max_jobs as u32).await?;
        info!("Worker stopped");
        Ok(())
    }

    /// Wait for one job, run it inline and return its outcome.
    pub async fn run_once(&mut self, cancel: CancellationToken) -> Result<Option<PipelineOutcome>> {
        loop {
            let claimed = tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                claimed = self.queue.claim_next(&self.consumer, self.block_ms) => claimed?,
            };
            if let Some(claimed) = claimed {
                return Ok(process_claimed(&self.pipeline, self.queue.clone(), claimed, &cancel).await);
            }
        }
    }
}

async fn process_claimed(
    pipeline: &SurgePipeline,
    mut queue: JobQueue,
    claimed: ClaimedJob,
    cancel: &CancellationToken,
) -> Option<PipelineOutcome> {
    let job_id = claimed.job.id;
    info!(job_id = %job_id, entry_id = %claimed.entry_id, "Claimed surge job");

    let outcome = match pipeline.run(job_id, &claimed.job.request, cancel).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Could not record job result");
            None
        }
    };

    // The job row carries the result; the entry is done either way.
    if let Err(e) = queue.ack(&claimed.entry_id).await {
        warn!(job_id = %job_id, error = %e, "Failed to ack job entry");
    }
    outcome
}
