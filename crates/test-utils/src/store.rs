//! In-memory `SurgeStore` for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use storage::SurgeStore;
use surge_common::{
    FloodLevel, FloodPolygonRecord, Job, JobStatus, RasterFileRecord, StationSurgeSample,
    SurgeError, SurgeResult, TrackBranch,
};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    samples: Vec<(Uuid, StationSurgeSample)>,
    rasters: Vec<RasterFileRecord>,
    polygons: Vec<FloodPolygonRecord>,
    jobs: HashMap<Uuid, Job>,
    failing_stations: HashSet<String>,
    failing_batches: HashSet<(TrackBranch, FloodLevel)>,
    fail_rasters: bool,
    transitions: Vec<(Uuid, JobStatus)>,
}

/// Records everything written to it. Individual stations, polygon batches
/// or raster registrations can be made to fail; a failed call leaves no rows.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save for this station code fails.
    pub fn fail_station(&self, station_code: &str) {
        self.lock().failing_stations.insert(station_code.to_string());
    }

    /// Every polygon batch for this branch and level fails.
    pub fn fail_polygon_batch(&self, branch: TrackBranch, level: FloodLevel) {
        self.lock().failing_batches.insert((branch, level));
    }

    pub fn fail_raster_registration(&self) {
        self.lock().fail_rasters = true;
    }

    pub fn samples(&self) -> Vec<StationSurgeSample> {
        self.lock().samples.iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn samples_for(&self, station_code: &str) -> Vec<StationSurgeSample> {
        self.lock()
            .samples
            .iter()
            .filter(|(_, s)| s.station_code == station_code)
            .map(|(_, s)| s.clone())
            .collect()
    }

    /// Samples saved under one job id.
    pub fn samples_for_job(&self, job_id: Uuid) -> Vec<StationSurgeSample> {
        self.lock()
            .samples
            .iter()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn rasters(&self) -> Vec<RasterFileRecord> {
        self.lock().rasters.clone()
    }

    pub fn polygons(&self) -> Vec<FloodPolygonRecord> {
        self.lock().polygons.clone()
    }

    pub fn job(&self, id: Uuid) -> Option<Job> {
        self.lock().jobs.get(&id).cloned()
    }

    /// Status changes applied so far, in order.
    pub fn transitions(&self) -> Vec<(Uuid, JobStatus)> {
        self.lock().transitions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SurgeStore for MemoryStore {
    async fn save_station_series(
        &self,
        job_id: Uuid,
        _ty_code: &str,
        samples: &[StationSurgeSample],
    ) -> SurgeResult<usize> {
        let mut inner = self.lock();
        if let Some(bad) = samples
            .iter()
            .find(|s| inner.failing_stations.contains(&s.station_code))
        {
            return Err(SurgeError::Database(format!(
                "injected failure for station {}",
                bad.station_code
            )));
        }
        inner.samples.extend(samples.iter().map(|s| (job_id, s.clone())));
        Ok(samples.len())
    }

    async fn register_raster(&self, record: &RasterFileRecord) -> SurgeResult<Uuid> {
        let mut inner = self.lock();
        if inner.fail_rasters {
            return Err(SurgeError::Database("injected raster failure".into()));
        }
        inner.rasters.push(record.clone());
        Ok(Uuid::new_v4())
    }

    async fn save_polygons(&self, records: &[FloodPolygonRecord]) -> SurgeResult<usize> {
        let mut inner = self.lock();
        if records
            .iter()
            .any(|r| inner.failing_batches.contains(&(r.branch, r.level)))
        {
            return Err(SurgeError::Database("injected polygon failure".into()));
        }
        inner.polygons.extend_from_slice(records);
        Ok(records.len())
    }

    async fn create_job(&self, job: &Job) -> SurgeResult<()> {
        self.lock().jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> SurgeResult<()> {
        let mut inner = self.lock();
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or_else(|| SurgeError::Database(format!("Job not found: {}", id)))?;
        job.transition(status, error_message.map(str::to_string))?;
        inner.transitions.push((id, status));
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> SurgeResult<Option<Job>> {
        Ok(self.lock().jobs.get(&id).cloned())
    }
}
