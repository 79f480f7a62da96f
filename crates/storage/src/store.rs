//! The persistence interface used by ingestion and the worker.

use async_trait::async_trait;
use uuid::Uuid;

use surge_common::{
    FloodPolygonRecord, Job, JobStatus, RasterFileRecord, StationSurgeSample, SurgeResult,
};

/// Batched, commit-scoped writes for surge results and job bookkeeping.
///
/// Every method is its own commit boundary: a failure rolls back that call
/// only and leaves previously committed calls untouched.
#[async_trait]
pub trait SurgeStore: Send + Sync {
    /// Insert all samples of one station in a single transaction.
    /// Returns the number of rows written.
    async fn save_station_series(
        &self,
        job_id: Uuid,
        ty_code: &str,
        samples: &[StationSurgeSample],
    ) -> SurgeResult<usize>;

    /// Register a NetCDF input or GeoTIFF product.
    async fn register_raster(&self, record: &RasterFileRecord) -> SurgeResult<Uuid>;

    /// Insert one polygon batch (one branch, one level) in a single transaction.
    async fn save_polygons(&self, records: &[FloodPolygonRecord]) -> SurgeResult<usize>;

    async fn create_job(&self, job: &Job) -> SurgeResult<()>;

    /// Move a job to `status`. Fails with `InvalidTransition` when the stored
    /// status does not allow it.
    async fn update_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> SurgeResult<()>;

    async fn get_job(&self, id: Uuid) -> SurgeResult<Option<Job>>;
}
