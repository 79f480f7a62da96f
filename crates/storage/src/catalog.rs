//! Surge result catalog using PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use surge_common::{
    FloodPolygonRecord, Job, JobStatus, RasterFileRecord, StationSurgeSample, SurgeError,
    SurgeResult,
};

use crate::store::SurgeStore;

/// Database connection pool and catalog operations.
pub struct Catalog {
    pool: PgPool,
}

impl Catalog {
    /// Create a new catalog connection from database URL.
    pub async fn connect(database_url: &str) -> SurgeResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| SurgeError::Database(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> SurgeResult<()> {
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| SurgeError::Database(format!("Migration failed: {}", e)))?;
            }
        }

        Ok(())
    }

    async fn current_status(&self, id: Uuid) -> SurgeResult<Option<JobStatus>> {
        let code = sqlx::query_scalar::<_, i32>("SELECT status FROM surge_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SurgeError::Database(format!("Query failed: {}", e)))?;
        Ok(code.and_then(JobStatus::from_code))
    }
}

#[async_trait]
impl SurgeStore for Catalog {
    async fn save_station_series(
        &self,
        job_id: Uuid,
        ty_code: &str,
        samples: &[StationSurgeSample],
    ) -> SurgeResult<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SurgeError::Database(format!("Begin failed: {}", e)))?;

        for sample in samples {
            sqlx::query(
                r#"
                INSERT INTO station_surge_samples (
                    job_id, ty_code, station_code, branch_code,
                    forecast_index, forecast_ts, issue_ts, surge
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (job_id, station_code, branch_code, forecast_index)
                DO UPDATE SET surge = EXCLUDED.surge
                "#,
            )
            .bind(job_id)
            .bind(ty_code)
            .bind(&sample.station_code)
            .bind(sample.branch.code())
            .bind(sample.forecast_index as i32)
            .bind(sample.forecast_timestamp)
            .bind(sample.issue_timestamp)
            .bind(sample.surge_value)
            .execute(&mut *tx)
            .await
            .map_err(|e| SurgeError::Database(format!("Insert failed: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| SurgeError::Database(format!("Commit failed: {}", e)))?;

        Ok(samples.len())
    }

    async fn register_raster(&self, record: &RasterFileRecord) -> SurgeResult<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO coverage_files (
                id, job_id, ty_code, branch_code, kind_code,
                relative_path, file_name, issue_ts
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(record.job_id)
        .bind(&record.ty_code)
        .bind(record.branch.code())
        .bind(record.kind.code())
        .bind(&record.relative_path)
        .bind(&record.file_name)
        .bind(record.issue_timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| SurgeError::Database(format!("Insert failed: {}", e)))?;

        Ok(id)
    }

    async fn save_polygons(&self, records: &[FloodPolygonRecord]) -> SurgeResult<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SurgeError::Database(format!("Begin failed: {}", e)))?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO flood_polygons (
                    id, job_id, ty_code, branch_code, level_code,
                    threshold, geometry, area, issue_ts
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(record.job_id)
            .bind(&record.ty_code)
            .bind(record.branch.code())
            .bind(record.level.code())
            .bind(record.threshold)
            .bind(record.geometry.to_string())
            .bind(record.area)
            .bind(record.issue_timestamp)
            .execute(&mut *tx)
            .await
            .map_err(|e| SurgeError::Database(format!("Insert failed: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| SurgeError::Database(format!("Commit failed: {}", e)))?;

        Ok(records.len())
    }

    async fn create_job(&self, job: &Job) -> SurgeResult<()> {
        sqlx::query(
            r#"
            INSERT INTO surge_jobs (
                id, ty_code, parameters, status, submit_time
            ) VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(job.id)
        .bind(&job.ty_code)
        .bind(job.parameters.to_string())
        .bind(job.status.code())
        .bind(job.submit_time)
        .execute(&self.pool)
        .await
        .map_err(|e| SurgeError::Database(format!("Insert failed: {}", e)))?;

        Ok(())
    }

    async fn update_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> SurgeResult<()> {
        let allowed: Vec<i32> = status
            .allowed_predecessors()
            .iter()
            .map(|s| s.code())
            .collect();

        // Guarded so a terminal job is never reopened
        let result = sqlx::query(
            r#"
            UPDATE surge_jobs SET
                status = $2,
                completion_time = CASE WHEN $3 THEN NOW() ELSE completion_time END,
                error_message = COALESCE($4, error_message)
            WHERE id = $1 AND status = ANY($5)
            "#,
        )
        .bind(id)
        .bind(status.code())
        .bind(status.is_terminal())
        .bind(error_message)
        .bind(&allowed)
        .execute(&self.pool)
        .await
        .map_err(|e| SurgeError::Database(format!("Update failed: {}", e)))?;

        if result.rows_affected() == 0 {
            return match self.current_status(id).await? {
                Some(current) => Err(SurgeError::InvalidTransition {
                    from: current.to_string(),
                    to: status.to_string(),
                }),
                None => Err(SurgeError::Database(format!("Job not found: {}", id))),
            };
        }

        debug!(job_id = %id, status = %status, "Job status updated");
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> SurgeResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, ty_code, parameters, status, submit_time, completion_time, error_message \
             FROM surge_jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SurgeError::Database(format!("Query failed: {}", e)))?;

        row.map(Job::try_from).transpose()
    }
}

/// Internal row type for job queries.
#[derive(FromRow)]
struct JobRow {
    id: Uuid,
    ty_code: String,
    parameters: String,
    status: i32,
    submit_time: DateTime<Utc>,
    completion_time: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = SurgeError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::from_code(row.status)
            .ok_or_else(|| SurgeError::Database(format!("Unknown status code {}", row.status)))?;
        Ok(Job {
            id: row.id,
            ty_code: row.ty_code,
            parameters: serde_json::from_str(&row.parameters)?,
            status,
            submit_time: row.submit_time,
            completion_time: row.completion_time,
            error_message: row.error_message,
        })
    }
}

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS surge_jobs (
    id UUID PRIMARY KEY,
    ty_code VARCHAR(20) NOT NULL,
    parameters TEXT NOT NULL,
    status INTEGER NOT NULL,
    submit_time TIMESTAMPTZ NOT NULL,
    completion_time TIMESTAMPTZ,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_surge_jobs_status ON surge_jobs(status);

CREATE TABLE IF NOT EXISTS station_surge_samples (
    job_id UUID NOT NULL,
    ty_code VARCHAR(20) NOT NULL,
    station_code VARCHAR(50) NOT NULL,
    branch_code INTEGER NOT NULL,
    forecast_index INTEGER NOT NULL,
    forecast_ts TIMESTAMPTZ NOT NULL,
    issue_ts TIMESTAMPTZ NOT NULL,
    surge DOUBLE PRECISION NOT NULL,

    PRIMARY KEY(job_id, station_code, branch_code, forecast_index)
);

CREATE INDEX IF NOT EXISTS idx_station_samples_ty ON station_surge_samples(ty_code, station_code);

CREATE TABLE IF NOT EXISTS coverage_files (
    id UUID PRIMARY KEY,
    job_id UUID NOT NULL,
    ty_code VARCHAR(20) NOT NULL,
    branch_code INTEGER NOT NULL,
    kind_code INTEGER NOT NULL,
    relative_path TEXT NOT NULL,
    file_name TEXT NOT NULL,
    issue_ts TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_coverage_files_job ON coverage_files(job_id);

CREATE TABLE IF NOT EXISTS flood_polygons (
    id UUID PRIMARY KEY,
    job_id UUID NOT NULL,
    ty_code VARCHAR(20) NOT NULL,
    branch_code INTEGER NOT NULL,
    level_code INTEGER NOT NULL,
    threshold DOUBLE PRECISION NOT NULL,
    geometry TEXT NOT NULL,
    area DOUBLE PRECISION NOT NULL,
    issue_ts TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_flood_polygons_job ON flood_polygons(job_id, branch_code, level_code)
"#;
