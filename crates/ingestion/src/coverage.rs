//! The coverage chain: NetCDF -> GeoTIFF -> flood level polygons -> store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use floodplain::{ExceedancePolygon, IsoSurfaceExtractor, PolygonMasker, PolygonSmoother};
use raster::RasterTransformer;
use storage::SurgeStore;
use surge_common::{
    FloodLevel, FloodPolygonRecord, RasterFileKind, RasterFileRecord, SurgeError, SurgeResult, TrackBranch,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::CoverageConfig;
use crate::error::IngestionError;

/// Identity and locations of one run's gridded outputs.
#[derive(Debug, Clone)]
pub struct CoverageJob {
    pub job_id: Uuid,
    pub ty_code: String,
    pub issue_timestamp: DateTime<Utc>,
    /// Paths in file records are stored relative to this directory.
    pub model_root: PathBuf,
    /// Directory holding the model's `*.nc` outputs.
    pub raster_dir: PathBuf,
    /// Where GeoTIFF, GeoJSON and mask products are written.
    pub product_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelReport {
    pub level: FloodLevel,
    pub polygons_stored: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchReport {
    pub source: PathBuf,
    pub branch: TrackBranch,
    pub geotiff: Option<PathBuf>,
    pub levels: Vec<LevelReport>,
    /// Set when the branch failed before level extraction.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageReport {
    pub branches: Vec<BranchReport>,
}

impl CoverageReport {
    pub fn rasters_produced(&self) -> usize {
        self.branches.iter().filter(|b| b.geotiff.is_some()).count()
    }

    pub fn polygons_stored(&self) -> usize {
        self.branches
            .iter()
            .flat_map(|b| b.levels.iter())
            .map(|l| l.polygons_stored)
            .sum()
    }

    pub fn failed_levels(&self) -> usize {
        self.branches
            .iter()
            .flat_map(|b| b.levels.iter())
            .filter(|l| l.error.is_some())
            .count()
    }
}

/// Runs the raster and polygon stages for every gridded output of a run.
///
/// CPU-bound stages run on the blocking pool; a failure aborts only the
/// branch (transform) or the level (extraction, storage) it occurred in.
#[derive(Clone)]
pub struct CoveragePipeline {
    store: Arc<dyn SurgeStore>,
    transformer: RasterTransformer,
    extractor: IsoSurfaceExtractor,
    smoother: Option<PolygonSmoother>,
    masker: Option<Arc<PolygonMasker>>,
    thresholds: Vec<(FloodLevel, f64)>,
}

impl CoveragePipeline {
    /// Build the pipeline. The exclusion polygons, when configured, are
    /// loaded and unioned here once.
    pub fn new(store: Arc<dyn SurgeStore>, config: &CoverageConfig) -> SurgeResult<Self> {
        let masker = match &config.exclusion_path {
            Some(path) => {
                let masker = PolygonMasker::from_geojson(path).map_err(SurgeError::from)?;
                info!(path = %path.display(), "Loaded exclusion mask");
                Some(Arc::new(masker))
            }
            None => None,
        };
        Ok(Self {
            store,
            transformer: RasterTransformer::new(config.variable.clone(), config.significance),
            extractor: IsoSurfaceExtractor::new(),
            smoother: (config.smoothing_passes > 0).then(|| PolygonSmoother::new(config.smoothing_passes)),
            masker,
            thresholds: config.thresholds(),
        })
    }

    pub fn with_masker(mut self, masker: PolygonMasker) -> Self {
        self.masker = Some(Arc::new(masker));
        self
    }

    /// Process every `*.nc` file directly inside `job.raster_dir`.
    #[instrument(skip(self, job), fields(job_id = %job.job_id, ty_code = %job.ty_code))]
    pub async fn run(&self, job: &CoverageJob) -> SurgeResult<CoverageReport> {
        if !job.raster_dir.is_dir() {
            return Err(SurgeError::SourceAbsent(job.raster_dir.clone()));
        }
        let inputs = list_netcdf(&job.raster_dir)?;
        if inputs.is_empty() {
            warn!(dir = %job.raster_dir.display(), "No gridded outputs found");
        }

        let mut report = CoverageReport::default();
        for input in inputs {
            report.branches.push(self.process_branch(job, &input).await);
        }

        info!(
            branches = report.branches.len(),
            rasters = report.rasters_produced(),
            polygons = report.polygons_stored(),
            failed_levels = report.failed_levels(),
            "Coverage pipeline finished"
        );
        Ok(report)
    }

    async fn process_branch(&self, job: &CoverageJob, input: &Path) -> BranchReport {
        let file_name = input.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let mut report = BranchReport {
            source: input.to_path_buf(),
            branch: TrackBranch::from_file_name(file_name),
            geotiff: None,
            levels: Vec::new(),
            error: None,
        };

        self.register(job, input, report.branch, RasterFileKind::NetCdf).await;

        let transformer = self.transformer.clone();
        let source = input.to_path_buf();
        let product_dir = job.product_dir.clone();
        let transformed = tokio::task::spawn_blocking(move || transformer.transform(&source, &product_dir))
            .await
            .map_err(|e| SurgeError::from(IngestionError::from(e)))
            .and_then(|r| r);

        let output = match transformed {
            Ok(output) => output,
            Err(e) => {
                warn!(source = %input.display(), branch = %report.branch, error = %e, "Raster transform failed");
                report.error = Some(e.to_string());
                return report;
            }
        };
        self.register(job, &output.path, output.branch, RasterFileKind::GeoTiff).await;

        report.levels = self.extract_levels(job, &output.path, output.branch).await;
        report.geotiff = Some(output.path);
        report
    }

    /// Extract, mask, smooth and store every configured level of an
    /// existing GeoTIFF. Each level is its own commit.
    pub async fn extract_levels(&self, job: &CoverageJob, raster_path: &Path, branch: TrackBranch) -> Vec<LevelReport> {
        let mut levels = Vec::with_capacity(self.thresholds.len());
        for &(level, threshold) in &self.thresholds {
            levels.push(self.process_level(job, raster_path, branch, level, threshold).await);
        }
        levels
    }

    async fn process_level(
        &self,
        job: &CoverageJob,
        raster_path: &Path,
        branch: TrackBranch,
        level: FloodLevel,
        threshold: f64,
    ) -> LevelReport {
        let stem = raster_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("surge")
            .to_string();
        let name = format!("{}_{}", stem, level.suffix());

        let extractor = self.extractor;
        let smoother = self.smoother;
        let masker = self.masker.clone();
        let path = raster_path.to_path_buf();
        let out_dir = job.product_dir.clone();
        let polygons = tokio::task::spawn_blocking(move || -> SurgeResult<Vec<ExceedancePolygon>> {
            let extracted = extractor.extract(&path, threshold, branch, &out_dir, &name)?;
            let mut polygons = extracted.polygons;
            if let Some(masker) = masker {
                polygons = masker.apply(polygons);
            }
            if let Some(smoother) = smoother {
                polygons = smoother.smooth(polygons);
            }
            Ok(polygons)
        })
        .await
        .map_err(|e| SurgeError::from(IngestionError::from(e)))
        .and_then(|r| r);

        let result = match polygons {
            Ok(polygons) => {
                let records = polygon_records(job, branch, level, &polygons);
                self.store.save_polygons(&records).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(stored) => {
                info!(branch = %branch, level = level.centimeters(), threshold, stored, "Flood polygons stored");
                LevelReport {
                    level,
                    polygons_stored: stored,
                    error: None,
                }
            }
            Err(e) => {
                warn!(branch = %branch, level = level.centimeters(), threshold, error = %e, "Flood level failed");
                LevelReport {
                    level,
                    polygons_stored: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn register(&self, job: &CoverageJob, path: &Path, branch: TrackBranch, kind: RasterFileKind) {
        let record = raster_record(job, path, branch, kind);
        if let Err(e) = self.store.register_raster(&record).await {
            warn!(file = %path.display(), kind = ?kind, error = %e, "Failed to register raster file");
        }
    }
}

fn list_netcdf(dir: &Path) -> SurgeResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map(|e| e == "nc").unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn raster_record(job: &CoverageJob, path: &Path, branch: TrackBranch, kind: RasterFileKind) -> RasterFileRecord {
    let dir = path.parent().unwrap_or(Path::new(""));
    let relative = dir.strip_prefix(&job.model_root).unwrap_or(dir);
    RasterFileRecord {
        job_id: job.job_id,
        ty_code: job.ty_code.clone(),
        branch,
        kind,
        relative_path: relative.to_string_lossy().into_owned(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        issue_timestamp: job.issue_timestamp,
    }
}

fn polygon_records(
    job: &CoverageJob,
    branch: TrackBranch,
    level: FloodLevel,
    polygons: &[ExceedancePolygon],
) -> Vec<FloodPolygonRecord> {
    polygons
        .iter()
        .filter_map(|p| {
            let geometry = geojson::Geometry::new(geojson::Value::from(p.polygon()));
            let geometry = serde_json::to_value(geometry).ok()?;
            Some(FloodPolygonRecord {
                job_id: job.job_id,
                ty_code: job.ty_code.clone(),
                branch,
                level,
                threshold: p.threshold,
                geometry,
                area: p.area(),
                issue_timestamp: job.issue_timestamp,
            })
        })
        .collect()
}
