//! Station surge series ingestion.
//!
//! The model writes one whitespace-delimited table per branch. The header
//! row names the stations; each following row is one forecast hour. A
//! leading hour column is recognised either by its header name or by data
//! rows carrying one token more than the header.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use storage::SurgeStore;
use surge_common::{StationSeriesContext, SurgeError, SurgeResult, TrackBranch};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{IngestionError, Result};

/// Header names that mark the first column as the forecast hour.
const HOUR_COLUMN_NAMES: &[&str] = &["hour", "hours", "time", "fhr", "index", "t"];

/// Tokens the model uses for a missing value.
const MISSING_TOKENS: &[&str] = &["nan", "-nan", "na", "null", "--", "-"];

/// A parsed station table: column-major surge values per station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationTable {
    pub stations: Vec<String>,
    /// `series[i]` holds the hourly values of `stations[i]`; missing values
    /// are NaN.
    pub series: Vec<Vec<f64>>,
}

impl StationTable {
    pub fn rows(&self) -> usize {
        self.series.first().map(Vec::len).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.stations
            .iter()
            .map(String::as_str)
            .zip(self.series.iter().map(Vec::as_slice))
    }
}

/// Parse a station table. A table without data rows is `Empty`; a
/// non-numeric, non-missing token is a `Parse` error.
pub fn parse_station_table(text: &str) -> Result<StationTable> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    let (_, header_line) = lines.next().ok_or(IngestionError::Empty)?;
    let header: Vec<&str> = header_line.split_whitespace().collect();
    let rows: Vec<(usize, Vec<&str>)> = lines
        .map(|(n, l)| (n, l.split_whitespace().collect()))
        .collect();

    if rows.is_empty() {
        return Err(IngestionError::Empty);
    }

    let named_hour = HOUR_COLUMN_NAMES.contains(&header[0].to_ascii_lowercase().as_str());
    let unnamed_hour = !named_hour && rows[0].1.len() == header.len() + 1;

    let stations: Vec<String> = if named_hour {
        header[1..].iter().map(|s| s.to_string()).collect()
    } else {
        header.iter().map(|s| s.to_string()).collect()
    };
    if stations.is_empty() {
        return Err(IngestionError::Parse {
            line: 1,
            reason: "header names no stations".into(),
        });
    }
    let skip = usize::from(named_hour || unnamed_hour);

    let mut series = vec![Vec::with_capacity(rows.len()); stations.len()];
    for (line, tokens) in &rows {
        let values = tokens.get(skip..).unwrap_or(&[]);
        if values.len() > stations.len() {
            return Err(IngestionError::Parse {
                line: *line,
                reason: format!("{} values for {} stations", values.len(), stations.len()),
            });
        }
        for (i, column) in series.iter_mut().enumerate() {
            let value = match values.get(i) {
                Some(token) => parse_value(token).ok_or_else(|| IngestionError::Parse {
                    line: *line,
                    reason: format!("invalid value '{}' for station {}", token, stations[i]),
                })?,
                None => f64::NAN,
            };
            column.push(value);
        }
    }

    Ok(StationTable { stations, series })
}

fn parse_value(token: &str) -> Option<f64> {
    if MISSING_TOKENS.contains(&token.to_ascii_lowercase().as_str()) {
        return Some(f64::NAN);
    }
    token.parse::<f64>().ok()
}

/// Outcome of one station table.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub branch: TrackBranch,
    pub records_written: usize,
    pub stations_written: usize,
    pub failed_stations: Vec<String>,
    /// Set when the whole file was skipped.
    pub skipped: Option<String>,
}

impl FileReport {
    fn skipped(path: &Path, branch: TrackBranch, reason: String) -> Self {
        Self {
            path: path.to_path_buf(),
            branch,
            records_written: 0,
            stations_written: 0,
            failed_stations: Vec::new(),
            skipped: Some(reason),
        }
    }
}

/// Per-file reports of one directory ingest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub files: Vec<FileReport>,
}

impl IngestReport {
    pub fn records_written(&self) -> usize {
        self.files.iter().map(|f| f.records_written).sum()
    }

    pub fn files_ingested(&self) -> usize {
        self.files.iter().filter(|f| f.skipped.is_none()).count()
    }

    pub fn failed_stations(&self) -> usize {
        self.files.iter().map(|f| f.failed_stations.len()).sum()
    }
}

/// Reads station tables and persists one transaction per station.
#[derive(Clone)]
pub struct StationSeriesIngestor {
    store: Arc<dyn SurgeStore>,
}

impl StationSeriesIngestor {
    pub fn new(store: Arc<dyn SurgeStore>) -> Self {
        Self { store }
    }

    /// Ingest every table directly inside `dir`, in file name order.
    ///
    /// Only a missing directory is an error; bad files and failing stations
    /// show up in the report.
    #[instrument(skip(self, ctx), fields(ty_code = %ctx.ty_code))]
    pub async fn ingest_dir(
        &self,
        dir: &Path,
        job_id: Uuid,
        ctx: &StationSeriesContext,
    ) -> SurgeResult<IngestReport> {
        if !dir.is_dir() {
            return Err(SurgeError::SourceAbsent(dir.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .map(|e| e.into_path())
            .collect();
        files.sort();

        let mut report = IngestReport::default();
        for path in files {
            report.files.push(self.ingest_file(&path, job_id, ctx).await);
        }

        info!(
            dir = %dir.display(),
            files = report.files.len(),
            ingested = report.files_ingested(),
            records = report.records_written(),
            failed_stations = report.failed_stations(),
            "Station series ingest finished"
        );
        Ok(report)
    }

    /// Ingest one table. Never fails; problems are recorded in the report.
    pub async fn ingest_file(&self, path: &Path, job_id: Uuid, ctx: &StationSeriesContext) -> FileReport {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let branch = TrackBranch::from_file_name(file_name);

        let table = match read_table(path).await {
            Ok(table) => table,
            Err(e) => {
                warn!(file = %path.display(), reason = %e, "Skipping station table");
                return FileReport::skipped(path, branch, e.to_string());
            }
        };
        if !branch.is_known() {
            warn!(file = %path.display(), "Station table has no recognised branch");
        }

        let mut report = FileReport {
            path: path.to_path_buf(),
            branch,
            records_written: 0,
            stations_written: 0,
            failed_stations: Vec::new(),
            skipped: None,
        };

        for (station, values) in table.iter() {
            let samples = ctx.samples(station, branch, values);
            match self.store.save_station_series(job_id, &ctx.ty_code, &samples).await {
                Ok(written) => {
                    debug!(station, written, "Station series stored");
                    report.records_written += written;
                    report.stations_written += 1;
                }
                Err(e) => {
                    warn!(station, branch = %branch, error = %e, "Failed to store station series");
                    report.failed_stations.push(station.to_string());
                }
            }
        }

        info!(
            file = %path.display(),
            branch = %branch,
            rows = table.rows(),
            stations = report.stations_written,
            records = report.records_written,
            "Station table ingested"
        );
        report
    }
}

async fn read_table(path: &Path) -> Result<StationTable> {
    let text = tokio::fs::read_to_string(path).await?;
    parse_station_table(&text)
}
