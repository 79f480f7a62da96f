//! Serialization of a candidate track into the model's input files.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use surge_common::time::format_cst_hour;
use surge_common::{CaseInfo, SurgeError, SurgeResult, Track};
use tracing::info;

pub const CASE_INFO_FILE: &str = "tc_info.json";
pub const TRACK_FILE: &str = "tc_track_info.txt";
pub const TRACK_HEADER: &str = "dateCST lonTC latTC presTC";

/// Paths of the two files written for a case.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFiles {
    pub case_info: PathBuf,
    pub track: PathBuf,
}

#[derive(Serialize)]
struct CaseInfoFile<'a> {
    tc_num: &'a str,
    tc_name_en: &'a str,
    tc_name_cn: &'a str,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrackFileWriter;

impl TrackFileWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write `tc_info.json` and `tc_track_info.txt` into `dir`, replacing
    /// existing files. If `dir` cannot be created nothing is written.
    pub async fn write(&self, dir: &Path, case: &CaseInfo, track: &Track) -> SurgeResult<TrackFiles> {
        let case_json = render_case_info(case)?;
        let table = render_track_table(track);

        tokio::fs::create_dir_all(dir).await?;

        let files = TrackFiles {
            case_info: dir.join(CASE_INFO_FILE),
            track: dir.join(TRACK_FILE),
        };
        tokio::fs::write(&files.case_info, case_json).await?;
        tokio::fs::write(&files.track, table).await?;

        info!(
            dir = %dir.display(),
            ty_code = %case.code,
            samples = track.len(),
            "Wrote track input files"
        );
        Ok(files)
    }
}

/// Case metadata as the model expects it: four-space indented JSON with
/// non-ASCII names written as-is.
pub fn render_case_info(case: &CaseInfo) -> SurgeResult<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    CaseInfoFile {
        tc_num: &case.code,
        tc_name_en: &case.name_en,
        tc_name_cn: &case.name_cn,
    }
    .serialize(&mut ser)
    .map_err(|e| SurgeError::TransformFailed(format!("case info: {}", e)))?;
    String::from_utf8(buf).map_err(|e| SurgeError::TransformFailed(format!("case info: {}", e)))
}

/// Header line plus one `YYYYMMDDHH lon lat pressure` line per sample, time
/// in UTC+8, positions with one decimal, pressure rounded.
pub fn render_track_table(track: &Track) -> String {
    let mut out = String::with_capacity(32 * (track.len() + 1));
    out.push_str(TRACK_HEADER);
    out.push('\n');
    for p in track.points() {
        out.push_str(&format!(
            "{} {:.1} {:.1} {}\n",
            format_cst_hour(&p.timestamp),
            p.longitude,
            p.latitude,
            p.central_pressure.round() as i64
        ));
    }
    out
}
