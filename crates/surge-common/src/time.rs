//! Time handling for track files and station series.
//!
//! The surge model works in China Standard Time (UTC+8); everything stored by
//! the pipeline is UTC.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

/// Offset of the model's civil time zone from UTC, in seconds.
pub const CST_OFFSET_SECS: i32 = 8 * 3600;

/// Hour-resolution timestamp format used in the model's track file.
pub const TRACK_TIME_FORMAT: &str = "%Y%m%d%H";

/// The model's civil time zone.
pub fn cst() -> FixedOffset {
    FixedOffset::east_opt(CST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Render a UTC timestamp as a `YYYYMMDDHH` string in UTC+8.
pub fn format_cst_hour(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&cst()).format(TRACK_TIME_FORMAT).to_string()
}

/// Parse a `YYYYMMDDHH` UTC+8 string back into UTC.
pub fn parse_cst_hour(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(&format!("{}0000", s), "%Y%m%d%H%M%S").ok()?;
    cst()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Timestamp of the `index`-th hourly step after `start`.
pub fn forecast_timestamp(start: DateTime<Utc>, index: usize) -> DateTime<Utc> {
    start + Duration::hours(index as i64)
}

/// Convert epoch milliseconds (as sent by clients) into a UTC timestamp.
pub fn from_epoch_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// Convert epoch seconds into a UTC timestamp.
pub fn from_epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}
