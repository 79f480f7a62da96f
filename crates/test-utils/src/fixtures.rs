//! Common fixtures: model output tables, tracks and requests.

use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use surge_common::track::SurgeRequest;
use surge_common::{CaseInfo, Track, TrackPoint};

/// Station table in the model's layout: hour column then station codes.
pub const STATION_TABLE_CENTER: &str = "\
hour  A      B      C
0     10.5   0.20   -0.10
1     NaN    0.35   -0.05
2     12.0   0.50   0.00
";

/// Station table without an hour column: every column is a station.
pub const STATION_TABLE_NO_HOUR: &str = "\
A      B
10.5   1.0
nan    2.0
12.0   3.0
";

/// Table with a non-numeric token that cannot be parsed.
pub const STATION_TABLE_CORRUPT: &str = "\
hour  A     B
0     1.0   oops
";

/// A table with a header but no data rows.
pub const STATION_TABLE_EMPTY: &str = "hour  A  B\n";

/// The sample request sent by the front end for typhoon 2504 (DANAS).
pub const SAMPLE_REQUEST_JSON: &str = r#"{
    "tyDetail": {"timeStamp": 1752461190841, "tyCode": 2504, "tyNameCh": "丹娜丝", "tyNameEn": "DANAS"},
    "tyPathList": [
        {"forecastDt": "2025-07-06T15:00:00Z", "lat": 23.3, "lon": 120.0, "bp": 950.0, "isForecast": false, "tyType": "STY"},
        {"forecastDt": "2025-07-06T16:00:00Z", "lat": 23.4, "lon": 120.2, "bp": 960.0, "isForecast": false, "tyType": "TY"},
        {"forecastDt": "2025-07-06T17:00:00Z", "lat": 23.5, "lon": 120.4, "bp": 960.0, "isForecast": false, "tyType": "TY"},
        {"forecastDt": "2025-07-06T18:00:00Z", "lat": 23.7, "lon": 120.7, "bp": 965.4, "isForecast": true, "tyType": "TY"}
    ]
}"#;

pub fn sample_request() -> SurgeRequest {
    serde_json::from_str(SAMPLE_REQUEST_JSON).expect("sample request is valid JSON")
}

pub fn sample_case_and_track() -> (CaseInfo, Track) {
    sample_request()
        .into_parts()
        .expect("sample request holds a valid track")
}

/// Track of `n` hourly points starting 2025-07-06T15:00Z, moving north-east.
pub fn hourly_track(n: usize) -> Track {
    let start = Utc.with_ymd_and_hms(2025, 7, 6, 15, 0, 0).unwrap();
    let points = (0..n)
        .map(|i| TrackPoint {
            timestamp: start + chrono::Duration::hours(i as i64),
            latitude: 20.0 + 0.15 * i as f64,
            longitude: 118.0 + 0.25 * i as f64,
            central_pressure: 950.0 + i as f64,
            is_forecast: i > 0,
            category: "TY".to_string(),
        })
        .collect();
    Track::new(points).expect("hourly track is strictly increasing")
}

/// Write `content` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write fixture");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_request_parses() {
        let (case, track) = sample_case_and_track();
        assert_eq!(case.code, "2504");
        assert_eq!(track.len(), 4);
    }

    #[test]
    fn test_hourly_track() {
        assert_eq!(hourly_track(6).len(), 6);
    }
}
