//! Per-station surge series samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::forecast_timestamp;
use crate::TrackBranch;

/// One hourly surge value at one station for one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSurgeSample {
    pub station_code: String,
    /// 0-based hour offset from the forecast start.
    pub forecast_index: u32,
    pub forecast_timestamp: DateTime<Utc>,
    pub issue_timestamp: DateTime<Utc>,
    pub surge_value: f64,
    pub branch: TrackBranch,
}

/// Identity shared by every sample of one ingest run.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSeriesContext {
    pub ty_code: String,
    pub issue_timestamp: DateTime<Utc>,
    pub forecast_start: DateTime<Utc>,
}

impl StationSeriesContext {
    /// Expand one station's ordered values into samples. NaN becomes 0.0.
    pub fn samples(
        &self,
        station_code: &str,
        branch: TrackBranch,
        values: &[f64],
    ) -> Vec<StationSurgeSample> {
        values
            .iter()
            .enumerate()
            .map(|(index, value)| StationSurgeSample {
                station_code: station_code.to_string(),
                forecast_index: index as u32,
                forecast_timestamp: forecast_timestamp(self.forecast_start, index),
                issue_timestamp: self.issue_timestamp,
                surge_value: if value.is_finite() { *value } else { 0.0 },
                branch,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::from_epoch_secs;

    #[test]
    fn test_samples_anchor_and_normalize() {
        let ctx = StationSeriesContext {
            ty_code: "2504".into(),
            issue_timestamp: from_epoch_secs(1_700_000_000).unwrap(),
            forecast_start: from_epoch_secs(1_700_000_000).unwrap(),
        };
        let samples = ctx.samples("A", TrackBranch::Center, &[10.5, f64::NAN, 12.0]);

        let values: Vec<f64> = samples.iter().map(|s| s.surge_value).collect();
        assert_eq!(values, vec![10.5, 0.0, 12.0]);

        let times: Vec<i64> = samples.iter().map(|s| s.forecast_timestamp.timestamp()).collect();
        assert_eq!(times, vec![1_700_000_000, 1_700_003_600, 1_700_007_200]);
        assert!(samples.iter().all(|s| s.branch == TrackBranch::Center));
        assert_eq!(samples[2].forecast_index, 2);
    }
}
