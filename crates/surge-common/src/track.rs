//! Cyclone tracks and the submission request they arrive in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::time::from_epoch_millis;
use crate::{SurgeError, SurgeResult};

/// One time-stamped sample of a cyclone track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Central pressure in hPa.
    pub central_pressure: f64,
    pub is_forecast: bool,
    /// Intensity category label, e.g. "TY" or "STY".
    pub category: String,
}

/// A validated track: at least one sample, strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(points: Vec<TrackPoint>) -> SurgeResult<Self> {
        if points.is_empty() {
            return Err(SurgeError::InvalidTrack("track has no samples".into()));
        }
        for (i, pair) in points.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SurgeError::InvalidTrack(format!(
                    "timestamps not strictly increasing at sample {} ({} -> {})",
                    i + 1,
                    pair[0].timestamp,
                    pair[1].timestamp
                )));
            }
        }
        for p in &points {
            if !(-90.0..=90.0).contains(&p.latitude) || !(-180.0..=360.0).contains(&p.longitude) {
                return Err(SurgeError::InvalidTrack(format!(
                    "position out of range at {}: lat={} lon={}",
                    p.timestamp, p.latitude, p.longitude
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.points[0].timestamp
    }
}

/// Case metadata that accompanies a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseInfo {
    /// Cyclone number, e.g. "2504".
    pub code: String,
    pub name_en: String,
    pub name_cn: String,
    /// When the case was submitted; used as the issue time of every output.
    pub submitted_at: DateTime<Utc>,
}

// ============================================================================
// Submission request (client JSON)
// ============================================================================

/// The request body clients submit to start a surge run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurgeRequest {
    pub ty_detail: TyDetail,
    pub ty_path_list: Vec<TyPathPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TyDetail {
    #[serde(deserialize_with = "code_from_any")]
    pub ty_code: String,
    pub ty_name_ch: String,
    pub ty_name_en: String,
    /// Submission time in epoch milliseconds.
    pub time_stamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TyPathPoint {
    pub forecast_dt: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub bp: f64,
    pub is_forecast: bool,
    #[serde(default)]
    pub ty_type: String,
}

/// Cyclone codes arrive either as JSON numbers or strings.
fn code_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "tyCode must be a string or number, got {}",
            other
        ))),
    }
}

impl SurgeRequest {
    /// Validate the request and split it into case metadata and a track.
    pub fn into_parts(self) -> SurgeResult<(CaseInfo, Track)> {
        let submitted_at = from_epoch_millis(self.ty_detail.time_stamp).ok_or_else(|| {
            SurgeError::InvalidTrack(format!(
                "timeStamp out of range: {}",
                self.ty_detail.time_stamp
            ))
        })?;

        let case = CaseInfo {
            code: self.ty_detail.ty_code,
            name_en: self.ty_detail.ty_name_en,
            name_cn: self.ty_detail.ty_name_ch,
            submitted_at,
        };

        let points = self
            .ty_path_list
            .into_iter()
            .map(|p| TrackPoint {
                timestamp: p.forecast_dt,
                latitude: p.lat,
                longitude: p.lon,
                central_pressure: p.bp,
                is_forecast: p.is_forecast,
                category: p.ty_type,
            })
            .collect();

        Ok((case, Track::new(points)?))
    }
}
