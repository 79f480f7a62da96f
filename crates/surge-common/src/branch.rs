//! Track perturbation branches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five ensemble track variants the surge model runs, or
/// `Unknown` for anything that does not follow the naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackBranch {
    Center,
    Slow,
    Fast,
    Right,
    Left,
    Unknown,
}

impl TrackBranch {
    /// The five real branches, in code order.
    pub const ALL: [TrackBranch; 5] = [
        TrackBranch::Center,
        TrackBranch::Slow,
        TrackBranch::Fast,
        TrackBranch::Right,
        TrackBranch::Left,
    ];

    /// Map a filename fragment onto a branch. Total: unrecognized input
    /// yields `Unknown`.
    pub fn classify(fragment: &str) -> Self {
        match fragment.trim().to_ascii_lowercase().as_str() {
            "center" => TrackBranch::Center,
            "slow" => TrackBranch::Slow,
            "fast" => TrackBranch::Fast,
            "right" => TrackBranch::Right,
            "left" => TrackBranch::Left,
            _ => TrackBranch::Unknown,
        }
    }

    /// Derive the branch from a model output name such as `zmax_center.dat.nc`
    /// or `surge_left.txt`: the part after the first `_` of the first
    /// `.`-separated component.
    pub fn from_file_name(name: &str) -> Self {
        let stem = name.split('.').next().unwrap_or_default();
        match stem.split('_').nth(1) {
            Some(fragment) => Self::classify(fragment),
            None => TrackBranch::Unknown,
        }
    }

    /// Numeric code used in persisted records.
    pub fn code(&self) -> i32 {
        match self {
            TrackBranch::Center => 4101,
            TrackBranch::Slow => 4102,
            TrackBranch::Fast => 4103,
            TrackBranch::Right => 4104,
            TrackBranch::Left => 4105,
            TrackBranch::Unknown => -1,
        }
    }

    pub fn from_code(code: i32) -> Self {
        Self::ALL
            .into_iter()
            .find(|b| b.code() == code)
            .unwrap_or(TrackBranch::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackBranch::Center => "center",
            TrackBranch::Slow => "slow",
            TrackBranch::Fast => "fast",
            TrackBranch::Right => "right",
            TrackBranch::Left => "left",
            TrackBranch::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != TrackBranch::Unknown
    }
}

impl fmt::Display for TrackBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
