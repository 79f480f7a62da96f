//! Flood exceedance levels and the unit surge values are expressed in.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unit of the model's surge values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurgeUnit {
    #[default]
    Meters,
    Centimeters,
}

impl FromStr for SurgeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "meter" | "meters" => Ok(SurgeUnit::Meters),
            "cm" | "centimeter" | "centimeters" => Ok(SurgeUnit::Centimeters),
            other => Err(format!("unknown surge unit: {}", other)),
        }
    }
}

/// Exceedance level driving one iso-surface extraction per raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloodLevel {
    #[serde(rename = "gte100")]
    Gte100,
    #[serde(rename = "gte150")]
    Gte150,
    #[serde(rename = "gte200")]
    Gte200,
}

impl FloodLevel {
    pub const ALL: [FloodLevel; 3] = [FloodLevel::Gte100, FloodLevel::Gte150, FloodLevel::Gte200];

    pub fn centimeters(&self) -> u32 {
        match self {
            FloodLevel::Gte100 => 100,
            FloodLevel::Gte150 => 150,
            FloodLevel::Gte200 => 200,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            FloodLevel::Gte100 => 4201,
            FloodLevel::Gte150 => 4202,
            FloodLevel::Gte200 => 4203,
        }
    }

    pub fn from_centimeters(cm: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.centimeters() == cm)
    }

    /// Scalar threshold to compare raster values against.
    pub fn threshold(&self, unit: SurgeUnit) -> f64 {
        match unit {
            SurgeUnit::Meters => self.centimeters() as f64 / 100.0,
            SurgeUnit::Centimeters => self.centimeters() as f64,
        }
    }

    /// Suffix used in artifact names, e.g. `gt100`.
    pub fn suffix(&self) -> String {
        format!("gt{}", self.centimeters())
    }
}
