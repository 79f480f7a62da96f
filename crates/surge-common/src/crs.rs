//! Coordinate reference system attached to surge rasters and polygons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference systems the pipeline emits. Model output is always geographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lon/lat in degrees)
    #[default]
    Epsg4326,
}

impl CrsCode {
    /// Numeric EPSG code, as stored in GeoTIFF GeoKeys.
    pub fn epsg(&self) -> u16 {
        match self {
            CrsCode::Epsg4326 => 4326,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326)
    }

    /// Look up a CRS from its EPSG number.
    pub fn from_epsg(code: u16) -> Option<Self> {
        match code {
            4326 => Some(CrsCode::Epsg4326),
            _ => None,
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_round_trip() {
        assert_eq!(CrsCode::from_epsg(4326), Some(CrsCode::Epsg4326));
        assert_eq!(CrsCode::from_epsg(3857), None);
        assert_eq!(CrsCode::Epsg4326.to_string(), "EPSG:4326");
    }
}
