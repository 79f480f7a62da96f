//! In-memory representation of a gridded surge field.

use crate::error::{NetCdfError, NetCdfResult};

/// Storage order of a 2-D variable as found in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// Dimensions `(lat, lon)`: each row is one latitude.
    LatLon,
    /// Dimensions `(lon, lat)`: each row is one longitude.
    LonLat,
}

impl AxisOrder {
    /// Work out the order from the variable's dimension names.
    pub fn from_dimension_names(first: &str, second: &str) -> NetCdfResult<Self> {
        match (is_lat_name(first), is_lon_name(second), is_lon_name(first), is_lat_name(second)) {
            (true, true, _, _) => Ok(AxisOrder::LatLon),
            (_, _, true, true) => Ok(AxisOrder::LonLat),
            _ => Err(NetCdfError::InvalidFormat(format!(
                "expected lat/lon dimensions, found ({}, {})",
                first, second
            ))),
        }
    }
}

pub(crate) fn is_lat_name(name: &str) -> bool {
    matches!(name.to_ascii_lowercase().as_str(), "lat" | "latitude" | "y")
}

pub(crate) fn is_lon_name(name: &str) -> bool {
    matches!(name.to_ascii_lowercase().as_str(), "lon" | "longitude" | "x")
}

/// A surge field in lat-major order: `values[i * lons.len() + j]` is the
/// value at (`lats[i]`, `lons[j]`). Latitudes keep the file's ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct SurgeField {
    pub values: Vec<f32>,
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
}

impl SurgeField {
    /// Assemble a field from raw variable data, transposing `(lon, lat)`
    /// storage into lat-major order.
    pub fn from_raw(
        raw: Vec<f32>,
        order: AxisOrder,
        lons: Vec<f64>,
        lats: Vec<f64>,
    ) -> NetCdfResult<Self> {
        let (nx, ny) = (lons.len(), lats.len());
        if raw.len() != nx * ny {
            return Err(NetCdfError::InvalidFormat(format!(
                "variable has {} values but coordinates describe {}x{}",
                raw.len(),
                nx,
                ny
            )));
        }

        let values = match order {
            AxisOrder::LatLon => raw,
            AxisOrder::LonLat => {
                let mut out = vec![f32::NAN; raw.len()];
                for j in 0..nx {
                    for i in 0..ny {
                        out[i * nx + j] = raw[j * ny + i];
                    }
                }
                out
            }
        };

        Ok(Self { values, lons, lats })
    }

    pub fn width(&self) -> usize {
        self.lons.len()
    }

    pub fn height(&self) -> usize {
        self.lats.len()
    }

    pub fn get(&self, lat_index: usize, lon_index: usize) -> Option<f32> {
        if lon_index >= self.width() {
            return None;
        }
        self.values.get(lat_index * self.width() + lon_index).copied()
    }

    /// Replace fill values with NaN and apply CF packing attributes.
    pub fn unpack(&mut self, fill: Option<f32>, scale: Option<f32>, offset: Option<f32>) {
        let scale = scale.unwrap_or(1.0);
        let offset = offset.unwrap_or(0.0);
        for v in self.values.iter_mut() {
            if fill.is_some_and(|f| *v == f) {
                *v = f32::NAN;
            } else if !v.is_nan() {
                *v = *v * scale + offset;
            }
        }
    }
}
