//! Gridded model output written with the netcdf library, shaped like the
//! surge model's `zmax_<branch>.dat.nc` files.

use std::path::{Path, PathBuf};

/// Write `zmax(lat, lon)` with `lat`/`lon` coordinate variables.
///
/// `values` are lat-major in the order of `lats`. `missing`, when given, is
/// stored as the variable's `missing_value` attribute.
pub fn write_zmax_netcdf(path: &Path, lons: &[f64], lats: &[f64], values: &[f32], missing: Option<f32>) -> PathBuf {
    assert_eq!(values.len(), lons.len() * lats.len(), "zmax values must cover the grid");

    let mut file = netcdf::create(path).expect("Failed to create NetCDF fixture");
    file.add_dimension("lat", lats.len()).expect("lat dimension");
    file.add_dimension("lon", lons.len()).expect("lon dimension");
    {
        let mut lat = file.add_variable::<f64>("lat", &["lat"]).expect("lat variable");
        lat.put_values(lats, ..).expect("lat values");
    }
    {
        let mut lon = file.add_variable::<f64>("lon", &["lon"]).expect("lon variable");
        lon.put_values(lons, ..).expect("lon values");
    }
    {
        let mut zmax = file.add_variable::<f32>("zmax", &["lat", "lon"]).expect("zmax variable");
        if let Some(missing) = missing {
            zmax.put_attribute("missing_value", missing).expect("missing_value");
        }
        zmax.put_values(values, ..).expect("zmax values");
    }
    path.to_path_buf()
}

/// A `size` x `size` surge dome on a 0.1 degree grid with south-to-north
/// latitudes starting at 20.0N, 118.0E. The center holds `peak`, falling
/// linearly to 0 at the nearest edge.
pub fn write_dome_netcdf(path: &Path, size: usize, peak: f32) -> PathBuf {
    let lons: Vec<f64> = (0..size).map(|i| 118.0 + 0.1 * i as f64).collect();
    let lats: Vec<f64> = (0..size).map(|i| 20.0 + 0.1 * i as f64).collect();
    let c = (size as f32 - 1.0) / 2.0;
    let radius = c.max(1.0);
    let mut values = Vec::with_capacity(size * size);
    for row in 0..size {
        for col in 0..size {
            let d = ((col as f32 - c).powi(2) + (row as f32 - c).powi(2)).sqrt();
            values.push((peak * (1.0 - d / radius)).max(0.0));
        }
    }
    write_zmax_netcdf(path, &lons, &lats, &values, None)
}
