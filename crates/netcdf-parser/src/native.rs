//! Native NetCDF reading using the netcdf library.

use std::path::Path;
use std::sync::Once;

use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::field::{is_lat_name, is_lon_name, AxisOrder, SurgeField};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). Call once early in `main`; repeat calls are
/// no-ops.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 with null handlers is a documented way to
        // disable automatic error printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Read a 2-D surge variable and its lon/lat coordinate vectors.
///
/// Leading singleton dimensions (e.g. a one-step `time` axis) are
/// accepted and dropped. `_FillValue`/`missing_value` become NaN.
pub fn read_surge_field(path: &Path, variable: &str) -> NetCdfResult<SurgeField> {
    silence_hdf5_errors();

    let nc_file = netcdf::open(path)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;

    let var = nc_file
        .variable(variable)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", variable)))?;

    let dims: Vec<(String, usize)> = var
        .dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .collect();
    if dims.len() < 2 {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} has {} dimensions, expected 2",
            variable,
            dims.len()
        )));
    }
    let (spatial, leading) = (&dims[dims.len() - 2..], &dims[..dims.len() - 2]);
    if let Some((name, len)) = leading.iter().find(|(_, len)| *len != 1) {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} has non-singleton leading dimension {} ({})",
            variable, name, len
        )));
    }
    let order = AxisOrder::from_dimension_names(&spatial[0].0, &spatial[1].0)?;
    let (lon_dim, lat_dim) = match order {
        AxisOrder::LatLon => (&spatial[1].0, &spatial[0].0),
        AxisOrder::LonLat => (&spatial[0].0, &spatial[1].0),
    };

    let lons = read_coordinate(&nc_file, lon_dim, is_lon_name)?;
    let lats = read_coordinate(&nc_file, lat_dim, is_lat_name)?;

    let raw: Vec<f32> = var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", variable, e)))?;

    let fill = get_f32_attr(&var, "_FillValue").or_else(|| get_f32_attr(&var, "missing_value"));
    let scale = get_f32_attr(&var, "scale_factor");
    let offset = get_f32_attr(&var, "add_offset");

    debug!(
        path = %path.display(),
        variable = variable,
        width = lons.len(),
        height = lats.len(),
        fill = ?fill,
        "Read surge field"
    );

    let mut field = SurgeField::from_raw(raw, order, lons, lats)?;
    field.unpack(fill, scale, offset);
    Ok(field)
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Read the coordinate variable for a dimension. Falls back to any 1-D
/// variable with a recognised lon/lat name when the dimension has no
/// same-named coordinate variable.
fn read_coordinate(
    nc_file: &netcdf::File,
    dim_name: &str,
    matches_axis: fn(&str) -> bool,
) -> NetCdfResult<Vec<f64>> {
    let var = match nc_file.variable(dim_name) {
        Some(v) => v,
        None => nc_file
            .variables()
            .find(|v| v.dimensions().len() == 1 && matches_axis(&v.name()))
            .ok_or_else(|| NetCdfError::MissingData(format!("{} coordinate", dim_name)))?,
    };
    var.get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", dim_name, e)))
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}
