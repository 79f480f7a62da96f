//! NetCDF reader for storm-surge model output.
//!
//! The surge model writes one NetCDF file per track branch holding the
//! maximum-surge field (`zmax`) over `lon`/`lat` coordinate axes. This crate
//! opens those files with the native `netcdf` library and returns the field
//! in a fixed lat-major layout together with its coordinate vectors.

pub mod error;
pub mod field;
pub mod native;

pub use error::{NetCdfError, NetCdfResult};
pub use field::{AxisOrder, SurgeField};
pub use native::{read_surge_field, silence_hdf5_errors};

/// Name of the maximum-surge variable in model output.
pub const ZMAX_VARIABLE: &str = "zmax";
