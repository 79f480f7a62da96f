//! Raster products of the surge pipeline.
//!
//! - [`geotiff`]: single-band Float32 GeoTIFF encode/decode (EPSG:4326, NaN nodata)
//! - [`transform`]: the RasterTransformer that turns the model's NetCDF
//!   maximum-surge field into a north-up, significance-masked GeoTIFF

pub mod error;
pub mod geotiff;
pub mod transform;

pub use error::{RasterError, RasterResult};
pub use geotiff::{read_geotiff, write_geotiff};
pub use netcdf_parser::ZMAX_VARIABLE;
pub use transform::{
    normalize_field, output_file_name, RasterTransformer, TransformOutput,
    DEFAULT_SIGNIFICANCE,
};
