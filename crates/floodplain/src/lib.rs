//! Flood exceedance polygons from surge rasters.
//!
//! The chain per raster and flood level is:
//!
//! 1. [`IsoSurfaceExtractor`]: `value > threshold` mask, polygonized into
//!    one polygon per 4-connected exceedance region
//! 2. [`PolygonMasker`]: subtract the union of an exclusion layer (land)
//! 3. [`PolygonSmoother`]: Chaikin corner cutting to remove stairsteps
//!
//! [`features`] converts between polygon sets and GeoJSON.

pub mod error;
pub mod features;
pub mod isosurface;
pub mod mask;
pub mod smooth;
pub mod types;
pub mod vectorize;

pub use error::{FloodplainError, FloodplainResult};
pub use isosurface::{ExtractionOutput, ExtractionResult, IsoSurfaceExtractor};
pub use mask::PolygonMasker;
pub use smooth::{PolygonSmoother, DEFAULT_PASSES};
pub use types::ExceedancePolygon;
pub use vectorize::polygonize;
