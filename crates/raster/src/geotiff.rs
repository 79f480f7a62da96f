//! Minimal GeoTIFF support: one deflate-compressed Float32 band, north-up
//! affine georeference via ModelPixelScale + ModelTiepoint, geographic WGS84
//! GeoKeys.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use surge_common::{CrsCode, GeoTransform, SurgeGrid};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::compression::Deflate;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{RasterError, RasterResult};

// GeoKey ids and values (GeoTIFF 1.0)
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

fn geokey_directory(crs: CrsCode) -> Vec<u16> {
    vec![
        1, 1, 0, 3, // version, revision, minor, key count
        GT_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC,
        GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
        GEOGRAPHIC_TYPE, 0, 1, crs.epsg(),
    ]
}

/// Write `grid` as a GeoTIFF, replacing any existing file.
pub fn write_geotiff(path: &Path, grid: &SurgeGrid) -> RasterResult<()> {
    if grid.transform.pixel_height >= 0.0 || grid.transform.pixel_width <= 0.0 {
        return Err(RasterError::Unsupported(
            "only north-up rasters can be written".into(),
        ));
    }

    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(writer)?;
    let mut image = encoder.new_image_with_compression::<colortype::Gray32Float, _>(
        grid.width as u32,
        grid.height as u32,
        Deflate::default(),
    )?;

    let t = &grid.transform;
    let pixel_scale = [t.pixel_width, -t.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
    let geokeys = geokey_directory(grid.crs);

    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])?;
    image.encoder().write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;
    image.encoder().write_tag(Tag::GdalNodata, "nan")?;
    image.write_data(&grid.data)?;

    debug!(
        path = %path.display(),
        width = grid.width,
        height = grid.height,
        "Wrote GeoTIFF"
    );
    Ok(())
}

/// Read a single-band Float32 GeoTIFF written by [`write_geotiff`] (or any
/// tiff with pixel-scale/tiepoint georeferencing). A numeric GDAL nodata
/// value is mapped to NaN.
pub fn read_geotiff(path: &Path) -> RasterResult<SurgeGrid> {
    let reader = BufReader::new(File::open(path)?);
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;

    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| RasterError::MissingGeoreference("ModelPixelScaleTag".into()))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| RasterError::MissingGeoreference("ModelTiepointTag".into()))?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(RasterError::MissingGeoreference(
            "malformed pixel scale or tiepoint".into(),
        ));
    }

    let nodata = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim_end_matches('\0').trim().parse::<f32>().ok());

    let mut data = match decoder.read_image()? {
        DecodingResult::F32(values) => values,
        DecodingResult::F64(values) => values.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(values) => values.into_iter().map(f32::from).collect(),
        _ => {
            return Err(RasterError::Unsupported(
                "expected a single floating-point band".into(),
            ))
        }
    };
    if let Some(nd) = nodata.filter(|v| !v.is_nan()) {
        data.iter_mut().filter(|v| **v == nd).for_each(|v| *v = f32::NAN);
    }

    // Tiepoint maps raster (i, j) to model (x, y)
    let transform = GeoTransform::new(
        tiepoint[3] - tiepoint[0] * scale[0],
        tiepoint[4] + tiepoint[1] * scale[1],
        scale[0],
        -scale[1],
    );

    SurgeGrid::new(width as usize, height as usize, data, transform)
        .map_err(|e| RasterError::Unsupported(e.to_string()))
}
