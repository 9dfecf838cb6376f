//! Raster containers handled by the `image` crate

use crate::error::{Error, Result};
use crate::image::{Image, PixelData};
use crate::types::{JpegQuality, PixelType};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageBuffer, ImageReader, Luma};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Decode a PNG/JPEG/TIFF/... file into a 2-D image `[width, height]`
///
/// # Errors
///
/// - [`Error::Io`] if the file cannot be opened
/// - [`Error::Read`] if the container cannot be decoded
pub fn read_raster(path: &Path) -> Result<Image> {
    let io_error = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let decoded = ImageReader::open(path)
        .map_err(io_error)?
        .with_guessed_format()
        .map_err(io_error)?
        .decode()
        .map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let shape = vec![decoded.width() as usize, decoded.height() as usize];
    let (data, components) = samples(decoded);
    debug!(path = %path.display(), ?shape, components, "Decoded raster");
    Image::new(data, shape, components)
}

fn samples(decoded: DynamicImage) -> (PixelData, usize) {
    match decoded {
        DynamicImage::ImageLuma8(buf) => (PixelData::UInt8(buf.into_raw()), 1),
        DynamicImage::ImageLumaA8(buf) => (PixelData::UInt8(buf.into_raw()), 2),
        DynamicImage::ImageRgb8(buf) => (PixelData::UInt8(buf.into_raw()), 3),
        DynamicImage::ImageRgba8(buf) => (PixelData::UInt8(buf.into_raw()), 4),
        DynamicImage::ImageLuma16(buf) => (PixelData::UInt16(buf.into_raw()), 1),
        DynamicImage::ImageLumaA16(buf) => (PixelData::UInt16(buf.into_raw()), 2),
        DynamicImage::ImageRgb16(buf) => (PixelData::UInt16(buf.into_raw()), 3),
        DynamicImage::ImageRgba16(buf) => (PixelData::UInt16(buf.into_raw()), 4),
        DynamicImage::ImageRgb32F(buf) => (PixelData::Float32(buf.into_raw()), 3),
        other => (PixelData::Float32(other.into_rgba32f().into_raw()), 4),
    }
}

/// `(width, height)` of a 1-D or 2-D single-channel image
fn plane_extent(image: &Image, path: &Path) -> Result<(u32, u32)> {
    if image.num_components() != 1 {
        return Err(Error::Configuration(format!(
            "cannot write {} components to {}, reduce channels first",
            image.num_components(),
            path.display()
        )));
    }
    let extent = |n: usize| {
        u32::try_from(n).map_err(|_| {
            Error::Configuration(format!("extent {n} too large for {}", path.display()))
        })
    };
    match *image.shape() {
        [width] => Ok((extent(width)?, 1)),
        [width, height] => Ok((extent(width)?, extent(height)?)),
        _ => Err(Error::UnsupportedDimension {
            path: path.to_path_buf(),
            dimension: image.dimension(),
        }),
    }
}

fn to_dynamic(image: &Image, path: &Path) -> Result<DynamicImage> {
    let (width, height) = plane_extent(image, path)?;
    let mismatch = || Error::Configuration(format!("sample buffer does not fit {width}x{height}"));
    match image.data() {
        PixelData::UInt8(values) => GrayImage::from_raw(width, height, values.clone())
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(mismatch),
        PixelData::UInt16(values) => {
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, values.clone())
                .map(DynamicImage::ImageLuma16)
                .ok_or_else(mismatch)
        }
        PixelData::Float32(_) => Err(Error::UnsupportedType(PixelType::Float32)),
    }
}

/// Save with the container chosen by the file extension
///
/// # Errors
///
/// - [`Error::UnsupportedType`] for float images
/// - [`Error::UnsupportedDimension`] for images with more than two axes
/// - [`Error::Write`] if the encoder rejects the image or the extension
pub fn write_raster(image: &Image, path: &Path) -> Result<()> {
    let dynamic = to_dynamic(image, path)?;
    dynamic.save(path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Baseline JPEG at the given quality
///
/// # Errors
///
/// See [`write_raster`]; failures creating or writing the file are [`Error::Io`]
pub fn write_raster_jpeg(image: &Image, path: &Path, quality: JpegQuality) -> Result<()> {
    let dynamic = to_dynamic(image, path)?;
    let mut encoded = Vec::new();
    // The encoder treats quality 0 as invalid
    let encoder = JpegEncoder::new_with_quality(&mut encoded, quality.get().max(1));
    dynamic.write_with_encoder(encoder).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, &encoded).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
