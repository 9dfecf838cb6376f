//! Image reading and suffix-dispatched writing
//!
//! Container encoding and decoding is delegated to the `image` and `dicom`
//! crates; this module only decides which writer to call and checks its
//! preconditions.

mod dicom;
mod format;
mod raster;

pub use self::dicom::{has_dicom_preamble, read_dicom};
pub use format::{
    DICOM_SUFFIXES, ImageFormat, JPEG_2000_SUFFIXES, JPEG_SUFFIXES, PNG_SUFFIXES, TIFF_SUFFIXES,
    check_suffix, has_suffix, suffix,
};

use crate::error::{Error, Result};
use crate::image::{Image, reduce_channels, squeeze_singletons};
use crate::types::{JpegQuality, PixelType};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Load an image, optionally collapsing identical channels and one singleton axis
///
/// # Errors
///
/// - [`Error::Io`], [`Error::Read`] or [`Error::Dicom`] if the file cannot be loaded
/// - [`Error::DataIntegrity`] if `grayscale` is set and the channels differ
pub fn read(path: &Path, squeeze: bool, grayscale: bool) -> Result<Image> {
    let mut image = if is_dicom(path)? {
        read_dicom(path)?
    } else {
        raster::read_raster(path)?
    };
    if grayscale {
        image = reduce_channels(&image)?;
    }
    if squeeze {
        image = squeeze_singletons(&image);
    }
    Ok(image)
}

fn is_dicom(path: &Path) -> Result<bool> {
    if has_suffix(path, DICOM_SUFFIXES) {
        return Ok(true);
    }
    let mut file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut preamble = [0u8; 132];
    // Short files simply are not DICOM
    Ok(file.read_exact(&mut preamble).is_ok() && has_dicom_preamble(&preamble))
}

/// Write `image` with the writer selected by the path's suffix
///
/// JPEG suffixes use the quality-aware writer; every other suffix goes through
/// the generic writer.
///
/// # Errors
///
/// See [`write_jpeg`] and [`write_image`]
pub fn write(image: &Image, path: &Path, quality: JpegQuality) -> Result<()> {
    let format = ImageFormat::from_path(path);
    debug!(path = %path.display(), %format, "Writing");
    match format {
        ImageFormat::Jpeg => write_jpeg(image, path, quality),
        _ => write_image(image, path),
    }
}

/// JPEG writer
///
/// # Errors
///
/// - [`Error::TypeMismatch`] unless the image is 8-bit unsigned
/// - [`Error::PathValidation`] unless the suffix is `.jpg` or `.jpeg`
pub fn write_jpeg(image: &Image, path: &Path, quality: JpegQuality) -> Result<()> {
    if image.pixel_type() != PixelType::UInt8 {
        return Err(Error::TypeMismatch {
            path: path.to_path_buf(),
            expected: PixelType::UInt8,
            found: image.pixel_type(),
        });
    }
    check_suffix(path, JPEG_SUFFIXES)?;
    raster::write_raster_jpeg(image, path, quality)
}

/// JPEG 2000 writer
///
/// # Errors
///
/// [`Error::PathValidation`] unless the suffix is `.jp2`; the generic writer
/// reports an encoder error since no JPEG 2000 encoder is linked
pub fn write_jpeg2000(image: &Image, path: &Path) -> Result<()> {
    check_suffix(path, JPEG_2000_SUFFIXES)?;
    write_image(image, path)
}

/// TIFF writer
///
/// # Errors
///
/// [`Error::PathValidation`] unless the suffix is `.tif` or `.tiff`
pub fn write_tiff(image: &Image, path: &Path) -> Result<()> {
    check_suffix(path, TIFF_SUFFIXES)?;
    write_image(image, path)
}

/// PNG writer
///
/// # Errors
///
/// [`Error::PathValidation`] unless the suffix is `.png`
pub fn write_png(image: &Image, path: &Path) -> Result<()> {
    check_suffix(path, PNG_SUFFIXES)?;
    write_image(image, path)
}

/// Generic writer; the container follows the extension
///
/// # Errors
///
/// [`Error::UnsupportedType`], [`Error::UnsupportedDimension`] or
/// [`Error::Write`] when the image cannot be stored in that container
pub fn write_image(image: &Image, path: &Path) -> Result<()> {
    raster::write_raster(image, path)
}
