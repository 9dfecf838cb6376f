//! Container format selection by file suffix

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

pub const JPEG_SUFFIXES: &[&str] = &[".jpg", ".jpeg"];
pub const JPEG_2000_SUFFIXES: &[&str] = &[".jp2"];
pub const TIFF_SUFFIXES: &[&str] = &[".tif", ".tiff"];
pub const PNG_SUFFIXES: &[&str] = &[".png"];
pub const DICOM_SUFFIXES: &[&str] = &[".dcm"];

/// Writer family chosen for an output path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Jpeg2000,
    Tiff,
    Png,
    /// Anything else goes through the generic writer
    Other,
}

impl ImageFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let Some(suffix) = suffix(path) else {
            return Self::Other;
        };
        match suffix.as_str() {
            ".jpg" | ".jpeg" => Self::Jpeg,
            ".jp2" => Self::Jpeg2000,
            ".tif" | ".tiff" => Self::Tiff,
            ".png" => Self::Png,
            _ => Self::Other,
        }
    }

    /// Suffixes accepted by the format-specific writer
    #[must_use]
    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => JPEG_SUFFIXES,
            Self::Jpeg2000 => JPEG_2000_SUFFIXES,
            Self::Tiff => TIFF_SUFFIXES,
            Self::Png => PNG_SUFFIXES,
            Self::Other => &[],
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "JPEG"),
            Self::Jpeg2000 => write!(f, "JPEG 2000"),
            Self::Tiff => write!(f, "TIFF"),
            Self::Png => write!(f, "PNG"),
            Self::Other => write!(f, "generic"),
        }
    }
}

/// Lower-cased suffix including the leading dot
#[must_use]
pub fn suffix(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}

#[inline]
#[must_use]
pub fn has_suffix(path: &Path, suffixes: &[&str]) -> bool {
    suffix(path).is_some_and(|s| suffixes.contains(&s.as_str()))
}

/// # Errors
///
/// Returns [`Error::PathValidation`] naming the path and the accepted suffixes
pub fn check_suffix(path: &Path, suffixes: &'static [&'static str]) -> Result<()> {
    if has_suffix(path, suffixes) {
        Ok(())
    } else {
        Err(Error::PathValidation {
            path: path.to_path_buf(),
            expected: suffixes,
        })
    }
}
