//! Domain-specific value types for pipeline parameters

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Sample representation carried by an [`Image`](crate::image::Image)
///
/// `Float32` only exists as an intermediate representation; it is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    UInt8,
    UInt16,
    Float32,
}

impl PixelType {
    /// Largest representable sample value (`None` for floating point)
    #[inline]
    #[must_use]
    pub fn max_value(self) -> Option<f64> {
        match self {
            Self::UInt8 => Some(f64::from(u8::MAX)),
            Self::UInt16 => Some(f64::from(u16::MAX)),
            Self::Float32 => None,
        }
    }

    /// Bit depth implied by an unsigned integer pixel type
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] for floating point images
    pub fn bit_depth(self) -> Result<BitDepth> {
        match self {
            Self::UInt8 => Ok(BitDepth::Eight),
            Self::UInt16 => Ok(BitDepth::Sixteen),
            Self::Float32 => Err(Error::UnsupportedType(self)),
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt8 => write!(f, "8-bit unsigned integer"),
            Self::UInt16 => write!(f, "16-bit unsigned integer"),
            Self::Float32 => write!(f, "32-bit float"),
        }
    }
}

/// Output bit depth of the intensity normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    #[default]
    Eight,
    Sixteen,
}

impl BitDepth {
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for anything other than 8 or 16
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            other => Err(Error::Configuration(format!(
                "unsupported bit depth {other} (expected 8 or 16)"
            ))),
        }
    }

    #[inline]
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::Eight => 8,
            Self::Sixteen => 16,
        }
    }

    /// `2^bits - 1`
    #[inline]
    #[must_use]
    pub fn max_value(self) -> f64 {
        match self {
            Self::Eight => f64::from(u8::MAX),
            Self::Sixteen => f64::from(u16::MAX),
        }
    }

    #[inline]
    #[must_use]
    pub fn pixel_type(self) -> PixelType {
        match self {
            Self::Eight => PixelType::UInt8,
            Self::Sixteen => PixelType::UInt16,
        }
    }
}

impl FromStr for BitDepth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bits = s.trim().parse::<u32>().map_err(|_| {
            Error::Configuration(format!("invalid bit depth \"{s}\" (expected 8 or 16)"))
        })?;
        Self::from_bits(bits)
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{bits}-bit", bits = self.bits())
    }
}

/// JPEG compression quality in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JpegQuality(u8);

impl JpegQuality {
    pub const DEFAULT: Self = Self(95);

    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `value` exceeds 100
    pub fn new(value: u32) -> Result<Self> {
        u8::try_from(value)
            .ok()
            .filter(|&q| q <= 100)
            .map(Self)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "quality must be an integer between 0 and 100 but got {value}"
                ))
            })
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for JpegQuality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for JpegQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lower and upper percentiles for statistical clipping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentiles {
    pub lower: f64,
    pub upper: f64,
}

impl Percentiles {
    /// `(0, 100)`: no clipping
    pub const FULL: Self = Self {
        lower: 0.0,
        upper: 100.0,
    };

    /// # Errors
    ///
    /// Returns [`Error::Configuration`] unless `0 <= lower <= upper <= 100`
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(lower) || !in_range(upper) || lower > upper {
            return Err(Error::Configuration(format!(
                "percentiles must satisfy 0 <= lower <= upper <= 100, got ({lower}, {upper})"
            )));
        }
        Ok(Self { lower, upper })
    }

    #[inline]
    #[must_use]
    pub fn is_full_range(&self) -> bool {
        self.lower == 0.0 && self.upper == 100.0
    }
}

impl Default for Percentiles {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for Percentiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({lower}, {upper})", lower = self.lower, upper = self.upper)
    }
}

/// Absolute intensity bounds for value clipping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub lower: f64,
    pub upper: f64,
}

impl ValueRange {
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for non-finite bounds or `lower > upper`
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() || lower > upper {
            return Err(Error::Configuration(format!(
                "value bounds must be finite with lower <= upper, got ({lower}, {upper})"
            )));
        }
        Ok(Self { lower, upper })
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{lower}, {upper}]", lower = self.lower, upper = self.upper)
    }
}

/// Interpolation kernel used when resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolator {
    NearestNeighbor,
    Linear,
    /// Cubic B-spline with exact coefficient prefiltering
    #[default]
    BSpline,
}

impl fmt::Display for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NearestNeighbor => write!(f, "nearest"),
            Self::Linear => write!(f, "linear"),
            Self::BSpline => write!(f, "bspline"),
        }
    }
}
