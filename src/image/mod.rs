//! In-memory image model and the pure transforms that operate on it
//!
//! Axis 0 is the fastest-varying axis (columns), axis 1 the rows, and any
//! further axes are slices or frames. Multi-component samples are stored
//! interleaved.

mod bspline;
mod channels;
mod histogram;
mod normalization;
mod resample;
mod smoothing;

pub use channels::{reduce_channels, squeeze_singletons};
pub use histogram::HistogramMatching;
pub use normalization::{normalize, percentile, NormalizeOptions};
pub use resample::{resize, smoothing_variance};
pub use smoothing::discrete_gaussian;

use crate::error::{Error, Result};
use crate::types::PixelType;

/// Sample buffer tagged with its pixel type
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    Float32(Vec<f32>),
}

impl PixelData {
    #[inline]
    #[must_use]
    pub fn pixel_type(&self) -> PixelType {
        match self {
            Self::UInt8(_) => PixelType::UInt8,
            Self::UInt16(_) => PixelType::UInt16,
            Self::Float32(_) => PixelType::Float32,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::UInt8(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::Float32(v) => v.len(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen every sample to `f32`
    #[must_use]
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            Self::UInt8(v) => v.iter().map(|&x| f32::from(x)).collect(),
            Self::UInt16(v) => v.iter().map(|&x| f32::from(x)).collect(),
            Self::Float32(v) => v.clone(),
        }
    }

    /// Narrow `f32` samples into `pixel_type`, truncating toward zero and saturating
    #[must_use]
    pub fn from_f32(values: Vec<f32>, pixel_type: PixelType) -> Self {
        match pixel_type {
            // Float-to-int `as` casts truncate, saturate and map NaN to 0
            PixelType::UInt8 => Self::UInt8(values.iter().map(|&v| v as u8).collect()),
            PixelType::UInt16 => Self::UInt16(values.iter().map(|&v| v as u16).collect()),
            PixelType::Float32 => Self::Float32(values),
        }
    }

    /// Minimum and maximum sample, `None` when empty
    #[must_use]
    pub fn min_max(&self) -> Option<(f64, f64)> {
        fn fold<T: Copy + Into<f64>>(values: &[T]) -> Option<(f64, f64)> {
            values.iter().fold(None, |acc, &v| {
                let v: f64 = v.into();
                Some(match acc {
                    None => (v, v),
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                })
            })
        }
        match self {
            Self::UInt8(v) => fold(v),
            Self::UInt16(v) => fold(v),
            Self::Float32(v) => fold(v),
        }
    }
}

/// N-dimensional raster with physical geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: PixelData,
    shape: Vec<usize>,
    num_components: usize,
    spacing: Vec<f64>,
    origin: Vec<f64>,
    /// Row-major `dimension x dimension` matrix
    direction: Vec<f64>,
}

impl Image {
    /// Create an image with unit spacing, zero origin and identity direction
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the shape is empty, has a zero extent,
    /// or does not match the buffer length
    pub fn new(data: PixelData, shape: Vec<usize>, num_components: usize) -> Result<Self> {
        if shape.is_empty() || shape.contains(&0) {
            return Err(Error::Configuration(format!(
                "image shape must have at least one axis and no zero extent, got {shape:?}"
            )));
        }
        if num_components == 0 {
            return Err(Error::Configuration(
                "image must have at least one component".to_string(),
            ));
        }
        let expected = shape.iter().product::<usize>() * num_components;
        if data.len() != expected {
            return Err(Error::Configuration(format!(
                "buffer of {len} samples does not match shape {shape:?} x {num_components} components",
                len = data.len()
            )));
        }

        let dimension = shape.len();
        Ok(Self {
            data,
            shape,
            num_components,
            spacing: vec![1.0; dimension],
            origin: vec![0.0; dimension],
            direction: identity(dimension),
        })
    }

    /// Single-component image from a sample vector
    ///
    /// # Errors
    ///
    /// See [`Image::new`]
    pub fn from_samples(data: PixelData, shape: &[usize]) -> Result<Self> {
        Self::new(data, shape.to_vec(), 1)
    }

    /// Replace the physical geometry
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if any vector does not match the dimension
    /// or a spacing is not strictly positive
    pub fn with_geometry(mut self, spacing: Vec<f64>, origin: Vec<f64>, direction: Vec<f64>) -> Result<Self> {
        let dimension = self.dimension();
        if spacing.len() != dimension
            || origin.len() != dimension
            || direction.len() != dimension * dimension
        {
            return Err(Error::Configuration(format!(
                "geometry does not match a {dimension}-D image"
            )));
        }
        if spacing.iter().any(|&s| !(s > 0.0 && s.is_finite())) {
            return Err(Error::Configuration(format!(
                "spacing must be positive and finite, got {spacing:?}"
            )));
        }
        self.spacing = spacing;
        self.origin = origin;
        self.direction = direction;
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &PixelData {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_data(self) -> PixelData {
        self.data
    }

    #[inline]
    #[must_use]
    pub fn pixel_type(&self) -> PixelType {
        self.data.pixel_type()
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    #[must_use]
    pub fn num_components(&self) -> usize {
        self.num_components
    }

    /// Number of sample positions (not counting components)
    #[inline]
    #[must_use]
    pub fn num_pixels(&self) -> usize {
        self.shape.iter().product()
    }

    #[inline]
    #[must_use]
    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    #[inline]
    #[must_use]
    pub fn origin(&self) -> &[f64] {
        &self.origin
    }

    #[inline]
    #[must_use]
    pub fn direction(&self) -> &[f64] {
        &self.direction
    }

    /// Linear-index stride of every axis
    #[must_use]
    pub fn strides(&self) -> Vec<usize> {
        strides(&self.shape)
    }

    #[must_use]
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.data.min_max()
    }

    /// Same geometry, different samples. The caller guarantees the length.
    pub(crate) fn with_data(&self, data: PixelData) -> Self {
        debug_assert_eq!(data.len(), self.num_pixels() * self.num_components);
        Self {
            data,
            shape: self.shape.clone(),
            num_components: self.num_components,
            spacing: self.spacing.clone(),
            origin: self.origin.clone(),
            direction: self.direction.clone(),
        }
    }

    pub(crate) fn with_parts(
        data: PixelData,
        shape: Vec<usize>,
        num_components: usize,
        spacing: Vec<f64>,
        origin: Vec<f64>,
        direction: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>() * num_components);
        Self {
            data,
            shape,
            num_components,
            spacing,
            origin,
            direction,
        }
    }

    /// Float copy of this image (no-op clone for float input)
    #[must_use]
    pub fn to_float32(&self) -> Self {
        match &self.data {
            PixelData::Float32(_) => self.clone(),
            data => self.with_data(PixelData::Float32(data.to_f32_vec())),
        }
    }

    /// Cast to `pixel_type`, truncating and saturating when narrowing
    #[must_use]
    pub fn cast(&self, pixel_type: PixelType) -> Self {
        if self.pixel_type() == pixel_type {
            return self.clone();
        }
        self.with_data(PixelData::from_f32(self.data.to_f32_vec(), pixel_type))
    }
}

#[must_use]
pub(crate) fn identity(dimension: usize) -> Vec<f64> {
    (0..dimension * dimension)
        .map(|i| if i / dimension == i % dimension { 1.0 } else { 0.0 })
        .collect()
}

#[must_use]
pub(crate) fn strides(shape: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .scan(1usize, |acc, &extent| {
            let stride = *acc;
            *acc *= extent;
            Some(stride)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_new_validates_buffer_length() {
        let ok = Image::new(PixelData::UInt8(vec![0; 12]), vec![3, 4], 1);
        assert!(ok.is_ok());

        let rgb = Image::new(PixelData::UInt8(vec![0; 36]), vec![3, 4], 3).unwrap();
        assert_eq!(rgb.num_components(), 3);
        assert_eq!(rgb.num_pixels(), 12);

        assert_matches!(
            Image::new(PixelData::UInt8(vec![0; 11]), vec![3, 4], 1),
            Err(Error::Configuration(_))
        );
        assert_matches!(
            Image::new(PixelData::UInt8(vec![]), vec![0, 4], 1),
            Err(Error::Configuration(_))
        );
    }

    #[test]
    fn test_default_geometry() {
        let image = Image::from_samples(PixelData::UInt16(vec![0; 6]), &[2, 3]).unwrap();
        assert_eq!(image.spacing(), &[1.0, 1.0]);
        assert_eq!(image.origin(), &[0.0, 0.0]);
        assert_eq!(image.direction(), &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(image.strides(), vec![1, 2]);
    }

    #[test]
    fn test_with_geometry_rejects_bad_spacing() {
        let image = Image::from_samples(PixelData::UInt8(vec![0; 4]), &[2, 2]).unwrap();
        assert_matches!(
            image.clone().with_geometry(vec![0.0, 1.0], vec![0.0; 2], identity(2)),
            Err(Error::Configuration(_))
        );
        assert_matches!(
            image.with_geometry(vec![1.0], vec![0.0; 2], identity(2)),
            Err(Error::Configuration(_))
        );
    }

    #[test]
    fn test_cast_truncates_and_saturates() {
        let image = Image::from_samples(
            PixelData::Float32(vec![-3.0, 0.4, 0.6, 1.99, 254.5, 300.0, f32::NAN]),
            &[7],
        )
        .unwrap();
        let cast = image.cast(PixelType::UInt8);
        assert_eq!(cast.data(), &PixelData::UInt8(vec![0, 0, 0, 1, 254, 255, 0]));

        let wide = Image::from_samples(PixelData::Float32(vec![32_767.5, 70_000.0]), &[2])
            .unwrap()
            .cast(PixelType::UInt16);
        assert_eq!(wide.data(), &PixelData::UInt16(vec![32_767, 65_535]));
    }

    #[test]
    fn test_min_max() {
        let image = Image::from_samples(PixelData::UInt16(vec![7, 3, 900, 12]), &[2, 2]).unwrap();
        assert_eq!(image.min_max(), Some((3.0, 900.0)));
    }
}
