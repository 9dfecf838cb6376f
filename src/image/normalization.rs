//! Bit-depth aware intensity normalisation
//!
//! All arithmetic happens on floating point samples; the result is cast to the
//! unsigned pixel type of the requested bit depth.

use super::histogram::HistogramMatching;
use super::{Image, PixelData};
use crate::error::Result;
use crate::types::{BitDepth, Percentiles, ValueRange};
use tracing::debug;

/// How intensities are remapped into the output range
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizeOptions {
    /// Output bit depth; inferred from the input pixel type when `None`
    pub bit_depth: Option<BitDepth>,
    /// Statistical clip applied before rescaling
    pub percentiles: Percentiles,
    /// Absolute clip applied before the percentile clip
    pub values: Option<ValueRange>,
    /// Histogram equalisation instead of range stretching; ignores both clips
    pub histeq: bool,
}

impl NormalizeOptions {
    /// 8-bit histogram equalisation
    #[must_use]
    pub fn equalized(bit_depth: BitDepth) -> Self {
        Self {
            bit_depth: Some(bit_depth),
            histeq: true,
            ..Self::default()
        }
    }
}

/// Remap intensities into `[0, 2^bits - 1]`
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`](crate::Error::UnsupportedType) when no bit
/// depth is given and the input is not an 8- or 16-bit unsigned image
pub fn normalize(image: &Image, options: &NormalizeOptions) -> Result<Image> {
    let bit_depth = match options.bit_depth {
        Some(depth) => depth,
        None => image.pixel_type().bit_depth()?,
    };
    let mut values = image.data().to_f32_vec();

    let stretched = if options.histeq {
        // The reference spans [0, 2^bits - 2], one sample per level
        let levels = bit_depth.max_value() as u32;
        let reference: Vec<f32> = (0..levels).map(|v| v as f32).collect();
        debug!(%bit_depth, "Histogram equalisation");
        HistogramMatching::default().apply(&values, &reference)
    } else {
        if let Some(range) = options.values {
            clamp(&mut values, range.lower, range.upper);
        }
        if !options.percentiles.is_full_range() {
            let (lower, upper) = percentile_bounds(&values, &options.percentiles);
            debug!(lower, upper, percentiles = %options.percentiles, "Percentile clip");
            clamp(&mut values, lower, upper);
        }
        debug!(%bit_depth, "Rescaling intensity range");
        rescale(&values, 0.0, bit_depth.max_value())
    };

    Ok(image.with_data(PixelData::from_f32(stretched, bit_depth.pixel_type())))
}

/// Linearly interpolated percentile (`p` in `[0, 100]`) of `values`
#[must_use]
pub fn percentile(values: &[f32], p: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f32::total_cmp);
    percentile_of_sorted(&sorted, p)
}

fn percentile_of_sorted(sorted: &[f32], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (p / 100.0).clamp(0.0, 1.0) * last as f64;
    let below = rank.floor() as usize;
    let above = rank.ceil() as usize;
    let lo = f64::from(sorted[below]);
    let hi = f64::from(sorted[above]);
    Some(lo + (hi - lo) * (rank - below as f64))
}

fn percentile_bounds(values: &[f32], percentiles: &Percentiles) -> (f64, f64) {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f32::total_cmp);
    let lower = percentile_of_sorted(&sorted, percentiles.lower).unwrap_or(0.0);
    let upper = percentile_of_sorted(&sorted, percentiles.upper).unwrap_or(0.0);
    (lower, upper)
}

fn clamp(values: &mut [f32], lower: f64, upper: f64) {
    let (lower, upper) = (lower as f32, upper as f32);
    for v in values.iter_mut() {
        *v = v.clamp(lower, upper);
    }
}

/// Map `[min, max]` of `values` linearly onto `[out_min, out_max]`; constant input maps to 0
fn rescale(values: &[f32], out_min: f64, out_max: f64) -> Vec<f32> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(f64::from(v)), hi.max(f64::from(v)))
        });
    let scale = if max > min {
        (out_max - out_min) / (max - min)
    } else if max != 0.0 {
        (out_max - out_min) / max
    } else {
        0.0
    };
    let shift = out_min - min * scale;
    values
        .iter()
        .map(|&v| f64::from(v).mul_add(scale, shift) as f32)
        .collect()
}
