//! Aspect-preserving resampling with anti-alias pre-smoothing

use super::bspline;
use super::smoothing::discrete_gaussian;
use super::{strides, Image, PixelData};
use crate::error::{Error, Result};
use crate::types::Interpolator;
use std::f64::consts::LN_2;
use tracing::debug;

/// Gaussian variance (in samples) that suppresses aliasing when decimating by `factor`
///
/// `(factor^2 - 1) / (2 * sqrt(2 * ln 2))^2`, i.e. the FWHM of the kernel grows with
/// the decimation factor. Only meaningful for `factor > 1`.
#[inline]
#[must_use]
pub fn smoothing_variance(factor: f64) -> f64 {
    let fwhm_per_sigma = 2.0 * (2.0 * LN_2).sqrt();
    (factor * factor - 1.0) / (fwhm_per_sigma * fwhm_per_sigma)
}

/// Resize so that the longest axis has `target_size` samples
///
/// Spacing grows by the scale factor while origin and direction are kept.
/// Resampled intensities are clamped to the input range and cast back to the
/// input pixel type.
///
/// # Errors
///
/// - [`Error::NotSupported`] when `keep_aspect_ratio` is false
/// - [`Error::Configuration`] when `target_size` is zero
pub fn resize(
    image: &Image,
    target_size: u32,
    interpolator: Interpolator,
    smooth: bool,
    keep_aspect_ratio: bool,
) -> Result<Image> {
    if !keep_aspect_ratio {
        return Err(Error::NotSupported(
            "non-uniform scaling is not supported".to_string(),
        ));
    }

    let max_extent = image.shape().iter().copied().max().unwrap_or(0);
    let scale = max_extent as f64 / f64::from(target_size);
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::Configuration(format!(
            "cannot resize {shape:?} to {target_size}: scale factor {scale} is not finite",
            shape = image.shape()
        )));
    }

    let input_type = image.pixel_type();
    let Some((input_min, input_max)) = image.min_max() else {
        return Err(Error::Configuration("cannot resize an empty image".to_string()));
    };

    let working = if smooth && scale > 1.0 {
        let variance = smoothing_variance(scale);
        debug!(scale, variance, "Smoothing before downsampling");
        discrete_gaussian(image, variance)
    } else {
        image.to_float32()
    };

    let new_shape: Vec<usize> = image
        .shape()
        .iter()
        .map(|&extent| ((extent as f64 / scale).round() as usize).max(1))
        .collect();
    let new_spacing: Vec<f64> = image.spacing().iter().map(|s| s * scale).collect();
    debug!(from = ?image.shape(), to = ?new_shape, %interpolator, "Resampling");

    let resampled = resample(&working, &new_shape, scale, interpolator);
    let clamped = resampled
        .into_iter()
        .map(|v| v.clamp(input_min, input_max) as f32)
        .collect();

    Ok(Image::with_parts(
        PixelData::from_f32(clamped, input_type),
        new_shape,
        image.num_components(),
        new_spacing,
        image.origin().to_vec(),
        image.direction().to_vec(),
    ))
}

/// Sample `image` on a grid of `new_shape` where output index `j` maps to input index `j * scale`
fn resample(image: &Image, new_shape: &[usize], scale: f64, interpolator: Interpolator) -> Vec<f64> {
    let shape = image.shape();
    let components = image.num_components();
    let input_strides = strides(shape);
    let samples = image.data().to_f32_vec();

    let planes: Vec<Vec<f64>> = (0..components)
        .map(|c| {
            let mut plane: Vec<f64> = samples
                .iter()
                .skip(c)
                .step_by(components)
                .map(|&v| f64::from(v))
                .collect();
            if interpolator == Interpolator::BSpline {
                bspline::prefilter(&mut plane, shape);
            }
            plane
        })
        .collect();

    let total: usize = new_shape.iter().product();
    let mut output = Vec::with_capacity(total * components);
    let mut index = vec![0usize; new_shape.len()];
    let mut taps: Vec<Vec<(usize, f64)>> = vec![Vec::with_capacity(4); shape.len()];

    for _ in 0..total {
        let inside = index.iter().zip(shape).zip(taps.iter_mut()).all(|((&j, &extent), axis_taps)| {
            let x = j as f64 * scale;
            // Samples outside the input buffer take the default value
            if x < -0.5 || x >= extent as f64 - 0.5 {
                return false;
            }
            axis_taps.clear();
            axis_taps.extend(axis_taps_for(x, extent, interpolator));
            true
        });

        for plane in &planes {
            output.push(if inside {
                weighted_sum(plane, &input_strides, &taps)
            } else {
                0.0
            });
        }

        for (axis, j) in index.iter_mut().enumerate() {
            *j += 1;
            if *j < new_shape[axis] {
                break;
            }
            *j = 0;
        }
    }
    output
}

fn axis_taps_for(x: f64, extent: usize, interpolator: Interpolator) -> Vec<(usize, f64)> {
    let last = extent as isize - 1;
    let clamp = |i: isize| i.clamp(0, last) as usize;
    match interpolator {
        Interpolator::NearestNeighbor => vec![(clamp((x + 0.5).floor() as isize), 1.0)],
        Interpolator::Linear => {
            let base = x.floor();
            let t = x - base;
            let base = base as isize;
            vec![(clamp(base), 1.0 - t), (clamp(base + 1), t)]
        }
        Interpolator::BSpline => {
            let (first, weights) = bspline::weights(x);
            weights
                .iter()
                .enumerate()
                .map(|(k, &w)| (bspline::mirror(first + k as isize, extent), w))
                .collect()
        }
    }
}

/// Separable weighted sum over the outer product of per-axis taps
fn weighted_sum(values: &[f64], strides: &[usize], taps: &[Vec<(usize, f64)>]) -> f64 {
    let mut counters = vec![0usize; taps.len()];
    let mut total = 0.0;
    loop {
        let (offset, weight) = counters.iter().enumerate().fold(
            (0usize, 1.0_f64),
            |(offset, weight), (axis, &k)| {
                let (i, w) = taps[axis][k];
                (offset + i * strides[axis], weight * w)
            },
        );
        total += weight * values[offset];

        let mut axis = 0;
        loop {
            if axis == counters.len() {
                return total;
            }
            counters[axis] += 1;
            if counters[axis] < taps[axis].len() {
                break;
            }
            counters[axis] = 0;
            axis += 1;
        }
    }
}
