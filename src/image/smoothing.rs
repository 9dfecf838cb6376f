//! Discrete Gaussian smoothing
//!
//! The kernel is the sampled discrete analogue of the Gaussian,
//! `T(n, t) = e^-t I_n(t)` where `I_n` is the modified Bessel function of the
//! first kind and `t` the variance in sample units. The Bessel helpers return
//! the exponentially scaled `e^-|x| I_n(x)` so large variances do not overflow.

use super::{strides, Image, PixelData};

/// Coefficient mass at which the kernel stops growing
const MAXIMUM_ERROR: f64 = 0.01;
/// Upper bound on the number of one-sided coefficients
const MAXIMUM_KERNEL_WIDTH: usize = 32;

/// Blur every axis with the same variance, ignoring physical spacing
///
/// The result is always a float image; a non-positive variance only converts.
#[must_use]
pub fn discrete_gaussian(image: &Image, variance: f64) -> Image {
    let mut values = image.data().to_f32_vec();
    if variance > 0.0 {
        let kernel = gaussian_kernel(variance);
        let components = image.num_components();
        let shape = image.shape();
        let strides = strides(shape);
        for (axis, &extent) in shape.iter().enumerate() {
            if extent > 1 {
                convolve_axis(&mut values, shape, strides[axis], extent, components, &kernel);
            }
        }
    }
    image.with_data(PixelData::Float32(values))
}

/// One-sided normalised kernel: `kernel[0]` is the centre tap
#[must_use]
pub(crate) fn gaussian_kernel(variance: f64) -> Vec<f64> {
    let cap = 1.0 - MAXIMUM_ERROR;

    let mut coefficients = vec![bessel_i0(variance), bessel_i1(variance)];
    let mut sum = coefficients[0] + 2.0 * coefficients[1];
    let mut order = 2;
    while sum < cap {
        let c = bessel_in(order, variance);
        coefficients.push(c);
        sum += 2.0 * c;
        if c < sum * f64::EPSILON || coefficients.len() > MAXIMUM_KERNEL_WIDTH {
            break;
        }
        order += 1;
    }

    let total = 2.0 * coefficients.iter().sum::<f64>() - coefficients[0];
    coefficients.iter().map(|c| c / total).collect()
}

fn convolve_axis(
    values: &mut [f32],
    shape: &[usize],
    stride: usize,
    extent: usize,
    components: usize,
    kernel: &[f64],
) {
    let lines = shape.iter().product::<usize>() / extent;
    let radius = kernel.len() - 1;
    let mut line = vec![0.0_f64; extent];

    for line_index in 0..lines {
        // Decompose the line index into (below-axis offset, above-axis block)
        let start = (line_index / stride) * stride * extent + line_index % stride;
        for component in 0..components {
            for (i, slot) in line.iter_mut().enumerate() {
                *slot = f64::from(values[(start + i * stride) * components + component]);
            }
            for i in 0..extent {
                let mut acc = kernel[0] * line[i];
                for (k, &weight) in kernel.iter().enumerate().skip(1).take(radius) {
                    // Edge samples are replicated outside the buffer
                    let left = line[i.saturating_sub(k)];
                    let right = line[(i + k).min(extent - 1)];
                    acc += weight * (left + right);
                }
                values[(start + i * stride) * components + component] = acc as f32;
            }
        }
    }
}

fn bessel_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let y = (x / 3.75).powi(2);
        (-ax).exp()
            * (1.0
                + y * (3.515_622_9
                    + y * (3.089_942_4
                        + y * (1.206_749_2
                            + y * (0.265_973_2 + y * (0.036_076_8 + y * 0.004_581_3))))))
    } else {
        let y = 3.75 / ax;
        (1.0 / ax.sqrt())
            * (0.398_942_28
                + y * (0.013_285_92
                    + y * (0.002_253_19
                        + y * (-0.001_575_65
                            + y * (0.009_162_81
                                + y * (-0.020_577_06
                                    + y * (0.026_355_37
                                        + y * (-0.016_476_33 + y * 0.003_923_77))))))))
    }
}

fn bessel_i1(x: f64) -> f64 {
    let ax = x.abs();
    let ans = if ax < 3.75 {
        let y = (x / 3.75).powi(2);
        (-ax).exp()
            * ax
            * (0.5
            + y * (0.878_905_94
                + y * (0.514_988_69
                    + y * (0.150_849_34 + y * (0.026_587_33 + y * (0.003_015_32 + y * 0.000_324_11))))))
    } else {
        let y = 3.75 / ax;
        let tail = 0.022_829_67 + y * (-0.028_953_12 + y * (0.017_876_54 - y * 0.004_200_59));
        let ans = 0.398_942_28
            + y * (-0.039_880_24
                + y * (-0.003_620_18 + y * (0.001_638_01 + y * (-0.010_315_55 + y * tail))));
        ans / ax.sqrt()
    };
    if x < 0.0 { -ans } else { ans }
}

/// Scaled `I_n(x)` for `n >= 2` by downward recurrence normalised with `I_0`
fn bessel_in(n: usize, x: f64) -> f64 {
    const ACCURACY: f64 = 40.0;
    const BIG: f64 = 1.0e10;
    const BIG_INV: f64 = 1.0e-10;

    if x == 0.0 {
        return 0.0;
    }
    let tox = 2.0 / x.abs();
    let mut bip = 0.0;
    let mut bi = 1.0;
    let mut ans = 0.0;
    let start = 2 * (n + (ACCURACY * n as f64).sqrt() as usize);
    for j in (1..=start).rev() {
        let bim = bip + j as f64 * tox * bi;
        bip = bi;
        bi = bim;
        if bi.abs() > BIG {
            ans *= BIG_INV;
            bi *= BIG_INV;
            bip *= BIG_INV;
        }
        if j == n {
            ans = bip;
        }
    }
    ans *= bessel_i0(x) / bi;
    if x < 0.0 && n % 2 == 1 { -ans } else { ans }
}
