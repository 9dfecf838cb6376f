//! Cubic B-spline interpolation support
//!
//! Coefficients are obtained with the recursive causal/anti-causal filter pair
//! under mirror boundary conditions, after which an image is reconstructed
//! exactly at integer positions.

/// Single pole of the cubic B-spline prefilter, `sqrt(3) - 2`
const POLE: f64 = -0.267_949_192_431_122_7;
const TOLERANCE: f64 = 1e-10;

/// Replace `values` (one component, shape `shape`) by interpolation coefficients
pub(crate) fn prefilter(values: &mut [f64], shape: &[usize]) {
    let strides = super::strides(shape);
    let total: usize = shape.iter().product();
    for (axis, &extent) in shape.iter().enumerate() {
        if extent < 2 {
            continue;
        }
        let stride = strides[axis];
        let mut line = vec![0.0_f64; extent];
        for line_index in 0..total / extent {
            let start = (line_index / stride) * stride * extent + line_index % stride;
            for (i, slot) in line.iter_mut().enumerate() {
                *slot = values[start + i * stride];
            }
            filter_line(&mut line);
            for (i, &c) in line.iter().enumerate() {
                values[start + i * stride] = c;
            }
        }
    }
}

fn filter_line(c: &mut [f64]) {
    let n = c.len();
    let gain = (1.0 - POLE) * (1.0 - 1.0 / POLE);
    for v in c.iter_mut() {
        *v *= gain;
    }

    c[0] = initial_causal(c);
    for i in 1..n {
        c[i] += POLE * c[i - 1];
    }
    c[n - 1] = (POLE / (POLE * POLE - 1.0)) * (POLE * c[n - 2] + c[n - 1]);
    for i in (0..n - 1).rev() {
        c[i] = POLE * (c[i + 1] - c[i]);
    }
}

fn initial_causal(c: &[f64]) -> f64 {
    let n = c.len();
    let horizon = (TOLERANCE.ln() / POLE.abs().ln()).ceil() as usize;

    if horizon < n {
        let mut zn = POLE;
        let mut sum = c[0];
        for &v in &c[1..horizon] {
            sum += zn * v;
            zn *= POLE;
        }
        sum
    } else {
        let iz = 1.0 / POLE;
        let mut zn = POLE;
        let mut z2n = POLE.powi((n - 1) as i32);
        let mut sum = c[0] + z2n * c[n - 1];
        z2n *= z2n * iz;
        for &v in &c[1..n - 1] {
            sum += (zn + z2n) * v;
            zn *= POLE;
            z2n *= iz;
        }
        sum / (1.0 - zn * zn)
    }
}

/// First tap index and the four cubic weights for continuous position `x`
#[inline]
pub(crate) fn weights(x: f64) -> (isize, [f64; 4]) {
    let base = x.floor();
    let t = x - base;
    let t2 = t * t;
    let t3 = t2 * t;
    let one_minus = 1.0 - t;
    (
        base as isize - 1,
        [
            one_minus * one_minus * one_minus / 6.0,
            (4.0 - 6.0 * t2 + 3.0 * t3) / 6.0,
            (1.0 + 3.0 * t + 3.0 * t2 - 3.0 * t3) / 6.0,
            t3 / 6.0,
        ],
    )
}

/// Reflect an index into `[0, extent)` about the first and last samples
#[inline]
pub(crate) fn mirror(index: isize, extent: usize) -> usize {
    if extent == 1 {
        return 0;
    }
    let period = 2 * (extent as isize - 1);
    let mut i = index.rem_euclid(period);
    if i >= extent as isize {
        i = period - i;
    }
    i as usize
}
