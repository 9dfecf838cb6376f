//! Histogram matching
//!
//! Source and reference intensities are summarised by a small quantile table
//! (intensity threshold, `match_points` interior quantiles, maximum); the source
//! is then remapped piecewise-linearly so that its table lands on the
//! reference table. Intensities below the threshold follow the lower segment,
//! intensities above the maximum the upper one.

/// Parameters of the quantile-table histogram matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramMatching {
    /// Number of bins used to estimate quantiles
    pub histogram_levels: usize,
    /// Number of interior quantiles matched between source and reference
    pub match_points: usize,
    /// Exclude intensities below the mean (background) from the histograms
    pub threshold_at_mean: bool,
}

impl Default for HistogramMatching {
    fn default() -> Self {
        Self {
            histogram_levels: 256,
            match_points: 1,
            threshold_at_mean: true,
        }
    }
}

impl HistogramMatching {
    /// Remap `source` so its intensity distribution follows `reference`
    #[must_use]
    pub fn apply(&self, source: &[f32], reference: &[f32]) -> Vec<f32> {
        let (Some(src), Some(refr)) = (Summary::of(source), Summary::of(reference)) else {
            return source.to_vec();
        };
        let levels = self.histogram_levels.max(1);

        let src_threshold = if self.threshold_at_mean { src.mean } else { src.min };
        let ref_threshold = if self.threshold_at_mean { refr.mean } else { refr.min };
        let src_hist = Histogram::build(source, src_threshold, src.max, levels);
        let ref_hist = Histogram::build(reference, ref_threshold, refr.max, levels);

        let points = self.match_points + 2;
        let mut src_table = vec![0.0; points];
        let mut ref_table = vec![0.0; points];
        src_table[0] = src_threshold;
        ref_table[0] = ref_threshold;
        src_table[points - 1] = src.max;
        ref_table[points - 1] = refr.max;
        let delta = 1.0 / (self.match_points as f64 + 1.0);
        for j in 1..points - 1 {
            src_table[j] = src_hist.quantile(j as f64 * delta);
            ref_table[j] = ref_hist.quantile(j as f64 * delta);
        }

        let slope = |dy: f64, dx: f64| if dx != 0.0 { dy / dx } else { 0.0 };
        let gradients: Vec<f64> = (0..points - 1)
            .map(|j| slope(ref_table[j + 1] - ref_table[j], src_table[j + 1] - src_table[j]))
            .collect();
        let lower_gradient = slope(ref_table[0] - refr.min, src_table[0] - src.min);
        let upper_gradient = slope(ref_table[points - 1] - refr.max, src_table[points - 1] - src.max);

        source
            .iter()
            .map(|&v| {
                let v = f64::from(v);
                let j = src_table.iter().position(|&q| v < q).unwrap_or(points);
                let mapped = if j == 0 {
                    refr.min + (v - src.min) * lower_gradient
                } else if j == points {
                    refr.max + (v - src.max) * upper_gradient
                } else {
                    ref_table[j - 1] + (v - src_table[j - 1]) * gradients[j - 1]
                };
                mapped as f32
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Summary {
    min: f64,
    max: f64,
    mean: f64,
}

impl Summary {
    fn of(values: &[f32]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0_f64),
            |(min, max, sum), &v| {
                let v = f64::from(v);
                (min.min(v), max.max(v), sum + v)
            },
        );
        Some(Self {
            min,
            max,
            mean: sum / values.len() as f64,
        })
    }
}

/// Equal-width histogram over `[lower, upper]`; values outside are ignored
struct Histogram {
    lower: f64,
    width: f64,
    counts: Vec<u64>,
    total: u64,
}

impl Histogram {
    fn build(values: &[f32], lower: f64, upper: f64, levels: usize) -> Self {
        let width = (upper - lower) / levels as f64;
        let mut counts = vec![0u64; levels];
        let mut total = 0;
        for &v in values {
            let v = f64::from(v);
            if v < lower || v > upper {
                continue;
            }
            let bin = if width > 0.0 {
                (((v - lower) / width) as usize).min(levels - 1)
            } else {
                0
            };
            counts[bin] += 1;
            total += 1;
        }
        Self {
            lower,
            width,
            counts,
            total,
        }
    }

    fn bin_min(&self, bin: usize) -> f64 {
        self.lower + bin as f64 * self.width
    }

    fn bin_max(&self, bin: usize) -> f64 {
        self.lower + (bin + 1) as f64 * self.width
    }

    /// Intensity below which a fraction `p` of the counts lie, interpolated within the bin
    fn quantile(&self, p: f64) -> f64 {
        let size = self.counts.len();
        if self.total == 0 {
            return self.lower;
        }
        let total = self.total as f64;

        if p < 0.5 {
            let mut n = 0;
            let mut cumulated = 0.0;
            let mut p_n = 0.0;
            let mut p_prev;
            let mut f_n;
            loop {
                f_n = self.counts[n] as f64;
                cumulated += f_n;
                p_prev = p_n;
                p_n = cumulated / total;
                n += 1;
                if n >= size || p_n >= p {
                    break;
                }
            }
            let proportion = f_n / total;
            let (min, max) = (self.bin_min(n - 1), self.bin_max(n - 1));
            if proportion == 0.0 {
                return min;
            }
            min + ((p - p_prev) / proportion) * (max - min)
        } else {
            let mut n = size as isize - 1;
            let mut m = 0;
            let mut cumulated = 0.0;
            let mut p_n = 1.0;
            let mut p_prev;
            let mut f_n;
            loop {
                f_n = self.counts[n as usize] as f64;
                cumulated += f_n;
                p_prev = p_n;
                p_n = 1.0 - cumulated / total;
                n -= 1;
                m += 1;
                if m >= size || p_n <= p {
                    break;
                }
            }
            let bin = (n + 1) as usize;
            let proportion = f_n / total;
            let (min, max) = (self.bin_min(bin), self.bin_max(bin));
            if proportion == 0.0 {
                return max;
            }
            max - ((p_prev - p) / proportion) * (max - min)
        }
    }
}
