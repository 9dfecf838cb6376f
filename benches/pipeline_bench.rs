use criterion::{Criterion, criterion_group, criterion_main};
use medprep::image::{NormalizeOptions, discrete_gaussian, normalize, resize};
use medprep::{BitDepth, Image, Interpolator, Percentiles, PixelData};
use std::hint::black_box;

/// 16-bit radiograph-sized test pattern: smooth ramp plus a high-frequency grid
fn synthetic(width: usize, height: usize) -> Image {
    let data = (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            let ramp = (x + y) * 4;
            let grid = if (x / 3 + y / 3) % 2 == 0 { 800 } else { 0 };
            (ramp + grid).min(65_535) as u16
        })
        .collect();
    Image::from_samples(PixelData::UInt16(data), &[width, height]).unwrap()
}

// ============================================================================
// TIER 1: FULL PIPELINE BENCHMARKS (Primary Baseline)
// ============================================================================

/// Resize then normalise, as one pair is processed without file I/O
fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    let image = synthetic(1024, 768);
    let options = NormalizeOptions {
        bit_depth: Some(BitDepth::Eight),
        percentiles: Percentiles::new(0.5, 99.5).unwrap(),
        ..NormalizeOptions::default()
    };

    group.bench_function("resize_256_normalize_8bit", |b| {
        b.iter(|| {
            let resized = resize(black_box(&image), 256, Interpolator::BSpline, true, true).unwrap();
            normalize(black_box(&resized), &options).unwrap()
        });
    });

    group.finish();
}

// ============================================================================
// TIER 2: COMPONENT-LEVEL BENCHMARKS (Diagnostic)
// ============================================================================

fn bench_smoothing(c: &mut Criterion) {
    let mut group = c.benchmark_group("smoothing");
    let image = synthetic(512, 512);

    group.bench_function("discrete_gaussian_factor_4", |b| {
        b.iter(|| discrete_gaussian(black_box(&image), 2.7));
    });

    group.finish();
}

fn bench_resampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("resampling");
    let image = synthetic(512, 512);

    for interpolator in [Interpolator::NearestNeighbor, Interpolator::Linear, Interpolator::BSpline] {
        group.bench_function(format!("{interpolator}_to_128"), |b| {
            b.iter(|| resize(black_box(&image), 128, interpolator, false, true).unwrap());
        });
    }

    group.finish();
}

fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalization");
    let image = synthetic(512, 512);

    group.bench_function("percentile_clip_16bit", |b| {
        let options = NormalizeOptions {
            bit_depth: Some(BitDepth::Sixteen),
            percentiles: Percentiles::new(1.0, 99.0).unwrap(),
            ..NormalizeOptions::default()
        };
        b.iter(|| normalize(black_box(&image), &options).unwrap());
    });

    group.bench_function("histeq_8bit", |b| {
        let options = NormalizeOptions::equalized(BitDepth::Eight);
        b.iter(|| normalize(black_box(&image), &options).unwrap());
    });

    group.finish();
}

// ============================================================================
// BENCHMARK REGISTRATION
// ============================================================================

criterion_group!(
    benches,
    // Primary baseline
    bench_full_pipeline,
    // Diagnostic benchmarks
    bench_smoothing,
    bench_resampling,
    bench_normalization,
);

criterion_main!(benches);
