//! Per-image processing: read, optional resize, normalise, write

use super::paths::PathPair;
use crate::codec::{self, JPEG_SUFFIXES, has_suffix};
use crate::error::{Error, Result};
use crate::image::{NormalizeOptions, normalize, resize};
use crate::types::{BitDepth, Interpolator, JpegQuality, Percentiles, ValueRange};
use std::path::PathBuf;
use tracing::debug;

/// Settings shared by every pair of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Target extent of the longest axis; no resize when `None`
    pub size: Option<u32>,
    pub bit_depth: BitDepth,
    pub jpeg_quality: JpegQuality,
    pub percentiles: Percentiles,
    pub values: Option<ValueRange>,
    pub histeq: bool,
    /// MIMIC-CXR-JPG preset: every other option is ignored
    pub preset: bool,
    pub interpolator: Interpolator,
    /// Gaussian anti-aliasing before downsampling
    pub smooth: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            size: None,
            bit_depth: BitDepth::Eight,
            jpeg_quality: JpegQuality::DEFAULT,
            percentiles: Percentiles::FULL,
            values: None,
            histeq: false,
            preset: false,
            interpolator: Interpolator::BSpline,
            smooth: true,
        }
    }
}

impl PipelineConfig {
    /// Settings forced by the MIMIC-CXR-JPG preset
    #[must_use]
    pub fn preset() -> Self {
        Self {
            bit_depth: BitDepth::Eight,
            jpeg_quality: JpegQuality::DEFAULT,
            histeq: true,
            preset: true,
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a zero target size or clip bounds that
    /// bypassed their validating constructors
    pub fn validate(&self) -> Result<()> {
        if self.size == Some(0) {
            return Err(Error::Configuration("size must be positive".to_string()));
        }
        Percentiles::new(self.percentiles.lower, self.percentiles.upper)?;
        if let Some(values) = self.values {
            ValueRange::new(values.lower, values.upper)?;
        }
        Ok(())
    }

    fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            bit_depth: Some(self.bit_depth),
            percentiles: self.percentiles,
            values: self.values,
            histeq: self.histeq,
        }
    }
}

/// Process one pair and return the path actually written
///
/// In preset mode the output suffix becomes `.jpg` unless it already is a
/// JPEG suffix.
///
/// # Errors
///
/// Any read, transform or write error of this pair
pub fn process_pair(pair: &PathPair, config: &PipelineConfig) -> Result<PathBuf> {
    let image = codec::read(&pair.input, true, true)?;

    if config.preset {
        let preset = PipelineConfig::preset();
        let image = normalize(&image, &preset.normalize_options())?;
        let mut output = pair.output.clone();
        if !has_suffix(&output, JPEG_SUFFIXES) {
            output.set_extension("jpg");
        }
        debug!(output = %output.display(), "Preset output");
        codec::write_jpeg(&image, &output, preset.jpeg_quality)?;
        return Ok(output);
    }

    let image = match config.size {
        Some(size) => resize(&image, size, config.interpolator, config.smooth, true)?,
        None => image,
    };
    let image = normalize(&image, &config.normalize_options())?;
    codec::write(&image, &pair.output, config.jpeg_quality)?;
    Ok(pair.output.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelType;
    use assert_matches::assert_matches;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_input(path: &Path, width: u32, height: u32) {
        let image = ::image::ImageBuffer::from_fn(width, height, |x, y| {
            ::image::Luma([((x * 7 + y * 13) % 4096) as u16 * 16])
        });
        image.save(path).unwrap();
    }

    fn pair(dir: &TempDir, input: &str, output: &str) -> PathPair {
        PathPair {
            input: dir.path().join(input),
            output: dir.path().join(output),
        }
    }

    #[test]
    fn test_preset_forces_jpeg_suffix_and_eight_bit() {
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir, "scan.png", "scan.tiff");
        write_input(&pair.input, 40, 30);

        let config = PipelineConfig {
            preset: true,
            bit_depth: BitDepth::Sixteen,
            size: Some(10),
            ..PipelineConfig::default()
        };
        let written = process_pair(&pair, &config).unwrap();
        assert_eq!(written, dir.path().join("scan.jpg"));

        let out = codec::read(&written, true, true).unwrap();
        assert_eq!(out.pixel_type(), PixelType::UInt8);
        // Size is ignored by the preset
        assert_eq!(out.shape(), &[40, 30]);
    }

    fn mean_abs_diff(a: &crate::image::Image, b: &crate::image::Image) -> f32 {
        let (a, b) = (a.data().to_f32_vec(), b.data().to_f32_vec());
        assert_eq!(a.len(), b.len());
        a.iter().zip(&b).map(|(x, y)| (x - y).abs()).sum::<f32>() / a.len() as f32
    }

    #[test]
    fn test_preset_equalizes_regardless_of_other_options() {
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir, "scan.png", "scan.jpg");
        write_input(&pair.input, 48, 48);

        let config = PipelineConfig {
            preset: true,
            percentiles: Percentiles::new(40.0, 60.0).unwrap(),
            values: Some(ValueRange::new(0.0, 100.0).unwrap()),
            histeq: false,
            jpeg_quality: JpegQuality::new(10).unwrap(),
            ..PipelineConfig::default()
        };
        let written = process_pair(&pair, &config).unwrap();
        let out = codec::read(&written, true, true).unwrap();
        assert_eq!(out.pixel_type(), PixelType::UInt8);

        let input = codec::read(&pair.input, true, true).unwrap();
        let equalized = normalize(&input, &NormalizeOptions::equalized(BitDepth::Eight)).unwrap();
        let diff = mean_abs_diff(&out, &equalized);
        assert!(diff < 2.0, "mean difference {diff} from the equalized image");

        // The ignored clip would have saturated most of the ramp
        let clipped = normalize(&input, &config.normalize_options()).unwrap();
        assert!(mean_abs_diff(&out, &clipped) > 20.0);
    }

    #[test]
    fn test_preset_keeps_existing_jpeg_suffix() {
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir, "scan.png", "scan.jpeg");
        write_input(&pair.input, 8, 8);
        let written = process_pair(&pair, &PipelineConfig::preset()).unwrap();
        assert_eq!(written, pair.output);
    }

    #[test]
    fn test_resize_then_sixteen_bit_png() {
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir, "scan.png", "small.png");
        write_input(&pair.input, 64, 32);

        let config = PipelineConfig {
            size: Some(16),
            bit_depth: BitDepth::Sixteen,
            ..PipelineConfig::default()
        };
        process_pair(&pair, &config).unwrap();
        let out = codec::read(&pair.output, true, true).unwrap();
        assert_eq!(out.shape(), &[16, 8]);
        assert_eq!(out.pixel_type(), PixelType::UInt16);
        let (lo, hi) = out.min_max().unwrap();
        assert_eq!((lo, hi), (0.0, 65_535.0));
    }

    #[test]
    fn test_sixteen_bit_jpeg_is_type_mismatch() {
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir, "scan.png", "out.jpg");
        write_input(&pair.input, 8, 8);
        let config = PipelineConfig {
            bit_depth: BitDepth::Sixteen,
            ..PipelineConfig::default()
        };
        assert_matches!(process_pair(&pair, &config), Err(Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
        assert!(PipelineConfig::preset().validate().is_ok());
        let zero = PipelineConfig {
            size: Some(0),
            ..PipelineConfig::default()
        };
        assert_matches!(zero.validate(), Err(Error::Configuration(_)));
    }

    #[test]
    fn test_unreadable_input_is_reported() {
        let dir = TempDir::new().unwrap();
        let pair = pair(&dir, "garbage.png", "out.png");
        std::fs::write(&pair.input, b"definitely not a png").unwrap();
        assert_matches!(
            process_pair(&pair, &PipelineConfig::default()),
            Err(Error::Read { .. })
        );
        // Nothing is written for a failed pair
        assert!(!pair.output.exists());
    }
}
