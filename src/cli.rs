use crate::batch::{BatchSpec, ExecutionMode, PipelineConfig};
use crate::error::Result;
use crate::types::{BitDepth, Interpolator, JpegQuality, Percentiles, ValueRange};
use clap::{Parser, ValueEnum};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Normalise grayscale medical images for viewing or model training
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Input image, directory of images, or `.txt` file with one path per line
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output image, existing directory, or `.txt` file with one path per line
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Extent of the longest axis after resizing
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub size: Option<u32>,

    /// Bits per sample in the output image
    #[arg(long, default_value = "8", value_parser = parse_bit_depth)]
    pub num_bits: BitDepth,

    /// Compression quality for JPEG outputs
    #[arg(long, default_value_t = 95, value_parser = parse_quality)]
    pub jpeg_quality: u8,

    /// Lower and upper percentiles to clip intensities
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [0.0, 100.0])]
    pub percentiles: Vec<f64>,

    /// Lower and upper values to clip intensities
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], allow_negative_numbers = true)]
    pub values: Option<Vec<f64>>,

    /// Output suffix, only used when OUTPUT is a directory
    #[arg(long)]
    pub format: Option<String>,

    /// Histogram equalisation instead of intensity range stretching
    #[arg(long)]
    pub histeq: bool,

    /// Ignore all other processing options and process as in MIMIC-CXR-JPG
    #[arg(long)]
    pub mimic: bool,

    /// Interpolation used when resizing
    #[arg(long, value_enum, default_value_t = InterpolatorArg::Bspline)]
    pub interpolator: InterpolatorArg,

    /// Skip Gaussian anti-aliasing before downsampling
    #[arg(long)]
    pub no_smooth: bool,

    /// Process images in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Worker threads for --parallel (defaults to the number of CPUs)
    #[arg(long, requires = "parallel")]
    pub workers: Option<NonZeroUsize>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Output logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolatorArg {
    Nearest,
    Linear,
    Bspline,
}

impl From<InterpolatorArg> for Interpolator {
    fn from(arg: InterpolatorArg) -> Self {
        match arg {
            InterpolatorArg::Nearest => Self::NearestNeighbor,
            InterpolatorArg::Linear => Self::Linear,
            InterpolatorArg::Bspline => Self::BSpline,
        }
    }
}

fn parse_bit_depth(s: &str) -> std::result::Result<BitDepth, String> {
    s.parse().map_err(|e: crate::Error| e.to_string())
}

fn parse_quality(s: &str) -> std::result::Result<u8, String> {
    let value: u32 = s.parse().map_err(|_| format!("\"{s}\" is not an integer"))?;
    JpegQuality::new(value)
        .map(JpegQuality::get)
        .map_err(|e| e.to_string())
}

impl Args {
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] for invalid clip bounds
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        if self.mimic {
            return Ok(PipelineConfig::preset());
        }
        let percentiles = match self.percentiles.as_slice() {
            &[lower, upper] => Percentiles::new(lower, upper)?,
            _ => Percentiles::FULL,
        };
        let values = match self.values.as_deref() {
            Some(&[lower, upper]) => Some(ValueRange::new(lower, upper)?),
            _ => None,
        };
        Ok(PipelineConfig {
            size: self.size,
            bit_depth: self.num_bits,
            jpeg_quality: JpegQuality::new(u32::from(self.jpeg_quality))?,
            percentiles,
            values,
            histeq: self.histeq,
            preset: false,
            interpolator: self.interpolator.into(),
            smooth: !self.no_smooth,
        })
    }

    #[must_use]
    pub fn batch_spec(&self) -> BatchSpec {
        BatchSpec {
            input: self.input.clone(),
            output: self.output.clone(),
            format: self.format.clone(),
        }
    }

    #[must_use]
    pub fn execution_mode(&self) -> ExecutionMode {
        match (self.parallel, self.workers) {
            (false, _) => ExecutionMode::Sequential,
            (true, Some(workers)) => ExecutionMode::Parallel { workers },
            (true, None) => ExecutionMode::parallel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use assert_matches::assert_matches;

    fn parse(args: &[&str]) -> std::result::Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("medprep").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["in.png", "out"]).unwrap();
        let config = args.pipeline_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(args.execution_mode(), ExecutionMode::Sequential);
        assert_eq!(
            args.batch_spec(),
            BatchSpec {
                input: "in.png".into(),
                output: "out".into(),
                format: None,
            }
        );
    }

    #[test]
    fn test_full_option_set() {
        let args = parse(&[
            "in.txt",
            "out.txt",
            "--size",
            "256",
            "--num-bits",
            "16",
            "--jpeg-quality",
            "80",
            "--percentiles",
            "1",
            "99",
            "--values",
            "-1000",
            "3000",
            "--histeq",
            "--interpolator",
            "linear",
            "--no-smooth",
            "--parallel",
            "--workers",
            "3",
        ])
        .unwrap();
        let config = args.pipeline_config().unwrap();
        assert_eq!(config.size, Some(256));
        assert_eq!(config.bit_depth, BitDepth::Sixteen);
        assert_eq!(config.jpeg_quality.get(), 80);
        assert_eq!(config.percentiles, Percentiles::new(1.0, 99.0).unwrap());
        assert_eq!(config.values, Some(ValueRange::new(-1000.0, 3000.0).unwrap()));
        assert!(config.histeq);
        assert!(!config.smooth);
        assert_eq!(config.interpolator, Interpolator::Linear);
        assert_eq!(
            args.execution_mode(),
            ExecutionMode::Parallel {
                workers: NonZeroUsize::new(3).unwrap()
            }
        );
    }

    #[test]
    fn test_mimic_overrides_everything() {
        let args = parse(&["a", "b", "--mimic", "--num-bits", "16", "--size", "64"]).unwrap();
        assert_eq!(args.pipeline_config().unwrap(), PipelineConfig::preset());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse(&["a", "b", "--num-bits", "12"]).is_err());
        assert!(parse(&["a", "b", "--jpeg-quality", "101"]).is_err());
        assert!(parse(&["a", "b", "--size", "0"]).is_err());
        assert!(parse(&["a", "b", "--workers", "2"]).is_err());

        let args = parse(&["a", "b", "--percentiles", "90", "10"]).unwrap();
        assert_matches!(args.pipeline_config(), Err(Error::Configuration(_)));
    }
}
