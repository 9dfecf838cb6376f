//! Grayscale medical image normalisation
//!
//! Images are read (raster containers or DICOM), reduced to a single channel,
//! optionally resized with anti-aliasing, remapped into an 8- or 16-bit
//! intensity range and written in a container chosen by the output suffix.

pub mod batch;
pub mod cli;
pub mod codec;
pub mod error;
pub mod image;
pub mod logging;
pub mod tensor;
pub mod types;

pub use batch::{BatchReport, BatchSpec, ExecutionMode, PathBatch, PathPair, PipelineConfig};
pub use error::{Error, PathRole, Result};
pub use self::image::{Image, PixelData};
pub use types::{BitDepth, Interpolator, JpegQuality, Percentiles, PixelType, ValueRange};
