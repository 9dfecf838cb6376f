//! Error types for the normalisation pipeline.
//!
//! Every variant that concerns a file carries the offending path so that the
//! rendered message is actionable on its own.

use crate::types::PixelType;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which side of a path pair failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRole {
    Input,
    Output,
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter or parameter combination
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Requested behaviour is deliberately unimplemented
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Multi-component image whose components differ
    #[error(
        "Channels expected to carry identical data, found divergent channel at index {index}"
    )]
    DataIntegrity { index: usize },

    #[error("Unsupported pixel type \"{0}\"")]
    UnsupportedType(PixelType),

    #[error("Expected image \"{path}\" to have pixel type \"{expected}\", but got \"{found}\"")]
    TypeMismatch {
        path: PathBuf,
        expected: PixelType,
        found: PixelType,
    },

    #[error("Expected path \"{path}\" to have a suffix in {expected:?}")]
    PathValidation {
        path: PathBuf,
        expected: &'static [&'static str],
    },

    #[error("Invalid {role} path: {path}")]
    PathResolution { path: PathBuf, role: PathRole },

    #[error(
        "Number of input images ({inputs}) does not match the number of output paths ({outputs})"
    )]
    CountMismatch { inputs: usize, outputs: usize },

    #[error("Failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode DICOM file {path}: {message}")]
    Dicom { path: PathBuf, message: String },

    #[error("Cannot write {dimension}-D image to {path} (expected 1-D or 2-D)")]
    UnsupportedDimension { path: PathBuf, dimension: usize },

    /// Optional capability compiled out of this build
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Processing of one pair panicked on a worker thread
    #[error("Worker panicked: {0}")]
    Panicked(String),

    /// Failure of a single path pair in a batch
    #[error("Failed to process {input} -> {output}: {source}")]
    Item {
        input: PathBuf,
        output: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the path pair this error happened on
    #[must_use]
    pub fn for_item(self, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self::Item {
            input: input.into(),
            output: output.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through [`Error::Item`] wrappers
    #[must_use]
    pub fn root(&self) -> &Error {
        match self {
            Self::Item { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
