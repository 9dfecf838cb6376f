//! Input/output path resolution
//!
//! Both sides accept a single file, a directory or a `.txt` listing with one
//! path per line.

use crate::codec::has_suffix;
use crate::error::{Error, PathRole, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const LIST_SUFFIXES: &[&str] = &[".txt"];

/// One unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPair {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Ordered, equally long input and output lists, built once per run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathBatch {
    pairs: Vec<PathPair>,
}

impl PathBatch {
    #[must_use]
    pub fn pairs(&self) -> &[PathPair] {
        &self.pairs
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathPair> {
        self.pairs.iter()
    }
}

impl<'a> IntoIterator for &'a PathBatch {
    type Item = &'a PathPair;
    type IntoIter = std::slice::Iter<'a, PathPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

/// Pair every input with its output path
///
/// `format` (with or without the leading dot) replaces the suffix of outputs
/// placed in a directory and is ignored otherwise.
///
/// # Errors
///
/// - [`Error::PathResolution`] if either side is neither a file, a directory nor a listing
/// - [`Error::CountMismatch`] if the output list length differs from the input list
/// - [`Error::Io`] if a directory or listing cannot be read
pub fn resolve(input: &Path, output: &Path, format: Option<&str>) -> Result<PathBatch> {
    let inputs = input_paths(input)?;
    let outputs = output_paths(output, &inputs, format)?;
    if outputs.len() != inputs.len() {
        return Err(Error::CountMismatch {
            inputs: inputs.len(),
            outputs: outputs.len(),
        });
    }
    debug!(count = inputs.len(), input = %input.display(), output = %output.display(), "Resolved paths");

    Ok(PathBatch {
        pairs: inputs
            .into_iter()
            .zip(outputs)
            .map(|(input, output)| PathPair { input, output })
            .collect(),
    })
}

fn input_paths(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() {
        list_directory(input)
    } else if has_suffix(input, LIST_SUFFIXES) {
        read_listing(input)
    } else if input.is_file() {
        Ok(vec![input.to_path_buf()])
    } else {
        Err(Error::PathResolution {
            path: input.to_path_buf(),
            role: PathRole::Input,
        })
    }
}

fn output_paths(output: &Path, inputs: &[PathBuf], format: Option<&str>) -> Result<Vec<PathBuf>> {
    if has_suffix(output, LIST_SUFFIXES) {
        read_listing(output)
    } else if output.is_file() {
        Ok(vec![output.to_path_buf()])
    } else if output.is_dir() {
        Ok(inputs
            .iter()
            .map(|input| {
                let mut path = output.join(input.file_name().unwrap_or(input.as_os_str()));
                if let Some(format) = format {
                    path.set_extension(format.trim_start_matches('.'));
                }
                path
            })
            .collect())
    } else {
        Err(Error::PathResolution {
            path: output.to_path_buf(),
            role: PathRole::Output,
        })
    }
}

/// Regular files directly inside `dir`, sorted by path
fn list_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_error = |source| Error::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() {
            paths.push(path);
        } else {
            debug!(path = %path.display(), "Skipping directory entry that is not a file");
        }
    }
    paths.sort();
    Ok(paths)
}

/// Non-empty, trimmed lines of a listing file in file order
fn read_listing(listing: &Path) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(listing).map_err(|source| Error::Io {
        path: listing.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}
