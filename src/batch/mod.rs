//! Batch orchestration over resolved path pairs
//!
//! Sequential runs stop at the first failing pair. Parallel runs process
//! every pair on a fixed worker pool and report each failure independently.

mod paths;
mod pipeline;

pub use paths::{PathBatch, PathPair, resolve};
pub use pipeline::{PipelineConfig, process_pair};

use crate::error::{Error, Result};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;
use tracing::{info, warn};

/// Where the inputs and outputs of a run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSpec {
    /// File, directory or `.txt` listing
    pub input: PathBuf,
    /// File, directory or `.txt` listing
    pub output: PathBuf,
    /// Output suffix for directory outputs, with or without the leading dot
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Parallel { workers: NonZeroUsize },
}

impl ExecutionMode {
    /// Parallel with one worker per available CPU
    #[must_use]
    pub fn parallel() -> Self {
        Self::Parallel {
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Result of one pair
#[derive(Debug)]
pub struct Outcome {
    pub pair: PathPair,
    /// Path actually written, or the error that stopped this pair
    pub result: Result<PathBuf>,
}

/// Per-pair outcomes of a run, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<Outcome>,
}

impl BatchReport {
    #[must_use]
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.outcomes.len() - self.failed()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Resolve the paths of `spec` and process every pair
///
/// # Errors
///
/// - Path resolution and configuration errors before any pair is processed
/// - In sequential mode, the first failing pair as [`Error::Item`]
pub fn run(spec: &BatchSpec, config: &PipelineConfig, mode: ExecutionMode) -> Result<BatchReport> {
    config.validate()?;
    let batch = resolve(&spec.input, &spec.output, spec.format.as_deref())?;
    info!(count = batch.len(), ?mode, "Processing images");

    let report = match mode {
        ExecutionMode::Sequential => run_sequential(&batch, config)?,
        ExecutionMode::Parallel { workers } => {
            run_parallel(&batch, workers, |pair| process_pair(pair, config))?
        }
    };
    info!(processed = report.processed(), failed = report.failed(), "Done");
    Ok(report)
}

fn run_sequential(batch: &PathBatch, config: &PipelineConfig) -> Result<BatchReport> {
    let total = batch.len();
    let mut outcomes = Vec::with_capacity(total);
    for (idx, pair) in batch.iter().enumerate() {
        let written = process_pair(pair, config)
            .map_err(|e| e.for_item(&pair.input, &pair.output))?;
        info!("[{}/{}] {} -> {}", idx + 1, total, pair.input.display(), written.display());
        outcomes.push(Outcome {
            pair: pair.clone(),
            result: Ok(written),
        });
    }
    Ok(BatchReport { outcomes })
}

/// A panic while processing one pair becomes that pair's [`Error::Panicked`]
fn run_parallel<F>(batch: &PathBatch, workers: NonZeroUsize, process: F) -> Result<BatchReport>
where
    F: Fn(&PathPair) -> Result<PathBuf> + Sync,
{
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers.get())
        .build()
        .map_err(|e| Error::Configuration(format!("cannot start {workers} workers: {e}")))?;

    let outcomes: Vec<Outcome> = pool.install(|| {
        batch
            .pairs()
            .par_iter()
            .map(|pair| {
                let result = panic::catch_unwind(AssertUnwindSafe(|| process(pair)))
                    .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(payload.as_ref()))))
                    .map_err(|e| e.for_item(&pair.input, &pair.output));
                match &result {
                    Ok(written) => info!("{} -> {}", pair.input.display(), written.display()),
                    Err(e) => warn!("{e}"),
                }
                Outcome {
                    pair: pair.clone(),
                    result,
                }
            })
            .collect()
    });
    Ok(BatchReport { outcomes })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    fn gray_png(path: &std::path::Path, seed: u8) {
        let image = ::image::GrayImage::from_fn(12, 9, |x, y| {
            ::image::Luma([(x as u8 * 20).wrapping_add(y as u8 * seed)])
        });
        image.save(path).unwrap();
    }

    fn spec(input: &TempDir, output: &TempDir) -> BatchSpec {
        BatchSpec {
            input: input.path().to_path_buf(),
            output: output.path().to_path_buf(),
            format: None,
        }
    }

    #[test]
    fn test_sequential_stops_at_first_failure() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        gray_png(&input.path().join("a.png"), 3);
        fs::write(input.path().join("b.png"), b"broken").unwrap();
        gray_png(&input.path().join("c.png"), 5);

        let err = run(&spec(&input, &output), &PipelineConfig::default(), ExecutionMode::Sequential)
            .unwrap_err();
        assert_matches!(&err, Error::Item { input, .. } if input.ends_with("b.png"));
        assert_matches!(err.root(), Error::Read { .. });
        assert!(output.path().join("a.png").is_file());
        assert!(!output.path().join("c.png").exists());
    }

    #[test]
    fn test_parallel_failures_are_independent() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        gray_png(&input.path().join("a.png"), 3);
        fs::write(input.path().join("b.png"), b"broken").unwrap();
        gray_png(&input.path().join("c.png"), 5);

        let mode = ExecutionMode::Parallel {
            workers: NonZeroUsize::new(2).unwrap(),
        };
        let report = run(&spec(&input, &output), &PipelineConfig::default(), mode).unwrap();
        assert_eq!(report.outcomes().len(), 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.processed(), 2);
        assert!(!report.is_success());
        assert!(report.failures().all(|o| o.pair.input.ends_with("b.png")));
        assert!(output.path().join("a.png").is_file());
        assert!(output.path().join("c.png").is_file());
    }

    #[test]
    fn test_parallel_panic_is_isolated_to_its_pair() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            gray_png(&input.path().join(name), 3);
        }
        let batch = resolve(input.path(), output.path(), None).unwrap();
        let config = PipelineConfig::default();

        let report = run_parallel(&batch, NonZeroUsize::new(2).unwrap(), |pair| {
            if pair.input.ends_with("b.png") {
                panic!("decoder blew up");
            }
            process_pair(pair, &config)
        })
        .unwrap();

        assert_eq!(report.outcomes().len(), 3);
        assert_eq!(report.processed(), 2);
        let failure = report.failures().next().unwrap();
        assert!(failure.pair.input.ends_with("b.png"));
        assert_matches!(
            failure.result.as_ref().unwrap_err().root(),
            Error::Panicked(message) if message == "decoder blew up"
        );
        assert!(output.path().join("a.png").is_file());
        assert!(output.path().join("c.png").is_file());
    }

    #[test]
    fn test_invalid_configuration_rejected_up_front() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        gray_png(&input.path().join("a.png"), 3);
        let config = PipelineConfig {
            size: Some(0),
            ..PipelineConfig::default()
        };
        assert_matches!(
            run(&spec(&input, &output), &config, ExecutionMode::Sequential),
            Err(Error::Configuration(_))
        );
        assert!(!output.path().join("a.png").exists());
    }

    #[test]
    fn test_default_parallel_uses_available_cpus() {
        assert_matches!(
            ExecutionMode::parallel(),
            ExecutionMode::Parallel { workers } if workers.get() >= 1
        );
    }
}
