//! Logging initialisation
//!
//! Events go to stderr through `tracing-subscriber`, either human-readable or
//! as JSON lines. `RUST_LOG` overrides the level chosen by `verbose`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber
///
/// Calling this more than once is a no-op.
pub fn init(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if installed.is_err() {
        tracing::debug!("Logging already initialised");
    }
}
