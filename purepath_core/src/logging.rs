//! Logging setup for the `purepath` binary.
//!
//! Everything goes to stderr; stdout carries command output only.

use crate::{Error, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber at `warn`, or whatever RUST_LOG asks for
pub fn init() -> Result<()> {
    init_with_level("warn")
}

/// Install the global subscriber with `default_level` as the fallback filter.
///
/// A valid RUST_LOG still wins. Fails if `default_level` is not a filter
/// directive or a subscriber is already installed.
pub fn init_with_level(default_level: &str) -> Result<()> {
    let filter = filter_for(default_level)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))
}

fn filter_for(default_level: &str) -> Result<EnvFilter> {
    let fallback = EnvFilter::try_new(default_level)
        .map_err(|e| Error::Config(format!("invalid log level {:?}: {}", default_level, e)))?;
    Ok(EnvFilter::try_from_default_env().unwrap_or(fallback))
}

/// Route logs through the test harness's captured output
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
