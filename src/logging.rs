// src/logging.rs

//! Logging setup for embedders using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log filter:
//! 1. explicit `filter` argument (if provided)
//! 2. `LABDAG_LOG` environment variable (e.g. "info", "labdag=debug")
//! 3. default to `info`
//!
//! Logs go to STDERR so stdout stays free for whatever the embedding
//! tool emits.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise a global logging subscriber.
///
/// Safe to call once at startup; library users with their own subscriber
/// should skip this entirely.
pub fn init_logging(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_env("LABDAG_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
