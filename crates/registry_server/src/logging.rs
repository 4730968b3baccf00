//! Logging system setup
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` always wins over the
//! configured level so operators can raise verbosity per module without
//! touching the configuration file.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Fallback filter when `RUST_LOG` is unset (e.g. "info")
/// * `json_format` - Emit one JSON object per event instead of plain text
///
/// # Returns
/// * `Result<()>` - Fails if a global subscriber is already installed
pub fn setup_logging(level: &str, json_format: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result = if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
    };

    result.map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}
