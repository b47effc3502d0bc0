//! Logging setup
//!
//! Log output goes to stderr so stdout carries only protocol replies.

use crate::error::{LayerKvError, Result};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| LayerKvError::Config(format!("invalid log level '{}': {}", level, e)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| LayerKvError::Config(format!("failed to install logger: {}", e)))
}
