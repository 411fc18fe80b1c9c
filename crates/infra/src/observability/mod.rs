//! Tracing subscriber setup.

use chime_domain::{ChimeError, Result};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber, honoring `RUST_LOG` and defaulting
/// to `info`.
///
/// # Errors
/// Returns `Unexpected` when a global subscriber is already installed.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| ChimeError::Unexpected(e.to_string()))
}
