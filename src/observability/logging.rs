//! Structured logging.
//!
//! Installs a `tracing_subscriber` registry. `RUST_LOG` takes precedence
//! over the configured level.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber with `default_level` as the fallback
/// filter (e.g., "info" or "credit_cache=debug").
///
/// Fails if a global subscriber is already installed.
pub fn init(default_level: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
