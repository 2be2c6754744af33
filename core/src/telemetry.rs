// Logging setup
use crate::{CommsError, Result};
use tracing::info;

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|e| CommsError::Config(format!("tracing subscriber: {}", e)))?;

    info!(target: "telemetry", "Tracing initialized");
    Ok(())
}
