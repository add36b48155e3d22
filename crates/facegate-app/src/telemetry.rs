//! Logging setup for the `facegate` binary.

use tracing_subscriber::EnvFilter;

use crate::AppError;

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Logs go to stderr so command output on stdout stays clean.
///
/// # Errors
/// Returns [`AppError::Telemetry`] when a global subscriber is already set.
pub fn init_tracing() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| AppError::Telemetry(error.to_string()))
}
