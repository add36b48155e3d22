#![warn(missing_docs)]
//! # facegate-app
//!
//! ## Purpose
//! Orchestrates capture, encoding, submission, notification, storage and
//! navigation for the `facegate` login and registration forms.
//!
//! ## Responsibilities
//! - Drive the per-form state machine in [`AuthFlowController`].
//! - Persist the authenticated identity to local key-value storage.
//! - Navigate to the welcome or login route after a successful submission.
//! - Load runtime configuration and initialise structured logging.
//!
//! ## Data flow
//! Form edits + photo (file or camera) -> [`AuthFlowController::submit`] ->
//! multipart payload -> service client -> [`facegate_core::Resolution`] ->
//! notification + storage write -> delayed [`Route`] navigation.
//!
//! ## Ownership and lifetimes
//! Each controller exclusively owns its form instance, including any open
//! camera session. Shared collaborators (store, navigator, transport) are
//! held behind `Arc` so a CLI or test harness can observe them.
//!
//! ## Error model
//! Flow-level errors are [`FlowError`]; binary-level failures are wrapped in
//! [`AppError`]. Submission failures never surface as errors: they become a
//! `Failure` state with a message.
//!
//! ## Security and privacy notes
//! - Pass phrases are never logged; [`redact_sensitive`] scrubs free-form
//!   detail strings before they reach log output.
//! - Only the opaque identity returned by the service is persisted.

pub mod config;
pub mod controller;
pub mod navigation;
pub mod storage;
pub mod telemetry;

use std::path::Path;

use facegate_core::PhotoPayload;
use thiserror::Error;

pub use config::{ClientConfig, ConfigError, camera_enabled_from_env};
pub use controller::{
    AuthFlowController, FlowDependencies, FlowError, FlowSettings, FlowSnapshot, IgnoreReason,
    SubmitDisposition,
};
pub use navigation::{ConsoleNavigator, Navigator, Route};
pub use storage::{IDENTITY_KEY, JsonFileStore, KeyValueStore, MemoryStore, StoreError, welcome_view};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("FACEGATE_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Reads a user-selected photo file into a payload.
///
/// # Errors
/// Returns [`FlowError::PhotoFile`] when the file cannot be read and
/// [`FlowError::Photo`] when it is empty.
pub async fn load_photo(path: &Path) -> Result<PhotoPayload, FlowError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    Ok(PhotoPayload::from_file(file_name, bytes)?)
}

const SECRET_KEYS: [&str; 5] = ["pass_phrase", "password", "token", "authorization", "bearer"];

/// Redacts common secret markers in log-safe output.
///
/// Everything from the first secret marker onwards is replaced.
pub fn redact_sensitive(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let first = SECRET_KEYS
        .iter()
        .filter_map(|key| lower.find(key).map(|position| (position, *key)))
        .min_by_key(|(position, _)| *position);

    match first {
        Some((position, key)) => format!("{}{key}=<redacted>", &input[..position]),
        None => input.to_string(),
    }
}

/// Binary-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Service client could not be set up.
    #[error("service error: {0}")]
    Auth(#[from] facegate_auth::AuthError),
    /// Flow operation failed.
    #[error("flow error: {0}")]
    Flow(#[from] FlowError),
    /// Local storage failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    /// Logging could not be initialised.
    #[error("telemetry error: {0}")]
    Telemetry(String),
}
