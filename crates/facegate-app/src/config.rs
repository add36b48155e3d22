//! Runtime configuration loaded from `FACEGATE_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use facegate_auth::{DEFAULT_BASE_URL, validate_base_url};
use facegate_core::FlowKind;
use thiserror::Error;
use tracing::debug;

use crate::controller::{DEFAULT_REDIRECT_DELAY, FlowSettings};

/// Service base URL.
pub const ENV_BASE_URL: &str = "FACEGATE_BASE_URL";
/// Reject plain `http` base URLs when truthy.
pub const ENV_REQUIRE_HTTPS: &str = "FACEGATE_REQUIRE_HTTPS";
/// Delay before navigating away after success, in milliseconds.
pub const ENV_REDIRECT_DELAY_MS: &str = "FACEGATE_REDIRECT_DELAY_MS";
/// Optional submission timeout, in milliseconds.
pub const ENV_SUBMIT_TIMEOUT_MS: &str = "FACEGATE_SUBMIT_TIMEOUT_MS";
/// Path of the JSON identity store.
pub const ENV_STORE_PATH: &str = "FACEGATE_STORE_PATH";
/// Require a photo on the login form when truthy.
pub const ENV_REQUIRE_LOGIN_PHOTO: &str = "FACEGATE_REQUIRE_LOGIN_PHOTO";
/// Camera kill switch.
pub const ENV_CAMERA_ENABLED: &str = "FACEGATE_CAMERA_ENABLED";

/// Default identity store location.
pub const DEFAULT_STORE_PATH: &str = "facegate-store.json";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service base URL, validated.
    pub base_url: String,
    /// Reject plain `http`.
    pub require_https: bool,
    /// Display delay before navigating after success.
    pub redirect_delay: Duration,
    /// Optional bound on each submission.
    pub submit_timeout: Option<Duration>,
    /// Identity store file.
    pub store_path: PathBuf,
    /// Login form requires a photo.
    pub require_login_photo: bool,
    /// Camera kill switch state.
    pub camera_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            require_https: false,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            submit_timeout: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            require_login_photo: false,
            camera_enabled: true,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// See [`ClientConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unset keys keep their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for unparsable values and
    /// [`ConfigError::Endpoint`] when the base URL violates policy.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let require_https = match lookup(ENV_REQUIRE_HTTPS) {
            Some(raw) => parse_flag(ENV_REQUIRE_HTTPS, &raw)?,
            None => defaults.require_https,
        };
        let base_url = lookup(ENV_BASE_URL).unwrap_or(defaults.base_url);
        let base_url = validate_base_url(&base_url, require_https)
            .map_err(|error| ConfigError::Endpoint(error.to_string()))?
            .to_string();

        let redirect_delay = match lookup(ENV_REDIRECT_DELAY_MS) {
            Some(raw) => Duration::from_millis(parse_millis(ENV_REDIRECT_DELAY_MS, &raw)?),
            None => defaults.redirect_delay,
        };
        let submit_timeout = match lookup(ENV_SUBMIT_TIMEOUT_MS) {
            Some(raw) => match parse_millis(ENV_SUBMIT_TIMEOUT_MS, &raw)? {
                0 => None,
                millis => Some(Duration::from_millis(millis)),
            },
            None => defaults.submit_timeout,
        };
        let store_path = lookup(ENV_STORE_PATH)
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);
        let require_login_photo = match lookup(ENV_REQUIRE_LOGIN_PHOTO) {
            Some(raw) => parse_flag(ENV_REQUIRE_LOGIN_PHOTO, &raw)?,
            None => defaults.require_login_photo,
        };
        let camera_enabled = camera_enabled_from(lookup(ENV_CAMERA_ENABLED).as_deref());

        let config = Self {
            base_url,
            require_https,
            redirect_delay,
            submit_timeout,
            store_path,
            require_login_photo,
            camera_enabled,
        };
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Flow settings for one form kind.
    pub fn flow_settings(&self, kind: FlowKind) -> FlowSettings {
        FlowSettings {
            redirect_delay: self.redirect_delay,
            require_photo: kind == FlowKind::Login && self.require_login_photo,
        }
    }
}

/// Checks the camera kill switch in the process environment.
///
/// Semantics:
/// - Unset => camera enabled.
/// - `0`, `false`, `off` (case-insensitive) => camera disabled.
/// - Any other value => camera enabled.
pub fn camera_enabled_from_env() -> bool {
    camera_enabled_from(std::env::var(ENV_CAMERA_ENABLED).ok().as_deref())
}

fn camera_enabled_from(raw: Option<&str>) -> bool {
    match raw {
        Some(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            !(normalized == "0" || normalized == "false" || normalized == "off")
        }
        None => true,
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable holds a value that cannot be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
    /// Base URL violates endpoint policy.
    #[error("{0}")]
    Endpoint(String),
}
