#![warn(missing_docs)]
//! # facegate-auth
//!
//! ## Purpose
//! Talks to the remote authentication service and interprets its replies.
//!
//! ## Responsibilities
//! - Validate the service base URL policy (`http`/`https`, optional HTTPS-only).
//! - Resolve the `/authenticate` and `/register` endpoints for a flow kind.
//! - Execute submissions through an injectable [`SubmitTransport`], with an
//!   optional timeout.
//! - Classify a reply by status **and** body content into a [`Resolution`].
//!
//! ## Data flow
//! Encoded [`TransportPayload`] -> [`ServiceClient::submit`] ->
//! [`ServerOutcome`] (or [`TransportFailure`]) -> [`resolve`] -> [`Resolution`]
//! consumed by the flow controller.
//!
//! ## Ownership and lifetimes
//! Endpoints are resolved once at construction and owned by the client;
//! transports borrow payloads only for the duration of one request.
//!
//! ## Error model
//! Construction errors are [`AuthError`]. Request failures are
//! [`TransportFailure`] and are folded into [`Resolution::TransportError`] so
//! nothing escapes the flow boundary as an uncaught fault.
//!
//! ## Security and privacy notes
//! Neither credentials nor response bodies are logged; only status codes and
//! sizes are.
//!
//! ## Example
//! ```rust
//! use facegate_auth::classify_response;
//! use facegate_core::{FlowKind, Resolution, ServerOutcome};
//!
//! let outcome = ServerOutcome::new(200, "Wrong passphrase");
//! assert_eq!(
//!     classify_response(FlowKind::Login, &outcome),
//!     Resolution::Rejected("Wrong passphrase".to_string())
//! );
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use facegate_core::{FlowKind, REJECTION_SENTINEL, Resolution, ServerOutcome, TransportErrorKind};
use facegate_upload::TransportPayload;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Base URL the service listens on unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/";

/// Path of the login endpoint, relative to the base URL.
pub const AUTHENTICATE_PATH: &str = "authenticate";

/// Path of the enrollment endpoint, relative to the base URL.
pub const REGISTER_PATH: &str = "register";

/// Message shown when registration succeeds with an empty body.
pub const DEFAULT_REGISTERED_MESSAGE: &str = "Registration successful";

/// Abstract transport used by [`ServiceClient`].
#[async_trait]
pub trait SubmitTransport: Send + Sync {
    /// Posts `payload` to `endpoint` and returns the status and body text.
    ///
    /// # Errors
    /// Returns [`TransportFailure`] when no complete reply was received.
    async fn post(
        &self,
        endpoint: &Url,
        payload: &TransportPayload,
    ) -> Result<ServerOutcome, TransportFailure>;
}

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport with a `facegate` user agent.
    ///
    /// # Errors
    /// Returns [`AuthError::Transport`] when the HTTP client cannot be built.
    pub fn new() -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("facegate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| AuthError::Transport(error.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SubmitTransport for HttpTransport {
    async fn post(
        &self,
        endpoint: &Url,
        payload: &TransportPayload,
    ) -> Result<ServerOutcome, TransportFailure> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, payload.content_type())
            .body(payload.body().to_vec())
            .send()
            .await
            .map_err(|error| TransportFailure::Network(error.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| TransportFailure::Body(error.to_string()))?;
        Ok(ServerOutcome::new(status, body))
    }
}

/// Client for the two service endpoints.
#[derive(Clone)]
pub struct ServiceClient {
    base_url: Url,
    authenticate: Url,
    register: Url,
    timeout: Option<Duration>,
    transport: Arc<dyn SubmitTransport>,
}

impl ServiceClient {
    /// Creates a client with validated endpoints.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidEndpoint`] when the base URL violates
    /// [`validate_base_url`].
    pub fn new(
        base_url: &str,
        require_https: bool,
        transport: Arc<dyn SubmitTransport>,
    ) -> Result<Self, AuthError> {
        let base_url = validate_base_url(base_url, require_https)?;
        let authenticate = join_endpoint(&base_url, AUTHENTICATE_PATH)?;
        let register = join_endpoint(&base_url, REGISTER_PATH)?;

        Ok(Self {
            base_url,
            authenticate,
            register,
            timeout: None,
            transport,
        })
    }

    /// Bounds each submission; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint for a flow kind.
    pub fn endpoint(&self, kind: FlowKind) -> &Url {
        match kind {
            FlowKind::Login => &self.authenticate,
            FlowKind::Register => &self.register,
        }
    }

    /// Sends one payload to the endpoint of its flow kind.
    ///
    /// # Errors
    /// Returns [`TransportFailure::TimedOut`] when the configured timeout
    /// elapses, or the transport's own failure.
    pub async fn submit(&self, payload: &TransportPayload) -> Result<ServerOutcome, TransportFailure> {
        let kind = payload.kind();
        let endpoint = self.endpoint(kind);
        info!(
            stage = "submit",
            action = "send",
            %kind,
            endpoint = %endpoint,
            body_bytes = payload.body().len(),
            "sending submission"
        );

        let request = self.transport.post(endpoint, payload);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .unwrap_or(Err(TransportFailure::TimedOut)),
            None => request.await,
        };

        match &result {
            Ok(outcome) => info!(
                stage = "submit",
                action = "response",
                %kind,
                status = outcome.status_code,
                body_bytes = outcome.body_text.len(),
                "response received"
            ),
            Err(error) => warn!(stage = "submit", action = "response", %kind, %error, "submission failed"),
        }
        result
    }
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Validates and normalizes the service base URL.
///
/// The returned URL always ends in `/`, so endpoint paths are appended rather
/// than replacing the last segment.
///
/// # Errors
/// Returns [`AuthError::InvalidEndpoint`] for unparsable URLs, schemes other
/// than `http`/`https`, or plain `http` when `require_https` is set.
pub fn validate_base_url(raw: &str, require_https: bool) -> Result<Url, AuthError> {
    let mut parsed = Url::parse(raw.trim())
        .map_err(|error| AuthError::InvalidEndpoint(format!("invalid base url: {error}")))?;

    match parsed.scheme() {
        "https" => {}
        "http" if !require_https => {}
        "http" => {
            return Err(AuthError::InvalidEndpoint(
                "base url must use https".to_string(),
            ));
        }
        other => {
            return Err(AuthError::InvalidEndpoint(format!(
                "unsupported scheme: {other}"
            )));
        }
    }

    if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
        return Err(AuthError::InvalidEndpoint(
            "base url must include a host".to_string(),
        ));
    }

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(parsed)
}

fn join_endpoint(base_url: &Url, path: &str) -> Result<Url, AuthError> {
    base_url
        .join(path)
        .map_err(|error| AuthError::InvalidEndpoint(format!("cannot resolve {path}: {error}")))
}

/// Reduces a complete server reply into a [`Resolution`].
///
/// # Semantics
/// - Login: 2xx with the rejection sentinel is [`Resolution::Rejected`]; any
///   other non-empty 2xx body is the authenticated identity; an empty 2xx
///   body is malformed; non-2xx is a transport-class failure.
/// - Register: 2xx is [`Resolution::Registered`] with the informational body;
///   non-2xx with a body is [`Resolution::Rejected`] carrying the server's
///   reason; non-2xx without a body is a transport-class failure.
pub fn classify_response(kind: FlowKind, outcome: &ServerOutcome) -> Resolution {
    let body = outcome.body_text.trim();

    match (kind, outcome.is_success()) {
        (FlowKind::Login, true) if body == REJECTION_SENTINEL => {
            Resolution::Rejected(body.to_string())
        }
        (FlowKind::Login, true) if body.is_empty() => Resolution::TransportError(
            TransportErrorKind::Malformed("empty identity in response".to_string()),
        ),
        (FlowKind::Login, true) => Resolution::Authenticated(body.to_string()),
        (FlowKind::Login, false) => {
            Resolution::TransportError(TransportErrorKind::Status(outcome.status_code))
        }
        (FlowKind::Register, true) if body.is_empty() => {
            Resolution::Registered(DEFAULT_REGISTERED_MESSAGE.to_string())
        }
        (FlowKind::Register, true) => Resolution::Registered(body.to_string()),
        (FlowKind::Register, false) if body.is_empty() => {
            Resolution::TransportError(TransportErrorKind::Status(outcome.status_code))
        }
        (FlowKind::Register, false) => Resolution::Rejected(body.to_string()),
    }
}

/// Reduces a submission result, including transport failures.
pub fn resolve(kind: FlowKind, result: Result<ServerOutcome, TransportFailure>) -> Resolution {
    match result {
        Ok(outcome) => classify_response(kind, &outcome),
        Err(TransportFailure::Network(detail)) => {
            Resolution::TransportError(TransportErrorKind::Network(detail))
        }
        Err(TransportFailure::Body(detail)) => {
            Resolution::TransportError(TransportErrorKind::Malformed(detail))
        }
        Err(TransportFailure::TimedOut) => Resolution::TransportError(TransportErrorKind::TimedOut),
    }
}

/// Failure to obtain a complete reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    /// Connection-level failure.
    #[error("network failure: {0}")]
    Network(String),
    /// The body could not be read or decoded.
    #[error("response body unreadable: {0}")]
    Body(String),
    /// No reply within the configured timeout.
    #[error("submission timed out")]
    TimedOut,
}

/// Errors produced while configuring the service client.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Base URL violates the endpoint policy.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// HTTP client could not be constructed.
    #[error("transport setup failure: {0}")]
    Transport(String),
}
