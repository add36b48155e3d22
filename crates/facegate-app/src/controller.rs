//! Per-form state machine driving capture, submission and navigation.
//!
//! One [`AuthFlowController`] owns one form instance. All methods take
//! `&self`; form state lives in a `RefCell` that is never borrowed across an
//! `.await`, and [`FlowState`] is the only synchronization point between
//! interleaved operations on the same form.

use std::cell::RefCell;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use facegate_auth::{ServiceClient, resolve};
use facegate_capture::{CaptureError, CaptureSession, MediaCaptureController};
use facegate_core::{
    CoreError, CredentialsDraft, FlowKind, FlowState, FormField, PhotoPayload, Resolution,
    TransportErrorKind, ValidationError,
};
use facegate_ui::{
    ControlInputs, Controls, DismissEffect, Notification, NotificationPresenter, project_controls,
    state_label,
};
use facegate_upload::encode_submission;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::navigation::{Navigator, Route};
use crate::redact_sensitive;
use crate::storage::{IDENTITY_KEY, KeyValueStore};

/// Delay between a successful submission and navigation.
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(2000);

/// Success message for an accepted login.
pub const LOGIN_SUCCESS_MESSAGE: &str = "Login successful";
/// Login answered with a non-2xx status.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";
/// Registration answered with a non-2xx status and no reason.
pub const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed";
/// The service could not be reached.
pub const NETWORK_ERROR_MESSAGE: &str = "An error occurred";
/// The reply could not be interpreted.
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Unexpected response from the service";
/// The configured submit timeout elapsed.
pub const TIMEOUT_MESSAGE: &str = "The service did not respond in time";
/// The identity could not be persisted after a successful login.
pub const STORAGE_FAILED_MESSAGE: &str = "Could not save the session locally";

/// Tunables for one form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSettings {
    /// Display delay before navigating after success.
    pub redirect_delay: Duration,
    /// Refuse to submit without a photo.
    pub require_photo: bool,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            require_photo: false,
        }
    }
}

/// Collaborators injected into a controller.
pub struct FlowDependencies {
    /// Service endpoints.
    pub client: ServiceClient,
    /// Camera access.
    pub capture: MediaCaptureController,
    /// Identity storage.
    pub store: Arc<dyn KeyValueStore>,
    /// Route handler.
    pub navigator: Arc<dyn Navigator>,
}

/// Why a submit request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A submission is already in flight.
    InFlight,
    /// The form already reached `Success` or `Failure`.
    AlreadyResolved(FlowState),
    /// Camera acquisition or frame encoding is still running.
    CameraBusy,
    /// The form was torn down.
    TornDown,
}

/// Result of [`AuthFlowController::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDisposition {
    /// The service answered (or failed) and the form settled.
    Completed {
        /// Classified outcome.
        resolution: Resolution,
        /// State the form settled in.
        state: FlowState,
    },
    /// Client-side validation failed; no request was sent.
    Invalid(ValidationError),
    /// The request was refused without side effects.
    Ignored(IgnoreReason),
    /// The form was torn down while the request was in flight.
    Abandoned,
}

/// Read-only view of a form for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSnapshot {
    /// Form kind.
    pub kind: FlowKind,
    /// Current state.
    pub state: FlowState,
    /// Short state label.
    pub label: &'static str,
    /// Notification area.
    pub notification: Notification,
    /// Control enablement.
    pub controls: Controls,
    /// A photo is attached.
    pub photo_attached: bool,
    /// A camera session is live.
    pub camera_open: bool,
}

/// Flow-level errors. Submission failures are never reported here.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A field value was refused.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// Camera access or capture failed.
    #[error("camera failure: {0}")]
    Capture(#[from] CaptureError),
    /// Photo bytes were unusable.
    #[error("photo rejected: {0}")]
    Photo(#[from] CoreError),
    /// Photo file could not be read.
    #[error("photo file unreadable: {0}")]
    PhotoFile(#[from] io::Error),
    /// The action is not available in the current state.
    #[error("cannot {action} in state {state:?}")]
    InvalidState {
        /// Requested action.
        action: &'static str,
        /// State at the time of the request.
        state: FlowState,
    },
    /// Camera acquisition or frame encoding is still running.
    #[error("camera is busy")]
    CameraBusy,
    /// The form was torn down.
    #[error("form was torn down")]
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CameraWork {
    Opening,
    Encoding,
}

struct FormInstance {
    state: FlowState,
    draft: CredentialsDraft,
    photo: Option<PhotoPayload>,
    session: Option<CaptureSession>,
    camera_work: Option<CameraWork>,
    message: Option<String>,
    presenter: NotificationPresenter,
    pending_route: Option<Route>,
    torn_down: bool,
}

impl FormInstance {
    fn new(kind: FlowKind) -> Self {
        Self {
            state: FlowState::Idle,
            draft: CredentialsDraft::new(kind),
            photo: None,
            session: None,
            camera_work: None,
            message: None,
            presenter: NotificationPresenter::new(),
            pending_route: None,
            torn_down: false,
        }
    }

    fn ensure_live(&self) -> Result<(), FlowError> {
        if self.torn_down {
            return Err(FlowError::TornDown);
        }
        Ok(())
    }

    fn close_session(&mut self) -> bool {
        match self.session.take() {
            Some(mut session) => session.close(),
            None => false,
        }
    }
}

/// Clears pending camera work when the operation ends or its future is dropped.
///
/// An encode abandoned before [`CameraWorkGuard::finish`] has taken the
/// session out of the form, so the form falls back to `Idle`.
struct CameraWorkGuard<'a> {
    form: &'a RefCell<FormInstance>,
    work: CameraWork,
    finished: bool,
}

impl<'a> CameraWorkGuard<'a> {
    fn begin(form: &'a RefCell<FormInstance>, work: CameraWork) -> Self {
        form.borrow_mut().camera_work = Some(work);
        Self {
            form,
            work,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for CameraWorkGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut form) = self.form.try_borrow_mut() else {
            return;
        };
        form.camera_work = None;
        if !self.finished
            && self.work == CameraWork::Encoding
            && form.state == FlowState::CameraOpen
            && form.session.is_none()
        {
            form.state = FlowState::Idle;
            debug!(stage = "flow", action = "release", "abandoned capture returned to idle");
        }
    }
}

/// Holds the `Submitting` state; an unsettled form returns to `Idle` on drop.
struct SubmissionScope<'a> {
    form: &'a RefCell<FormInstance>,
}

impl Drop for SubmissionScope<'_> {
    fn drop(&mut self) {
        if let Ok(mut form) = self.form.try_borrow_mut()
            && form.state == FlowState::Submitting
        {
            form.state = FlowState::Idle;
            debug!(stage = "flow", action = "release", "submission scope released unsettled");
        }
    }
}

/// Orchestrates one login or registration form.
pub struct AuthFlowController {
    kind: FlowKind,
    settings: FlowSettings,
    client: ServiceClient,
    capture: MediaCaptureController,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    form: RefCell<FormInstance>,
}

impl AuthFlowController {
    /// Creates a controller with an empty form in `Idle`.
    pub fn new(kind: FlowKind, settings: FlowSettings, dependencies: FlowDependencies) -> Self {
        Self {
            kind,
            settings,
            client: dependencies.client,
            capture: dependencies.capture,
            store: dependencies.store,
            navigator: dependencies.navigator,
            form: RefCell::new(FormInstance::new(kind)),
        }
    }

    /// Form kind.
    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    /// Current state.
    pub fn state(&self) -> FlowState {
        self.form.borrow().state
    }

    /// Latest outcome message, if any.
    pub fn message(&self) -> Option<String> {
        self.form.borrow().message.clone()
    }

    /// Current value of a field.
    pub fn field(&self, field: FormField) -> String {
        self.form.borrow().draft.get(field).to_string()
    }

    /// Route scheduled after a success, until it is followed.
    pub fn pending_route(&self) -> Option<Route> {
        self.form.borrow().pending_route.clone()
    }

    /// Updates one credential field.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidState`] while submitting or after success,
    /// and [`FlowError::Validation`] for fields not on this form.
    pub fn set_field(&self, field: FormField, value: impl Into<String>) -> Result<(), FlowError> {
        let mut form = self.form.borrow_mut();
        form.ensure_live()?;
        if matches!(form.state, FlowState::Submitting | FlowState::Success) {
            return Err(FlowError::InvalidState {
                action: "edit fields",
                state: form.state,
            });
        }
        form.draft.set(field, value)?;
        Ok(())
    }

    /// Attaches a user-selected photo, closing any open camera session.
    ///
    /// # Errors
    /// Returns [`FlowError::CameraBusy`] during camera work and
    /// [`FlowError::InvalidState`] outside the composing states.
    pub fn select_file(&self, photo: PhotoPayload) -> Result<(), FlowError> {
        let mut form = self.form.borrow_mut();
        form.ensure_live()?;
        if form.camera_work.is_some() {
            return Err(FlowError::CameraBusy);
        }
        if !is_composing(form.state) {
            return Err(FlowError::InvalidState {
                action: "select a file",
                state: form.state,
            });
        }

        form.close_session();
        info!(
            stage = "flow",
            action = "select_file",
            kind = %self.kind,
            file = photo.file_name(),
            bytes = photo.bytes().len(),
            "photo attached"
        );
        form.photo = Some(photo);
        form.state = FlowState::Idle;
        Ok(())
    }

    /// Opens the camera; the form moves to `CameraOpen` on success.
    ///
    /// # Errors
    /// Camera failures leave the state unchanged and are returned as
    /// [`FlowError::Capture`].
    pub async fn open_camera(&self) -> Result<(), FlowError> {
        {
            let form = self.form.borrow();
            form.ensure_live()?;
            if form.camera_work.is_some() {
                return Err(FlowError::CameraBusy);
            }
            if !matches!(form.state, FlowState::Idle | FlowState::PhotoCaptured) {
                return Err(FlowError::InvalidState {
                    action: "open the camera",
                    state: form.state,
                });
            }
        }

        let work = CameraWorkGuard::begin(&self.form, CameraWork::Opening);
        let opened = self.capture.open_camera().await;
        work.finish();

        let mut session = opened?;
        let mut form = self.form.borrow_mut();
        if form.torn_down {
            session.close();
            return Err(FlowError::TornDown);
        }
        form.session = Some(session);
        form.state = FlowState::CameraOpen;
        Ok(())
    }

    /// Captures one frame from the open session and attaches it as a PNG.
    ///
    /// The session is closed once the frame is encoded. A lost stream closes
    /// the session and returns the form to `Idle`.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidState`] without an open session and
    /// [`FlowError::Capture`] when grabbing or encoding fails.
    pub async fn capture(&self) -> Result<(), FlowError> {
        let mut session = {
            let mut form = self.form.borrow_mut();
            form.ensure_live()?;
            if form.camera_work.is_some() {
                return Err(FlowError::CameraBusy);
            }
            match (form.state, form.session.take()) {
                (FlowState::CameraOpen, Some(session)) => session,
                (state, session) => {
                    form.session = session;
                    return Err(FlowError::InvalidState {
                        action: "capture",
                        state,
                    });
                }
            }
        };

        let work = CameraWorkGuard::begin(&self.form, CameraWork::Encoding);
        let captured = self.capture.capture_frame(&mut session).await;
        work.finish();

        let mut form = self.form.borrow_mut();
        if form.torn_down {
            self.capture.close_session(&mut session);
            return Err(FlowError::TornDown);
        }

        match captured {
            Ok(photo) => {
                self.capture.close_session(&mut session);
                form.photo = Some(photo);
                form.state = FlowState::PhotoCaptured;
                Ok(())
            }
            Err(error @ (CaptureError::StreamLost(_) | CaptureError::SessionClosed)) => {
                self.capture.close_session(&mut session);
                form.state = FlowState::Idle;
                warn!(stage = "flow", action = "capture", kind = %self.kind, %error, "stream lost");
                Err(error.into())
            }
            Err(error) => {
                form.session = Some(session);
                Err(error.into())
            }
        }
    }

    /// Submits the form.
    ///
    /// At most one submission is in flight per form; the `Submitting` state is
    /// released on every exit path, including this future being dropped.
    pub async fn submit(&self) -> SubmitDisposition {
        let payload = {
            let mut form = self.form.borrow_mut();
            if form.torn_down {
                return SubmitDisposition::Ignored(IgnoreReason::TornDown);
            }
            match form.state {
                FlowState::Submitting => {
                    debug!(stage = "flow", action = "submit", kind = %self.kind, "already in flight");
                    return SubmitDisposition::Ignored(IgnoreReason::InFlight);
                }
                state @ (FlowState::Success | FlowState::Failure) => {
                    return SubmitDisposition::Ignored(IgnoreReason::AlreadyResolved(state));
                }
                _ => {}
            }
            if form.camera_work.is_some() {
                return SubmitDisposition::Ignored(IgnoreReason::CameraBusy);
            }

            let credentials = match form.draft.validate() {
                Ok(credentials) => credentials,
                Err(error) => return SubmitDisposition::Invalid(error),
            };
            if self.settings.require_photo && form.photo.is_none() {
                return SubmitDisposition::Invalid(ValidationError::MissingPhoto);
            }

            form.close_session();
            form.state = FlowState::Submitting;
            form.message = None;
            encode_submission(&credentials, form.photo.as_ref())
        };

        let _scope = SubmissionScope { form: &self.form };
        info!(
            stage = "flow",
            action = "submit",
            kind = %self.kind,
            photo = payload.file_part_count() > 0,
            "submission started"
        );

        let result = self.client.submit(&payload).await;
        let resolution = resolve(self.kind, result);

        if self.form.borrow().torn_down {
            info!(stage = "flow", action = "submit", kind = %self.kind, "response after teardown dropped");
            return SubmitDisposition::Abandoned;
        }

        let state = self.settle(&resolution);
        SubmitDisposition::Completed { resolution, state }
    }

    /// Waits out the display delay, then navigates and tears the form down.
    ///
    /// Returns the followed route, or `None` when nothing is scheduled or the
    /// form was torn down during the delay.
    pub async fn follow_redirect(&self) -> Option<Route> {
        {
            let form = self.form.borrow();
            if form.torn_down || form.pending_route.is_none() {
                return None;
            }
        }

        tokio::time::sleep(self.settings.redirect_delay).await;

        let route = {
            let mut form = self.form.borrow_mut();
            if form.torn_down || form.state != FlowState::Success {
                return None;
            }
            form.pending_route.take()?
        };

        info!(stage = "flow", action = "navigate", kind = %self.kind, route = %route, "navigating");
        self.navigator.navigate(&route);
        self.teardown();
        Some(route)
    }

    /// Handles a dismissal click on the notification.
    pub fn dismiss_notification(&self) -> DismissEffect {
        let mut form = self.form.borrow_mut();
        let state = form.state;
        let effect = form.presenter.dismiss(state);
        if effect == DismissEffect::ReturnToIdle {
            form.state = FlowState::Idle;
        }
        effect
    }

    /// Renders the notification area.
    pub fn notification(&self) -> Notification {
        let form = self.form.borrow();
        form.presenter.render(form.state, form.message.as_deref())
    }

    /// Projects control enablement.
    pub fn controls(&self) -> Controls {
        let form = self.form.borrow();
        if form.torn_down {
            return Controls {
                open_camera: false,
                capture: false,
                select_file: false,
                submit: false,
                edit_fields: false,
            };
        }
        project_controls(ControlInputs {
            state: form.state,
            form_complete: form.draft.is_complete(),
            photo_attached: form.photo.is_some(),
            camera_busy: form.camera_work.is_some(),
            camera_enabled: self.capture.is_enabled(),
            photo_required: self.settings.require_photo,
        })
    }

    /// Full rendering view.
    pub fn snapshot(&self) -> FlowSnapshot {
        let notification = self.notification();
        let controls = self.controls();
        let form = self.form.borrow();
        FlowSnapshot {
            kind: self.kind,
            state: form.state,
            label: state_label(form.state),
            notification,
            controls,
            photo_attached: form.photo.is_some(),
            camera_open: form.session.as_ref().is_some_and(CaptureSession::is_open),
        }
    }

    /// Releases the camera and discards the form. Later responses and timers
    /// are no-ops.
    pub fn teardown(&self) {
        let mut form = self.form.borrow_mut();
        if form.torn_down {
            return;
        }
        form.torn_down = true;
        form.close_session();
        form.photo = None;
        form.pending_route = None;
        info!(stage = "flow", action = "teardown", kind = %self.kind, "form torn down");
    }

    /// Returns `true` once the form was torn down.
    pub fn is_torn_down(&self) -> bool {
        self.form.borrow().torn_down
    }

    fn settle(&self, resolution: &Resolution) -> FlowState {
        let (mut state, mut message, mut route) = match resolution {
            Resolution::Authenticated(identity) => (
                FlowState::Success,
                LOGIN_SUCCESS_MESSAGE.to_string(),
                Some(Route::Welcome {
                    identity: identity.clone(),
                }),
            ),
            Resolution::Registered(reply) => (FlowState::Success, reply.clone(), Some(Route::Login)),
            Resolution::Rejected(reason) => (FlowState::Failure, reason.clone(), None),
            Resolution::TransportError(error) => (
                FlowState::Failure,
                transport_message(self.kind, error).to_string(),
                None,
            ),
        };

        if let Resolution::Authenticated(identity) = resolution
            && let Err(error) = self.store.set(IDENTITY_KEY, identity)
        {
            warn!(stage = "flow", action = "persist", %error, "identity not stored");
            state = FlowState::Failure;
            message = STORAGE_FAILED_MESSAGE.to_string();
            route = None;
        }

        match resolution {
            Resolution::TransportError(TransportErrorKind::Network(detail)) => warn!(
                stage = "flow",
                action = "settle",
                kind = %self.kind,
                detail = %redact_sensitive(detail),
                "service unreachable"
            ),
            _ => info!(
                stage = "flow",
                action = "settle",
                kind = %self.kind,
                state = state_label(state),
                "submission settled"
            ),
        }

        let mut form = self.form.borrow_mut();
        form.state = state;
        form.message = Some(message);
        form.pending_route = route;
        form.presenter.outcome_arrived();
        if state == FlowState::Success {
            form.photo = None;
        }
        state
    }
}

impl std::fmt::Debug for AuthFlowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let form = self.form.borrow();
        f.debug_struct("AuthFlowController")
            .field("kind", &self.kind)
            .field("state", &form.state)
            .field("draft", &form.draft)
            .field("photo", &form.photo)
            .field("torn_down", &form.torn_down)
            .finish()
    }
}

fn is_composing(state: FlowState) -> bool {
    matches!(
        state,
        FlowState::Idle | FlowState::CameraOpen | FlowState::PhotoCaptured
    )
}

/// Generic message for a transport-class failure.
pub fn transport_message(kind: FlowKind, error: &TransportErrorKind) -> &'static str {
    match (kind, error) {
        (FlowKind::Login, TransportErrorKind::Status(_)) => LOGIN_FAILED_MESSAGE,
        (FlowKind::Register, TransportErrorKind::Status(_)) => REGISTRATION_FAILED_MESSAGE,
        (_, TransportErrorKind::Network(_)) => NETWORK_ERROR_MESSAGE,
        (_, TransportErrorKind::Malformed(_)) => MALFORMED_RESPONSE_MESSAGE,
        (_, TransportErrorKind::TimedOut) => TIMEOUT_MESSAGE,
    }
}
