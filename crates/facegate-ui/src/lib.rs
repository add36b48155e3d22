#![warn(missing_docs)]
//! # facegate-ui
//!
//! ## Purpose
//! Projects flow state into what the user sees: the notification area, which
//! controls are enabled, and the welcome text.
//!
//! ## Responsibilities
//! - Render loading/success/error notifications from [`FlowState`] and the
//!   latest outcome text.
//! - Track the only presenter-local state: whether the current message has
//!   been dismissed.
//! - Derive control enablement so impossible combinations cannot be shown.
//!
//! ## Data flow
//! Flow controller state + latest message -> [`NotificationPresenter::render`]
//! -> [`Notification`]; form inputs -> [`project_controls`] -> [`Controls`].
//!
//! ## Ownership and lifetimes
//! Rendered values own their text so they can outlive the controller borrow
//! that produced them.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors. Dismissal that
//! does not apply is reported as [`DismissEffect::Ignored`].
//!
//! ## Security and privacy notes
//! Only server-provided messages and fixed strings are rendered; credentials
//! never reach this layer.

use facegate_core::FlowState;

/// Text shown while a submission is in flight.
pub const LOADING_TEXT: &str = "Submitting";

/// Visual tone of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Accepted submission.
    Success,
    /// Rejected or failed submission.
    Error,
}

/// What the notification area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Nothing.
    Hidden,
    /// Loading indicator.
    Loading {
        /// Indicator caption.
        text: String,
    },
    /// Outcome message.
    Message {
        /// Visual tone.
        tone: Tone,
        /// Message text.
        text: String,
        /// Whether the user can dismiss it.
        dismissible: bool,
    },
}

/// Result of a dismissal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissEffect {
    /// The failure was acknowledged; the form returns to `Idle`.
    ReturnToIdle,
    /// Dismissal does not apply in the current state.
    Ignored,
}

/// Notification renderer with a dismissed flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPresenter {
    dismissed: bool,
}

impl NotificationPresenter {
    /// Creates a presenter with nothing dismissed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the dismissed flag; call whenever a new outcome arrives.
    pub fn outcome_arrived(&mut self) {
        self.dismissed = false;
    }

    /// Returns `true` when the current message was dismissed.
    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    /// Renders the notification for `state` and the latest outcome text.
    pub fn render(&self, state: FlowState, message: Option<&str>) -> Notification {
        match state {
            FlowState::Submitting => Notification::Loading {
                text: LOADING_TEXT.to_string(),
            },
            FlowState::Success => Notification::Message {
                tone: Tone::Success,
                text: message.unwrap_or_default().to_string(),
                dismissible: false,
            },
            FlowState::Failure if !self.dismissed => Notification::Message {
                tone: Tone::Error,
                text: message.unwrap_or_default().to_string(),
                dismissible: true,
            },
            _ => Notification::Hidden,
        }
    }

    /// Handles a dismissal click.
    ///
    /// Only a failure can be dismissed; submitting and success are driven by
    /// the controller alone.
    pub fn dismiss(&mut self, state: FlowState) -> DismissEffect {
        match state {
            FlowState::Failure => {
                self.dismissed = true;
                DismissEffect::ReturnToIdle
            }
            _ => DismissEffect::Ignored,
        }
    }
}

/// Inputs for control enablement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlInputs {
    /// Current flow state.
    pub state: FlowState,
    /// Every required field is non-blank.
    pub form_complete: bool,
    /// A photo is attached.
    pub photo_attached: bool,
    /// Camera acquisition or frame encoding is in progress.
    pub camera_busy: bool,
    /// Camera kill switch allows acquisition.
    pub camera_enabled: bool,
    /// Policy requires a photo before submitting.
    pub photo_required: bool,
}

/// Enablement of every form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    /// "Open camera" button.
    pub open_camera: bool,
    /// "Capture" button.
    pub capture: bool,
    /// File picker.
    pub select_file: bool,
    /// Submit button.
    pub submit: bool,
    /// Text inputs.
    pub edit_fields: bool,
}

/// Derives control enablement from form inputs.
pub fn project_controls(inputs: ControlInputs) -> Controls {
    let composing = matches!(
        inputs.state,
        FlowState::Idle | FlowState::CameraOpen | FlowState::PhotoCaptured
    );
    let photo_ok = !inputs.photo_required || inputs.photo_attached;

    Controls {
        open_camera: inputs.camera_enabled
            && !inputs.camera_busy
            && matches!(inputs.state, FlowState::Idle | FlowState::PhotoCaptured),
        capture: inputs.state == FlowState::CameraOpen && !inputs.camera_busy,
        select_file: composing && !inputs.camera_busy,
        submit: composing && !inputs.camera_busy && inputs.form_complete && photo_ok,
        edit_fields: !matches!(inputs.state, FlowState::Submitting | FlowState::Success),
    }
}

/// Short label for a flow state.
pub fn state_label(state: FlowState) -> &'static str {
    match state {
        FlowState::Idle => "Idle",
        FlowState::CameraOpen => "Camera open",
        FlowState::PhotoCaptured => "Photo captured",
        FlowState::Submitting => "Submitting",
        FlowState::Success => "Success",
        FlowState::Failure => "Failure",
    }
}

/// Greeting shown on the welcome view.
pub fn welcome_message(identity: &str) -> String {
    format!("Welcome, {identity}!")
}

#[cfg(test)]
mod tests {
    //! Unit tests for notification rendering and control gates.

    use super::*;

    fn inputs(state: FlowState) -> ControlInputs {
        ControlInputs {
            state,
            form_complete: true,
            photo_attached: false,
            camera_busy: false,
            camera_enabled: true,
            photo_required: false,
        }
    }

    #[test]
    fn loading_shows_only_while_submitting() {
        let presenter = NotificationPresenter::new();
        assert!(matches!(
            presenter.render(FlowState::Submitting, Some("ignored")),
            Notification::Loading { .. }
        ));
        assert_eq!(
            presenter.render(FlowState::Idle, Some("stale")),
            Notification::Hidden
        );
    }

    #[test]
    fn dismissal_applies_only_to_failure() {
        let mut presenter = NotificationPresenter::new();
        assert_eq!(presenter.dismiss(FlowState::Submitting), DismissEffect::Ignored);
        assert_eq!(presenter.dismiss(FlowState::Success), DismissEffect::Ignored);
        assert!(!presenter.is_dismissed());

        assert_eq!(presenter.dismiss(FlowState::Failure), DismissEffect::ReturnToIdle);
        assert_eq!(
            presenter.render(FlowState::Failure, Some("Login failed")),
            Notification::Hidden
        );

        presenter.outcome_arrived();
        assert!(matches!(
            presenter.render(FlowState::Failure, Some("Login failed")),
            Notification::Message {
                tone: Tone::Error,
                dismissible: true,
                ..
            }
        ));
    }

    #[test]
    fn capture_gate_requires_open_camera() {
        assert!(!project_controls(inputs(FlowState::Idle)).capture);
        assert!(project_controls(inputs(FlowState::CameraOpen)).capture);

        let busy = ControlInputs {
            camera_busy: true,
            ..inputs(FlowState::CameraOpen)
        };
        assert!(!project_controls(busy).capture);
        assert!(!project_controls(busy).submit);
    }

    #[test]
    fn submit_gate_follows_form_and_photo_policy() {
        assert!(project_controls(inputs(FlowState::Idle)).submit);
        assert!(!project_controls(inputs(FlowState::Submitting)).submit);

        let incomplete = ControlInputs {
            form_complete: false,
            ..inputs(FlowState::Idle)
        };
        assert!(!project_controls(incomplete).submit);

        let needs_photo = ControlInputs {
            photo_required: true,
            ..inputs(FlowState::Idle)
        };
        assert!(!project_controls(needs_photo).submit);
    }

    #[test]
    fn welcome_message_names_identity() {
        assert_eq!(welcome_message("alice"), "Welcome, alice!");
    }
}
