//! Integration tests for submission guards and the single in-flight rule.

mod common;

use std::sync::Arc;

use common::{HarnessOptions, ScriptedTransport, fill_form, harness, login_harness};
use facegate_app::{FlowError, FlowSettings, IgnoreReason, SubmitDisposition};
use facegate_core::{FlowState, FormField, ValidationError};
use facegate_ui::{DismissEffect, LOADING_TEXT, Notification};
use tokio::sync::Notify;

#[tokio::test]
async fn submit_guard_tests_double_submit_sends_one_request() {
    let gate = Arc::new(Notify::new());
    let h = login_harness(ScriptedTransport::gated(200, "alice", Arc::clone(&gate)));
    fill_form(&h);

    let (first, second) = tokio::join!(h.flow.submit(), async {
        let second = h.flow.submit().await;
        gate.notify_one();
        second
    });

    assert!(matches!(first, SubmitDisposition::Completed { .. }));
    assert_eq!(second, SubmitDisposition::Ignored(IgnoreReason::InFlight));
    assert_eq!(h.transport.calls(), 1);
}

#[tokio::test]
async fn submit_guard_tests_loading_shows_only_while_submitting() {
    let gate = Arc::new(Notify::new());
    let h = login_harness(ScriptedTransport::gated(500, "", Arc::clone(&gate)));
    fill_form(&h);
    assert_eq!(h.flow.notification(), Notification::Hidden);

    let (_, during) = tokio::join!(h.flow.submit(), async {
        let during = (h.flow.state(), h.flow.notification(), h.flow.controls());
        gate.notify_one();
        during
    });

    let (state, notification, controls) = during;
    assert_eq!(state, FlowState::Submitting);
    assert_eq!(
        notification,
        Notification::Loading {
            text: LOADING_TEXT.to_string()
        }
    );
    assert!(!controls.submit);
    assert!(!controls.edit_fields);
    assert!(!matches!(h.flow.notification(), Notification::Loading { .. }));
}

#[tokio::test]
async fn submit_guard_tests_blank_field_prevents_network_call() {
    let h = login_harness(ScriptedTransport::replying(200, "alice"));
    h.flow
        .set_field(FormField::PassPhrase, "   ")
        .expect("login form has a pass phrase");

    let disposition = h.flow.submit().await;

    assert_eq!(
        disposition,
        SubmitDisposition::Invalid(ValidationError::MissingField(FormField::PassPhrase))
    );
    assert_eq!(h.transport.calls(), 0);
    assert_eq!(h.flow.state(), FlowState::Idle);
    assert!(!h.flow.controls().submit);
}

#[tokio::test]
async fn submit_guard_tests_refused_while_camera_is_opening() {
    let h = login_harness(ScriptedTransport::replying(200, "alice"));
    fill_form(&h);

    let (opened, submitted) = tokio::join!(h.flow.open_camera(), h.flow.submit());

    assert!(opened.is_ok());
    assert_eq!(
        submitted,
        SubmitDisposition::Ignored(IgnoreReason::CameraBusy)
    );
    assert_eq!(h.transport.calls(), 0);
    assert_eq!(h.flow.state(), FlowState::CameraOpen);
}

#[tokio::test]
async fn submit_guard_tests_failure_must_be_dismissed_before_retry() {
    let h = login_harness(ScriptedTransport::replying(500, ""));
    fill_form(&h);

    h.flow.submit().await;
    assert_eq!(
        h.flow.submit().await,
        SubmitDisposition::Ignored(IgnoreReason::AlreadyResolved(FlowState::Failure))
    );
    assert_eq!(h.transport.calls(), 1);

    assert_eq!(h.flow.dismiss_notification(), DismissEffect::ReturnToIdle);
    assert_eq!(h.flow.state(), FlowState::Idle);
    assert_eq!(h.flow.notification(), Notification::Hidden);

    h.flow.submit().await;
    assert_eq!(h.transport.calls(), 2);
}

#[tokio::test]
async fn submit_guard_tests_success_locks_fields_and_ignores_dismissal() {
    let h = login_harness(ScriptedTransport::replying(200, "alice"));
    fill_form(&h);
    h.flow.submit().await;

    assert_eq!(h.flow.dismiss_notification(), DismissEffect::Ignored);
    assert_eq!(h.flow.state(), FlowState::Success);
    assert!(matches!(
        h.flow.set_field(FormField::PassPhrase, "other"),
        Err(FlowError::InvalidState {
            state: FlowState::Success,
            ..
        })
    ));
    assert_eq!(
        h.flow.submit().await,
        SubmitDisposition::Ignored(IgnoreReason::AlreadyResolved(FlowState::Success))
    );
}

#[tokio::test]
async fn submit_guard_tests_required_photo_policy_blocks_request() {
    let h = harness(
        ScriptedTransport::replying(200, "alice"),
        HarnessOptions {
            settings: FlowSettings {
                require_photo: true,
                ..FlowSettings::default()
            },
            ..HarnessOptions::default()
        },
    );
    fill_form(&h);

    assert!(!h.flow.controls().submit);
    assert_eq!(
        h.flow.submit().await,
        SubmitDisposition::Invalid(ValidationError::MissingPhoto)
    );
    assert_eq!(h.transport.calls(), 0);
}

#[tokio::test]
async fn submit_guard_tests_fields_outside_the_form_are_refused() {
    let h = login_harness(ScriptedTransport::replying(200, "alice"));

    assert!(matches!(
        h.flow.set_field(FormField::Username, "alice"),
        Err(FlowError::Validation(ValidationError::FieldNotInForm { .. }))
    ));
}
