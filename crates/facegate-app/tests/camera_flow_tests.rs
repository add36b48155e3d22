//! Integration tests for camera sessions driven through the flow controller.

mod common;

use common::{HarnessOptions, ScriptedTransport, fill_form, harness, login_harness};
use facegate_app::FlowError;
use facegate_capture::{CaptureError, SyntheticCamera};
use facegate_core::{FlowState, PhotoPayload};

#[tokio::test]
async fn camera_flow_tests_capture_attaches_photo_and_releases_device() {
    let h = login_harness(ScriptedTransport::replying(200, "alice"));
    fill_form(&h);

    h.flow.open_camera().await.expect("synthetic camera opens");
    assert_eq!(h.flow.state(), FlowState::CameraOpen);
    assert_eq!(h.camera.stats().open_streams, 1);
    assert!(h.flow.controls().capture);

    h.flow.capture().await.expect("frame captures");
    assert_eq!(h.flow.state(), FlowState::PhotoCaptured);
    assert_eq!(h.camera.stats().open_streams, 0);
    assert!(h.flow.snapshot().photo_attached);

    h.flow.submit().await;
    let requests = h.transport.requests();
    assert_eq!(requests[0].fields, vec!["pass_phrase", "photo"]);
    assert_eq!(requests[0].file_parts, 1);
}

#[tokio::test]
async fn camera_flow_tests_denied_permission_leaves_state_unchanged() {
    let h = harness(
        ScriptedTransport::replying(200, "alice"),
        HarnessOptions {
            camera: SyntheticCamera::new().denying("permission denied"),
            ..HarnessOptions::default()
        },
    );

    let error = h.flow.open_camera().await.expect_err("denied camera fails");
    assert!(matches!(
        error,
        FlowError::Capture(CaptureError::DeviceUnavailable(_))
    ));
    assert_eq!(h.flow.state(), FlowState::Idle);
    assert!(h.flow.controls().open_camera);
}

#[tokio::test]
async fn camera_flow_tests_kill_switch_disables_camera_controls() {
    let h = harness(
        ScriptedTransport::replying(200, "alice"),
        HarnessOptions {
            camera_enabled: false,
            ..HarnessOptions::default()
        },
    );

    assert!(!h.flow.controls().open_camera);
    assert!(matches!(
        h.flow.open_camera().await,
        Err(FlowError::Capture(CaptureError::DeviceUnavailable(_)))
    ));
    assert_eq!(h.camera.stats().acquisitions, 0);
    assert_eq!(h.flow.state(), FlowState::Idle);
}

#[tokio::test]
async fn camera_flow_tests_stream_loss_returns_to_idle_and_releases() {
    let h = harness(
        ScriptedTransport::replying(200, "alice"),
        HarnessOptions {
            camera: SyntheticCamera::new().losing_stream_after(0),
            ..HarnessOptions::default()
        },
    );

    h.flow.open_camera().await.expect("synthetic camera opens");
    let error = h.flow.capture().await.expect_err("stream is gone");

    assert!(matches!(error, FlowError::Capture(CaptureError::StreamLost(_))));
    assert_eq!(h.flow.state(), FlowState::Idle);
    assert_eq!(h.camera.stats().open_streams, 0);
    assert_eq!(h.camera.stats().releases, 1);
    assert!(!h.flow.snapshot().photo_attached);
}

#[tokio::test]
async fn camera_flow_tests_capture_requires_open_session() {
    let h = login_harness(ScriptedTransport::replying(200, "alice"));

    assert!(matches!(
        h.flow.capture().await,
        Err(FlowError::InvalidState {
            state: FlowState::Idle,
            ..
        })
    ));
}

#[tokio::test]
async fn camera_flow_tests_selecting_file_closes_session() {
    let h = login_harness(ScriptedTransport::replying(200, "alice"));

    h.flow.open_camera().await.expect("synthetic camera opens");
    h.flow
        .select_file(PhotoPayload::from_file("me.png", vec![1, 2, 3]).expect("photo"))
        .expect("file selection is allowed with an open camera");

    let snapshot = h.flow.snapshot();
    assert_eq!(snapshot.state, FlowState::Idle);
    assert!(snapshot.photo_attached);
    assert!(!snapshot.camera_open);
    assert_eq!(h.camera.stats().open_streams, 0);
}

#[tokio::test]
async fn camera_flow_tests_submit_closes_open_session() {
    let h = login_harness(ScriptedTransport::replying(200, "alice"));
    fill_form(&h);

    h.flow.open_camera().await.expect("synthetic camera opens");
    h.flow.submit().await;

    assert_eq!(h.camera.stats().open_streams, 0);
    assert_eq!(h.transport.requests()[0].fields, vec!["pass_phrase"]);
}

#[tokio::test]
async fn camera_flow_tests_teardown_releases_device() {
    let h = login_harness(ScriptedTransport::replying(200, "alice"));

    h.flow.open_camera().await.expect("synthetic camera opens");
    h.flow.teardown();

    assert_eq!(h.camera.stats().open_streams, 0);
    assert!(matches!(h.flow.open_camera().await, Err(FlowError::TornDown)));
}
