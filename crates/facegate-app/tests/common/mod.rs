//! Shared fixtures for app integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use facegate_app::{
    AuthFlowController, FlowDependencies, FlowSettings, MemoryStore, Navigator, Route,
};
use facegate_auth::{ServiceClient, SubmitTransport, TransportFailure};
use facegate_capture::{MediaCaptureController, SyntheticCamera};
use facegate_core::{FlowKind, FormField, ServerOutcome};
use facegate_upload::TransportPayload;
use tokio::sync::Notify;
use url::Url;

/// One request as seen by a fixture transport.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Path of the endpoint hit.
    pub path: String,
    /// Part names in order.
    pub fields: Vec<&'static str>,
    /// Number of binary parts.
    pub file_parts: usize,
}

/// Transport replaying queued replies; repeats the last one when drained.
#[allow(dead_code)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<ServerOutcome, TransportFailure>>>,
    last: Mutex<Option<Result<ServerOutcome, TransportFailure>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    gate: Option<Arc<Notify>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    /// Replies with `status` and `body` to every request.
    pub fn replying(status: u16, body: &str) -> Arc<Self> {
        Self::script(vec![Ok(ServerOutcome::new(status, body))])
    }

    /// Fails every request with `failure`.
    pub fn failing(failure: TransportFailure) -> Arc<Self> {
        Self::script(vec![Err(failure)])
    }

    /// Replays `replies` in order.
    pub fn script(replies: Vec<Result<ServerOutcome, TransportFailure>>) -> Arc<Self> {
        Arc::new(Self::unshared(replies, None))
    }

    /// Replies with `status` and `body` only after `gate` is notified.
    pub fn gated(status: u16, body: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self::unshared(
            vec![Ok(ServerOutcome::new(status, body))],
            Some(gate),
        ))
    }

    /// Never replies.
    pub fn hanging() -> Arc<Self> {
        Self::gated(200, "", Arc::new(Notify::new()))
    }

    fn unshared(
        replies: Vec<Result<ServerOutcome, TransportFailure>>,
        gate: Option<Arc<Notify>>,
    ) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            gate,
        }
    }

    /// Number of requests received.
    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn next_reply(&self) -> Result<ServerOutcome, TransportFailure> {
        let mut replies = self.replies.lock().expect("replies lock");
        let mut last = self.last.lock().expect("last lock");
        if let Some(reply) = replies.pop_front() {
            *last = Some(reply);
        }
        last.clone()
            .unwrap_or_else(|| Err(TransportFailure::Network("no scripted reply".to_string())))
    }
}

#[async_trait]
impl SubmitTransport for ScriptedTransport {
    async fn post(
        &self,
        endpoint: &Url,
        payload: &TransportPayload,
    ) -> Result<ServerOutcome, TransportFailure> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(RecordedRequest {
                path: endpoint.path().to_string(),
                fields: payload.field_names(),
                file_parts: payload.file_part_count(),
            });

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.next_reply()
    }
}

/// Navigator that records every route.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    /// Routes navigated to so far.
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().expect("routes lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &Route) {
        self.routes.lock().expect("routes lock").push(route.clone());
    }
}

/// Controller wired to observable fixtures.
#[allow(dead_code)]
pub struct FlowHarness {
    /// Controller under test.
    pub flow: AuthFlowController,
    /// Transport fixture.
    pub transport: Arc<ScriptedTransport>,
    /// Camera fixture; clones share counters.
    pub camera: SyntheticCamera,
    /// Identity store.
    pub store: Arc<MemoryStore>,
    /// Navigation log.
    pub navigator: Arc<RecordingNavigator>,
}

/// Fixture options.
#[allow(dead_code)]
pub struct HarnessOptions {
    /// Form kind.
    pub kind: FlowKind,
    /// Camera fixture.
    pub camera: SyntheticCamera,
    /// Camera kill switch.
    pub camera_enabled: bool,
    /// Flow tunables.
    pub settings: FlowSettings,
    /// Submit timeout.
    pub timeout: Option<Duration>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            kind: FlowKind::Login,
            camera: SyntheticCamera::new(),
            camera_enabled: true,
            settings: FlowSettings::default(),
            timeout: None,
        }
    }
}

/// Builds a login harness over `transport` with default options.
#[allow(dead_code)]
pub fn login_harness(transport: Arc<ScriptedTransport>) -> FlowHarness {
    harness(transport, HarnessOptions::default())
}

/// Builds a registration harness over `transport` with default options.
#[allow(dead_code)]
pub fn register_harness(transport: Arc<ScriptedTransport>) -> FlowHarness {
    harness(
        transport,
        HarnessOptions {
            kind: FlowKind::Register,
            ..HarnessOptions::default()
        },
    )
}

/// Builds a harness with explicit options.
#[allow(dead_code)]
pub fn harness(transport: Arc<ScriptedTransport>, options: HarnessOptions) -> FlowHarness {
    let client = ServiceClient::new(
        "http://127.0.0.1:8000/",
        false,
        Arc::clone(&transport) as Arc<dyn SubmitTransport>,
    )
    .expect("fixture base url should be valid")
    .with_timeout(options.timeout);
    let capture = MediaCaptureController::new(Arc::new(options.camera.clone()))
        .with_enabled(options.camera_enabled);
    let store = Arc::new(MemoryStore::new());
    let navigator = Arc::new(RecordingNavigator::default());

    let flow = AuthFlowController::new(
        options.kind,
        options.settings,
        FlowDependencies {
            client,
            capture,
            store: Arc::clone(&store) as Arc<dyn facegate_app::KeyValueStore>,
            navigator: Arc::clone(&navigator) as Arc<dyn Navigator>,
        },
    );

    FlowHarness {
        flow,
        transport,
        camera: options.camera,
        store,
        navigator,
    }
}

/// Fills every field of the harness form with valid values.
#[allow(dead_code)]
pub fn fill_form(harness: &FlowHarness) {
    for field in harness.flow.kind().required_fields() {
        let value = match field {
            FormField::PassPhrase => "correct horse battery staple",
            FormField::FirstName => "Alice",
            FormField::LastName => "Liddell",
            FormField::Username => "alice",
        };
        harness
            .flow
            .set_field(*field, value)
            .expect("fixture field should belong to the form");
    }
}
