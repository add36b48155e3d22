//! Destinations the flow controller navigates to.

use std::fmt;

use facegate_core::FlowKind;
use facegate_ui::welcome_message;

/// Application route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Identity-scoped welcome view.
    Welcome {
        /// Identity returned by the service.
        identity: String,
    },
    /// Login form.
    Login,
    /// Registration form.
    Register,
}

impl Route {
    /// Entry route of a form kind.
    pub fn entry(kind: FlowKind) -> Self {
        match kind {
            FlowKind::Login => Route::Login,
            FlowKind::Register => Route::Register,
        }
    }

    /// Link shown under a form, pointing at the other form.
    pub fn alternate(kind: FlowKind) -> Self {
        match kind {
            FlowKind::Login => Route::Register,
            FlowKind::Register => Route::Login,
        }
    }

    /// URL path of the route.
    pub fn path(&self) -> String {
        match self {
            Route::Welcome { identity } => format!("/welcome/{}", encode_segment(identity)),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Performs navigation on behalf of the flow controller.
pub trait Navigator {
    /// Leaves the current form for `route`.
    fn navigate(&self, route: &Route);
}

/// Navigator for the command-line shell: prints the destination view.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: &Route) {
        match route {
            Route::Welcome { identity } => println!("{}", welcome_message(identity)),
            Route::Login => println!("Continue at {route}: facegate login"),
            Route::Register => println!("Continue at {route}: facegate register"),
        }
    }
}

fn encode_segment(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}
