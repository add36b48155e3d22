#![warn(missing_docs)]
//! # facegate-core
//!
//! ## Purpose
//! Defines the pure data model shared by every `facegate` crate.
//!
//! ## Responsibilities
//! - Represent typed login/registration credentials, validated at construction.
//! - Represent raw camera frames and the single photo payload a form carries.
//! - Define the flow state enum and the classified server outcome types.
//!
//! ## Data flow
//! Form edits land in [`CredentialsDraft`]. At submit time the draft is
//! validated into [`Credentials`] and paired with an optional
//! [`PhotoPayload`]. The server reply is captured as [`ServerOutcome`] and
//! reduced into a [`Resolution`] that drives [`FlowState`].
//!
//! ## Ownership and lifetimes
//! Credentials, frames and photos own their buffers (`String`/`Vec<u8>`), so
//! they can cross await points without borrowing from form state.
//!
//! ## Error model
//! Validation failures return [`ValidationError`]; shape and content errors for
//! frames and photos return [`CoreError`].
//!
//! ## Security and privacy notes
//! `Debug` for credential types never prints the pass phrase.
//!
//! ## Example
//! ```rust
//! use facegate_core::{CredentialsDraft, FlowKind, FormField};
//!
//! let mut draft = CredentialsDraft::new(FlowKind::Login);
//! draft.set(FormField::PassPhrase, "open sesame").unwrap();
//! let credentials = draft.validate().unwrap();
//! assert_eq!(credentials.kind(), FlowKind::Login);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body text the service returns with HTTP 200 when the pass phrase is wrong.
pub const REJECTION_SENTINEL: &str = "Wrong passphrase";

/// File name attached to frames captured from the camera.
pub const CAPTURED_FILE_NAME: &str = "capture.png";

/// Content type of captured frames.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Which form a flow instance drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    /// Authenticate an existing user.
    Login,
    /// Enroll a new user.
    Register,
}

impl FlowKind {
    /// Fields the form must carry, in wire order.
    pub fn required_fields(self) -> &'static [FormField] {
        match self {
            FlowKind::Login => &[FormField::PassPhrase],
            FlowKind::Register => &[
                FormField::FirstName,
                FormField::LastName,
                FormField::Username,
                FormField::PassPhrase,
            ],
        }
    }

    /// Returns `true` when `field` belongs to this form.
    pub fn has_field(self, field: FormField) -> bool {
        self.required_fields().contains(&field)
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowKind::Login => f.write_str("login"),
            FlowKind::Register => f.write_str("register"),
        }
    }
}

/// Text inputs a form can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormField {
    /// Secret phrase (both forms).
    PassPhrase,
    /// Given name (registration).
    FirstName,
    /// Family name (registration).
    LastName,
    /// Account name (registration).
    Username,
}

impl FormField {
    /// Multipart field name used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            FormField::PassPhrase => "pass_phrase",
            FormField::FirstName => "first_name",
            FormField::LastName => "last_name",
            FormField::Username => "username",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            FormField::PassPhrase => "Pass Phrase",
            FormField::FirstName => "First Name",
            FormField::LastName => "Last Name",
            FormField::Username => "Username",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Validated login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pass_phrase: String,
}

impl LoginCredentials {
    /// Creates validated login credentials.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingField`] when the pass phrase is blank.
    pub fn new(pass_phrase: impl Into<String>) -> Result<Self, ValidationError> {
        let pass_phrase = require(FormField::PassPhrase, pass_phrase.into())?;
        Ok(Self { pass_phrase })
    }

    /// Secret phrase as entered.
    pub fn pass_phrase(&self) -> &str {
        &self.pass_phrase
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("pass_phrase", &"<redacted>")
            .finish()
    }
}

/// Validated registration credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationCredentials {
    first_name: String,
    last_name: String,
    username: String,
    pass_phrase: String,
}

impl RegistrationCredentials {
    /// Creates validated registration credentials.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingField`] for the first blank field in
    /// wire order.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        username: impl Into<String>,
        pass_phrase: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            first_name: require(FormField::FirstName, first_name.into())?,
            last_name: require(FormField::LastName, last_name.into())?,
            username: require(FormField::Username, username.into())?,
            pass_phrase: require(FormField::PassPhrase, pass_phrase.into())?,
        })
    }

    /// Given name.
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Family name.
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Requested account name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Secret phrase as entered.
    pub fn pass_phrase(&self) -> &str {
        &self.pass_phrase
    }
}

impl fmt::Debug for RegistrationCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationCredentials")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("username", &self.username)
            .field("pass_phrase", &"<redacted>")
            .finish()
    }
}

/// Credentials tagged by flow kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Login form values.
    Login(LoginCredentials),
    /// Registration form values.
    Register(RegistrationCredentials),
}

impl Credentials {
    /// Flow the credentials belong to.
    pub fn kind(&self) -> FlowKind {
        match self {
            Credentials::Login(_) => FlowKind::Login,
            Credentials::Register(_) => FlowKind::Register,
        }
    }

    /// Text fields as `(wire name, value)` pairs in wire order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            Credentials::Login(login) => {
                vec![(FormField::PassPhrase.wire_name(), login.pass_phrase())]
            }
            Credentials::Register(register) => vec![
                (FormField::FirstName.wire_name(), register.first_name()),
                (FormField::LastName.wire_name(), register.last_name()),
                (FormField::Username.wire_name(), register.username()),
                (FormField::PassPhrase.wire_name(), register.pass_phrase()),
            ],
        }
    }
}

/// Mutable form values edited before submission.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialsDraft {
    kind: FlowKind,
    pass_phrase: String,
    first_name: String,
    last_name: String,
    username: String,
}

impl CredentialsDraft {
    /// Creates an empty draft for `kind`.
    pub fn new(kind: FlowKind) -> Self {
        Self {
            kind,
            pass_phrase: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            username: String::new(),
        }
    }

    /// Flow the draft belongs to.
    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    /// Replaces the value of one field.
    ///
    /// # Errors
    /// Returns [`ValidationError::FieldNotInForm`] when `field` is not part of
    /// this draft's form.
    pub fn set(&mut self, field: FormField, value: impl Into<String>) -> Result<(), ValidationError> {
        if !self.kind.has_field(field) {
            return Err(ValidationError::FieldNotInForm {
                field,
                kind: self.kind,
            });
        }

        *self.slot_mut(field) = value.into();
        Ok(())
    }

    /// Current value of one field (empty when unset or not in the form).
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::PassPhrase => &self.pass_phrase,
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Username => &self.username,
        }
    }

    /// Returns `true` when every required field is non-blank.
    pub fn is_complete(&self) -> bool {
        self.kind
            .required_fields()
            .iter()
            .all(|field| !self.get(*field).trim().is_empty())
    }

    /// Validates the draft into typed credentials.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingField`] for the first blank required
    /// field.
    pub fn validate(&self) -> Result<Credentials, ValidationError> {
        match self.kind {
            FlowKind::Login => Ok(Credentials::Login(LoginCredentials::new(
                self.pass_phrase.clone(),
            )?)),
            FlowKind::Register => Ok(Credentials::Register(RegistrationCredentials::new(
                self.first_name.clone(),
                self.last_name.clone(),
                self.username.clone(),
                self.pass_phrase.clone(),
            )?)),
        }
    }

    fn slot_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::PassPhrase => &mut self.pass_phrase,
            FormField::FirstName => &mut self.first_name,
            FormField::LastName => &mut self.last_name,
            FormField::Username => &mut self.username,
        }
    }
}

impl fmt::Debug for CredentialsDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsDraft")
            .field("kind", &self.kind)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("username", &self.username)
            .field("pass_phrase_len", &self.pass_phrase.len())
            .finish()
    }
}

/// One raw frame read from a camera stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw RGBA pixel buffer (`width * height * 4` bytes).
    pub rgba: Vec<u8>,
}

impl Frame {
    /// Constructs a validated frame.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidFrameShape`] when the pixel buffer length is
    /// not exactly `width * height * 4`, and [`CoreError::EmptyFrame`] for a
    /// zero-sized frame.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, CoreError> {
        if width == 0 || height == 0 {
            return Err(CoreError::EmptyFrame);
        }

        let expected_len = required_rgba_len(width, height)?;
        if rgba.len() != expected_len {
            return Err(CoreError::InvalidFrameShape {
                expected: expected_len,
                actual: rgba.len(),
            });
        }

        Ok(Self {
            width,
            height,
            rgba,
        })
    }
}

/// Where a photo payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhotoSource {
    /// Frame captured from the live camera and PNG-encoded.
    Captured,
    /// File chosen by the user.
    File,
}

/// The single image a form submits.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoPayload {
    source: PhotoSource,
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl PhotoPayload {
    /// Wraps PNG bytes produced from a captured frame.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyPhoto`] when `png` is empty.
    pub fn captured_png(png: Vec<u8>) -> Result<Self, CoreError> {
        if png.is_empty() {
            return Err(CoreError::EmptyPhoto);
        }

        Ok(Self {
            source: PhotoSource::Captured,
            file_name: CAPTURED_FILE_NAME.to_string(),
            content_type: PNG_CONTENT_TYPE.to_string(),
            bytes: png,
        })
    }

    /// Wraps a user-selected file; content type is inferred from its name.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyPhoto`] when `bytes` is empty.
    pub fn from_file(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::EmptyPhoto);
        }

        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Ok(Self {
            source: PhotoSource::File,
            file_name,
            content_type,
            bytes,
        })
    }

    /// Payload origin.
    pub fn source(&self) -> PhotoSource {
        self.source
    }

    /// File name sent in the multipart part.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// MIME type sent in the multipart part.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Encoded image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for PhotoPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoPayload")
            .field("source", &self.source)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Infers an image MIME type from a file name extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => PNG_CONTENT_TYPE,
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// State of one form instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    /// Waiting for input.
    Idle,
    /// A camera session is live.
    CameraOpen,
    /// A frame has been captured and encoded.
    PhotoCaptured,
    /// A submission is in flight.
    Submitting,
    /// The service accepted the submission.
    Success,
    /// The submission failed or was rejected.
    Failure,
}

/// Coarse HTTP status class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpStatusClass {
    /// 1xx.
    Informational,
    /// 2xx.
    Success,
    /// 3xx.
    Redirection,
    /// 4xx.
    ClientError,
    /// 5xx.
    ServerError,
    /// Outside 100..=599.
    Unknown,
}

impl HttpStatusClass {
    /// Classifies a numeric status code.
    pub fn from_code(code: u16) -> Self {
        match code {
            100..=199 => HttpStatusClass::Informational,
            200..=299 => HttpStatusClass::Success,
            300..=399 => HttpStatusClass::Redirection,
            400..=499 => HttpStatusClass::ClientError,
            500..=599 => HttpStatusClass::ServerError,
            _ => HttpStatusClass::Unknown,
        }
    }
}

/// Raw reply from the service: status plus body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerOutcome {
    /// Numeric HTTP status.
    pub status_code: u16,
    /// Status class derived from `status_code`.
    pub status: HttpStatusClass,
    /// Response body decoded as text.
    pub body_text: String,
}

impl ServerOutcome {
    /// Builds an outcome, deriving the status class.
    pub fn new(status_code: u16, body_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status: HttpStatusClass::from_code(status_code),
            body_text: body_text.into(),
        }
    }

    /// Returns `true` for 2xx replies.
    pub fn is_success(&self) -> bool {
        self.status == HttpStatusClass::Success
    }
}

/// Why a submission did not reach a usable answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection or I/O failure.
    Network(String),
    /// Non-2xx status without a usable reason.
    Status(u16),
    /// Reply could not be interpreted.
    Malformed(String),
    /// No reply within the configured timeout.
    TimedOut,
}

/// Submission result reduced for the flow controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Login accepted; carries the opaque identity returned by the service.
    Authenticated(String),
    /// Registration accepted; carries the informational reply.
    Registered(String),
    /// The service rejected the credentials; carries its reason verbatim.
    Rejected(String),
    /// The service could not be reached or answered unusably.
    TransportError(TransportErrorKind),
}

impl Resolution {
    /// Returns `true` for accepted submissions.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Resolution::Authenticated(_) | Resolution::Registered(_)
        )
    }
}

/// Client-side validation failure. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is blank.
    #[error("{0} is required")]
    MissingField(FormField),
    /// The field does not exist on this form.
    #[error("{field} is not part of the {kind} form")]
    FieldNotInForm {
        /// Offending field.
        field: FormField,
        /// Form kind.
        kind: FlowKind,
    },
    /// Policy requires a photo and none is attached.
    #[error("a photo is required")]
    MissingPhoto,
}

/// Error type for frame and photo construction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Frame buffer shape does not match declared geometry.
    #[error("invalid frame shape: expected {expected} bytes, got {actual}")]
    InvalidFrameShape {
        /// Expected RGBA byte count.
        expected: usize,
        /// Actual RGBA byte count.
        actual: usize,
    },
    /// Frame has zero width or height.
    #[error("frame has no pixels")]
    EmptyFrame,
    /// Frame dimensions overflow addressable memory.
    #[error("frame dimensions overflow")]
    DimensionOverflow,
    /// Photo payload has no bytes.
    #[error("photo payload is empty")]
    EmptyPhoto,
}

fn require(field: FormField, value: String) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value)
}

fn required_rgba_len(width: u32, height: u32) -> Result<usize, CoreError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(CoreError::DimensionOverflow)
}
