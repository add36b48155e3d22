#![warn(missing_docs)]
//! # facegate-upload
//!
//! ## Purpose
//! Builds the multipart transport payload for enrollment or authentication.
//!
//! ## Responsibilities
//! - Lay out credential fields in stable wire order, followed by at most one
//!   binary `photo` part.
//! - Derive the multipart boundary from the content itself so identical inputs
//!   yield byte-identical payloads.
//! - Keep a manifest of parts for inspection without re-parsing the body.
//!
//! ## Data flow
//! Validated [`Credentials`] + optional [`PhotoPayload`] ->
//! [`encode_submission`] -> [`TransportPayload`] handed to the service client.
//!
//! ## Ownership and lifetimes
//! The payload owns its body buffer, so transports may send it after the form
//! state that produced it has moved on.
//!
//! ## Error model
//! Encoding is infallible: credentials are validated upstream and a missing
//! photo is valid input. Whether the server accepts it is the server's call.
//!
//! ## Security and privacy notes
//! `Debug` for [`TransportPayload`] prints part names and sizes only.
//!
//! ## Example
//! ```rust
//! use facegate_core::{Credentials, LoginCredentials};
//! use facegate_upload::encode_submission;
//!
//! let credentials = Credentials::Login(LoginCredentials::new("open sesame").unwrap());
//! let payload = encode_submission(&credentials, None);
//! assert_eq!(payload.field_names(), vec!["pass_phrase"]);
//! assert!(payload.content_type().starts_with("multipart/form-data; boundary="));
//! ```

use std::fmt;

use facegate_core::{Credentials, FlowKind, PhotoPayload};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Multipart field name of the binary image part.
pub const PHOTO_FIELD: &str = "photo";

/// Prefix of every generated boundary.
pub const BOUNDARY_PREFIX: &str = "facegate-";

const BOUNDARY_DIGEST_CHARS: usize = 32;

/// Content of one multipart part.
#[derive(Clone, PartialEq, Eq)]
pub enum PartValue {
    /// Plain text field.
    Text(String),
    /// Binary file part.
    File {
        /// File name as sent (after header sanitizing).
        file_name: String,
        /// MIME type of the file.
        content_type: String,
        /// Byte length of the file content.
        len: usize,
    },
}

impl fmt::Debug for PartValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartValue::Text(value) => f.debug_tuple("Text").field(&value.len()).finish(),
            PartValue::File {
                file_name,
                content_type,
                len,
            } => f
                .debug_struct("File")
                .field("file_name", file_name)
                .field("content_type", content_type)
                .field("len", len)
                .finish(),
        }
    }
}

/// Manifest entry for one encoded part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Multipart field name.
    pub name: &'static str,
    /// Part content summary.
    pub value: PartValue,
}

/// Encoded multipart request body plus its metadata.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportPayload {
    kind: FlowKind,
    boundary: String,
    parts: Vec<Part>,
    body: Vec<u8>,
}

impl TransportPayload {
    /// Flow the payload was built for.
    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    /// Multipart boundary.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `Content-Type` header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encoded body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Part manifest in wire order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Field names in wire order.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.parts.iter().map(|part| part.name).collect()
    }

    /// Value of a text field, if present.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match &part.value {
            PartValue::Text(value) if part.name == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Number of binary parts.
    pub fn file_part_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part.value, PartValue::File { .. }))
            .count()
    }
}

impl fmt::Debug for TransportPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportPayload")
            .field("kind", &self.kind)
            .field("boundary", &self.boundary)
            .field("fields", &self.field_names())
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Encodes credentials and an optional photo as `multipart/form-data`.
///
/// # Semantics
/// - Login: `pass_phrase`, then `photo` when present.
/// - Register: `first_name`, `last_name`, `username`, `pass_phrase`, then
///   `photo` when present.
///
/// Deterministic: identical inputs (photo bytes included) produce identical
/// boundaries and bodies.
pub fn encode_submission(credentials: &Credentials, photo: Option<&PhotoPayload>) -> TransportPayload {
    let fields = credentials.fields();
    let boundary = derive_boundary(credentials.kind(), &fields, photo);

    let mut parts = Vec::with_capacity(fields.len() + 1);
    let mut body = Vec::new();

    for &(name, value) in &fields {
        write_part_header(&mut body, &boundary, name, None);
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
        parts.push(Part {
            name,
            value: PartValue::Text(value.to_string()),
        });
    }

    if let Some(photo) = photo {
        let file_name = sanitize_header_value(photo.file_name());
        write_part_header(
            &mut body,
            &boundary,
            PHOTO_FIELD,
            Some((file_name.as_str(), photo.content_type())),
        );
        body.extend_from_slice(photo.bytes());
        body.extend_from_slice(b"\r\n");
        parts.push(Part {
            name: PHOTO_FIELD,
            value: PartValue::File {
                file_name,
                content_type: photo.content_type().to_string(),
                len: photo.bytes().len(),
            },
        });
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    debug!(
        stage = "upload",
        action = "encode",
        kind = %credentials.kind(),
        parts = parts.len(),
        photo = photo.is_some(),
        body_bytes = body.len(),
        "multipart submission encoded"
    );

    TransportPayload {
        kind: credentials.kind(),
        boundary,
        parts,
        body,
    }
}

fn write_part_header(
    body: &mut Vec<u8>,
    boundary: &str,
    name: &str,
    file: Option<(&str, &str)>,
) {
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    match file {
        Some((file_name, content_type)) => {
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        }
        None => {
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
        }
    }
}

fn derive_boundary(
    kind: FlowKind,
    fields: &[(&'static str, &str)],
    photo: Option<&PhotoPayload>,
) -> String {
    first_free_boundary(
        |salt| salted_boundary(kind, fields, photo, salt),
        |boundary| content_contains(fields, photo, boundary),
    )
}

/// Returns the first salted candidate that does not occur in the content.
fn first_free_boundary(
    candidate: impl Fn(u32) -> String,
    occurs_in_content: impl Fn(&str) -> bool,
) -> String {
    let mut salt = 0_u32;
    loop {
        let boundary = candidate(salt);
        // Invariant: the delimiter must not occur inside any part content.
        if !occurs_in_content(&boundary) {
            return boundary;
        }
        salt += 1;
    }
}

fn salted_boundary(
    kind: FlowKind,
    fields: &[(&'static str, &str)],
    photo: Option<&PhotoPayload>,
    salt: u32,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.to_string().as_bytes());
    for (name, value) in fields {
        hash_chunk(&mut hasher, name.as_bytes());
        hash_chunk(&mut hasher, value.as_bytes());
    }
    if let Some(photo) = photo {
        hash_chunk(&mut hasher, photo.file_name().as_bytes());
        hash_chunk(&mut hasher, photo.content_type().as_bytes());
        hash_chunk(&mut hasher, photo.bytes());
    }
    hasher.update(salt.to_be_bytes());

    let digest = hex::encode(hasher.finalize());
    format!("{BOUNDARY_PREFIX}{}", &digest[..BOUNDARY_DIGEST_CHARS])
}

fn content_contains(
    fields: &[(&'static str, &str)],
    photo: Option<&PhotoPayload>,
    boundary: &str,
) -> bool {
    fields
        .iter()
        .any(|(_, value)| contains(value.as_bytes(), boundary.as_bytes()))
        || photo.is_some_and(|photo| contains(photo.bytes(), boundary.as_bytes()))
}

fn hash_chunk(hasher: &mut Sha256, chunk: &[u8]) {
    hasher.update((chunk.len() as u64).to_be_bytes());
    hasher.update(chunk);
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn sanitize_header_value(raw: &str) -> String {
    raw.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
