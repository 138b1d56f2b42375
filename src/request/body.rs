//! Request body kinds.
//!
//! A closed tagged union over the body representations the cache knows how
//! to fingerprint, plus [`Body::Reader`] for opaque byte streams that can be
//! sent but carry no stable identity.

use crate::BodyStream;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// The body of a [`Request`](super::Request).
pub enum Body {
    /// No body.
    Empty,
    /// A UTF-8 text body.
    Text(String),
    /// URL-encoded form fields, sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// A body streamed from a file. Cache identity is the path, not the
    /// file's content.
    FilePath(PathBuf),
    /// A multipart form. Cache identity ignores the boundary token.
    Multipart(MultipartForm),
    /// A raw byte buffer.
    Bytes(Bytes),
    /// An opaque byte stream. Sendable exactly once, but there is nothing
    /// stable to fingerprint, so key derivation rejects it.
    Reader(Mutex<Option<BodyStream>>),
}

impl Body {
    /// Wrap an opaque byte stream as a body.
    pub fn reader(stream: BodyStream) -> Self {
        Body::Reader(Mutex::new(Some(stream)))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Body::Text(text.into())
    }

    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Body::Bytes(bytes.into())
    }

    pub fn file_path(path: impl Into<PathBuf>) -> Self {
        Body::FilePath(path.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Text(t) => f.debug_tuple("Body::Text").field(t).finish(),
            Body::Form(fields) => f.debug_tuple("Body::Form").field(fields).finish(),
            Body::FilePath(p) => f.debug_tuple("Body::FilePath").field(p).finish(),
            Body::Multipart(m) => f.debug_tuple("Body::Multipart").field(m).finish(),
            Body::Bytes(b) => f
                .debug_tuple("Body::Bytes")
                .field(&format_args!("{} bytes", b.len()))
                .finish(),
            Body::Reader(_) => f.write_str("Body::Reader(..)"),
        }
    }
}

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

/// A multipart form body.
///
/// The boundary token is part of the wire format only. Two forms with the
/// same fields and different boundaries derive the same cache key.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    fields: Vec<MultipartField>,
}

impl MultipartForm {
    /// Create an empty form with a generated boundary.
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u64)
            .unwrap_or(0);
        let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            boundary: format!("----fetch-cache-{:x}{:x}", nanos, seq),
            fields: Vec::new(),
        }
    }

    /// Create an empty form with an explicit boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            fields: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn fields(&self) -> &[MultipartField] {
        &self.fields
    }

    /// Append a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(MultipartField {
            name: name.into(),
            filename: None,
            content_type: None,
            value: FieldValue::Text(value.into()),
        });
        self
    }

    /// Append a prepared field.
    pub fn part(mut self, field: MultipartField) -> Self {
        self.fields.push(field);
        self
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone)]
pub struct MultipartField {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub value: FieldValue,
}

impl MultipartField {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            value,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// The payload of a multipart field.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    Bytes(Bytes),
    FilePath(PathBuf),
}
