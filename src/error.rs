use thiserror::Error;

/// Unified error type for the library.
///
/// "Not found" and "expired" are never errors; backends report those as
/// `Ok(None)` and the orchestrator reports an only-if-cached miss the same
/// way.
#[derive(Debug, Error)]
pub enum Error {
    /// The request body is not one of the representations a cache key can be
    /// derived from.
    #[error(
        "Unsupported body kind for cache-key derivation. Supported kinds are: \
         empty, text, url-encoded form, file path, multipart form, raw bytes"
    )]
    UnsupportedBodyKind,

    /// The underlying fetch primitive failed. Propagated unchanged; no retry
    /// is performed by this crate.
    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// A backend read or write failed for a reason other than absence.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// A second consumption attempt on a response body.
    #[error("Response body has already been consumed")]
    BodyAlreadyConsumed,

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage {
            message: msg.into(),
        }
    }
}
