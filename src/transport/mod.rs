//! The fetch primitive consumed by the orchestrator.
//!
//! The cache treats the wire as opaque: a [`Transport`] takes a request
//! descriptor and yields status, headers, and a body stream. Connection
//! pooling, redirects, and TLS all live behind this boundary.

pub mod http;

pub use http::{HttpTransport, TransportError};

use crate::request::Request;
use crate::storage::ResponseMeta;
use crate::{BodyStream, Result};
use async_trait::async_trait;

/// What a fetch yields: serialized response metadata plus the live body
/// stream.
pub struct FetchedResponse {
    pub meta: ResponseMeta,
    pub body: BodyStream,
}

/// An opaque fetch primitive.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse>;
}
