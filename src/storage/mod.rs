//! Storage backends.
//!
//! A backend owns the persisted bytes of every cache entry and hands out
//! freshly-readable views on `get` and `set`. Absence and expiry are
//! `Ok(None)`, never errors.

pub mod blob;
pub mod filesystem;
pub mod memory;

use crate::key::CacheKey;
use crate::{BodyStream, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response metadata stored alongside a cached body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// Header name to values, name-sorted for stable serialization.
    pub headers: BTreeMap<String, Vec<String>>,
    /// Declared body size from the response, when known.
    pub size: Option<u64>,
    /// How many redirects the transport followed to reach the final URL.
    pub redirect_count: u32,
}

/// A stored entry as returned by a backend: a readable body stream plus its
/// metadata.
pub struct CachedItem {
    pub body: BodyStream,
    pub meta: ResponseMeta,
}

/// Uniform contract over the concrete storage backends.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Look up an entry. `None` when absent or past expiration.
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedItem>>;

    /// Drain the body, durably store it with the metadata, and return a
    /// freshly-readable view of exactly what was stored.
    async fn set(&self, key: &CacheKey, body: BodyStream, meta: ResponseMeta) -> Result<CachedItem>;

    /// Delete an entry. Idempotent: removing an absent key succeeds.
    async fn remove(&self, key: &CacheKey) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Drain a body stream into a contiguous buffer.
pub(crate) async fn collect_body(mut stream: BodyStream) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// A one-shot stream over an in-memory buffer.
pub(crate) fn stream_from_bytes(bytes: Bytes) -> BodyStream {
    Box::pin(futures::stream::once(async move { Ok(bytes) }))
}

/// A stream that yields nothing, for entries stored with an empty body.
pub(crate) fn empty_stream() -> BodyStream {
    Box::pin(futures::stream::empty())
}
