//! The cache orchestrator.
//!
//! Ties the pieces together: derive the key, check storage, and on a miss
//! run exactly one fetch-and-populate per key under the single-flight lock.

mod builder;

pub use builder::FetchCacheBuilder;

use crate::key::{compute_cache_key, CacheKey, KeyOptions};
use crate::request::Request;
use crate::response::CachedResponse;
use crate::singleflight::KeyLock;
use crate::storage::{CacheBackend, CachedItem};
use crate::transport::Transport;
use crate::Result;
use std::sync::Arc;
use tracing::debug;

/// A fetch function with a cache in front of it.
///
/// Key-derivation options are fixed per instance; every call made through
/// one `FetchCache` uses the same [`KeyOptions`].
pub struct FetchCache {
    backend: Arc<dyn CacheBackend>,
    transport: Arc<dyn Transport>,
    key_options: KeyOptions,
    locks: KeyLock,
}

impl FetchCache {
    pub fn builder() -> FetchCacheBuilder {
        FetchCacheBuilder::new()
    }

    pub(crate) fn new(
        backend: Arc<dyn CacheBackend>,
        transport: Arc<dyn Transport>,
        key_options: KeyOptions,
    ) -> Self {
        Self {
            backend,
            transport,
            key_options,
            locks: KeyLock::new(),
        }
    }

    /// The key this instance derives for a request, for pre-checking
    /// presence via [`CacheBackend::get`] without triggering a fetch.
    pub fn cache_key(&self, request: &Request) -> Result<CacheKey> {
        compute_cache_key(request, &self.key_options)
    }

    /// The storage backend behind this instance.
    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Serve the request from cache, or fetch and populate.
    ///
    /// `Ok(None)` is the cache-only miss: the request declared
    /// only-if-cached semantics and no entry was stored. Every other outcome
    /// is a response or an error.
    pub async fn fetch(&self, request: &Request) -> Result<Option<CachedResponse>> {
        let key = self.cache_key(request)?;

        if let Some(item) = self.backend.get(&key).await? {
            debug!(key = %key, "cache hit");
            return Ok(Some(self.wrap(item, key, true)));
        }

        if request.is_only_if_cached() {
            debug!(key = %key, "cache-only request missed, skipping network");
            return Ok(None);
        }

        // The guard is held for the rest of the call; dropping it on any
        // exit path (including errors below) releases the key.
        let _guard = self.locks.acquire(key.as_str()).await;

        // A concurrent caller may have populated the entry while we waited.
        if let Some(item) = self.backend.get(&key).await? {
            debug!(key = %key, "cache hit after lock");
            return Ok(Some(self.wrap(item, key, true)));
        }

        debug!(key = %key, url = %request.url, "cache miss, fetching");
        let fetched = self.transport.fetch(request).await?;
        let stored = self.backend.set(&key, fetched.body, fetched.meta).await?;
        Ok(Some(self.wrap(stored, key, false)))
    }

    fn wrap(&self, item: CachedItem, key: CacheKey, from_cache: bool) -> CachedResponse {
        CachedResponse::new(item, key, Arc::clone(&self.backend), from_cache)
    }
}
