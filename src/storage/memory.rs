//! In-memory storage backend.

use super::{collect_body, stream_from_bytes, CacheBackend, CachedItem, ResponseMeta};
use crate::key::CacheKey;
use crate::{BodyStream, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

struct MemoryEntry {
    body: Bytes,
    meta: ResponseMeta,
    /// Pending eviction timer, when a TTL is configured.
    timer: Option<JoinHandle<()>>,
}

/// In-memory cache keyed by fingerprint, with optional TTL.
///
/// Expiration is timer-driven: every `set` (re)schedules a deferred eviction
/// task for the key, and `remove` cancels it.
pub struct MemoryCache {
    ttl: Option<Duration>,
    entries: Arc<Mutex<HashMap<String, MemoryEntry>>>,
}

impl MemoryCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn remove_entry(entries: &Arc<Mutex<HashMap<String, MemoryEntry>>>, key: &str) {
        if let Some(entry) = entries.lock().unwrap().remove(key) {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
        }
    }

    fn schedule_eviction(&self, key: &str) -> Option<JoinHandle<()>> {
        let ttl = self.ttl?;
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            debug!(key = %key, "memory cache entry expired");
            // Dropping the entry drops this task's own handle, which is fine:
            // drop does not abort.
            entries.lock().unwrap().remove(&key);
        }))
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedItem>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key.as_str()).map(|entry| CachedItem {
            body: stream_from_bytes(entry.body.clone()),
            meta: entry.meta.clone(),
        }))
    }

    async fn set(&self, key: &CacheKey, body: BodyStream, meta: ResponseMeta) -> Result<CachedItem> {
        let body = collect_body(body).await?;

        let timer = self.schedule_eviction(key.as_str());
        let mut entries = self.entries.lock().unwrap();
        if let Some(previous) = entries.insert(
            key.as_str().to_string(),
            MemoryEntry {
                body: body.clone(),
                meta: meta.clone(),
                timer,
            },
        ) {
            if let Some(previous_timer) = previous.timer {
                previous_timer.abort();
            }
        }

        Ok(CachedItem {
            body: stream_from_bytes(body),
            meta,
        })
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        Self::remove_entry(&self.entries, key.as_str());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
