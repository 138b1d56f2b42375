//! On-disk storage backend over a content-addressed blob store.

use super::blob::{BlobStore, FsBlobStore};
use super::{collect_body, empty_stream, CacheBackend, CachedItem, ResponseMeta};
use crate::key::CacheKey;
use crate::{BodyStream, Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// The metadata blob stored under `<key>meta`.
#[derive(Debug, Serialize, Deserialize)]
struct MetaRecord {
    meta: ResponseMeta,
    /// Absolute expiration, epoch millis. Absent when no TTL is configured.
    expiration: Option<u64>,
    /// Marks an entry whose body was zero bytes; distinguishes "stored and
    /// empty" from "absent".
    empty_body: bool,
    /// Content digest of the body blob, when there is one.
    body_digest: Option<String>,
}

/// Filesystem cache: two logical sub-keys per entry (`<key>body`,
/// `<key>meta`), bodies deduplicated by content digest, expiration checked
/// lazily at read time.
pub struct FileSystemCache {
    ttl: Option<Duration>,
    store: Arc<dyn BlobStore>,
}

impl FileSystemCache {
    /// Cache rooted at the given directory, without TTL.
    pub fn new(cache_directory: impl Into<PathBuf>) -> Self {
        Self {
            ttl: None,
            store: Arc::new(FsBlobStore::new(cache_directory)),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Cache over an injected blob store.
    pub fn with_store(store: Arc<dyn BlobStore>, ttl: Option<Duration>) -> Self {
        Self { ttl, store }
    }
}

fn body_and_meta_keys(key: &CacheKey) -> (String, String) {
    (format!("{}body", key), format!("{}meta", key))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl CacheBackend for FileSystemCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedItem>> {
        let (_, meta_key) = body_and_meta_keys(key);

        let Some(info) = self.store.info(&meta_key).await? else {
            return Ok(None);
        };
        let Some(meta_body) = self.store.get_by_digest(&info.digest).await? else {
            return Ok(None);
        };
        let meta_bytes = collect_body(meta_body).await?;
        let Ok(record) = serde_json::from_slice::<MetaRecord>(&meta_bytes) else {
            // An unreadable record is indistinguishable from absence.
            debug!(key = %key, "discarding unreadable cache metadata");
            return Ok(None);
        };

        if let Some(expiration) = record.expiration {
            if expiration < now_millis() {
                return Ok(None);
            }
        }

        let body: BodyStream = if record.empty_body {
            empty_stream()
        } else {
            let Some(digest) = record.body_digest.as_deref() else {
                return Ok(None);
            };
            match self.store.get_by_digest(digest).await? {
                Some(body) => body,
                None => return Ok(None),
            }
        };

        Ok(Some(CachedItem {
            body,
            meta: record.meta,
        }))
    }

    async fn set(&self, key: &CacheKey, body: BodyStream, meta: ResponseMeta) -> Result<CachedItem> {
        let (body_key, meta_key) = body_and_meta_keys(key);

        let body_digest = self.store.put(&body_key, body).await?;
        let record = MetaRecord {
            meta,
            expiration: self.ttl.map(|ttl| now_millis() + ttl.as_millis() as u64),
            empty_body: body_digest.is_none(),
            body_digest,
        };

        let record_bytes = serde_json::to_vec(&record)?;
        self.store
            .put(&meta_key, super::stream_from_bytes(record_bytes.into()))
            .await?;

        self.get(key)
            .await?
            .ok_or_else(|| Error::storage("cache entry unreadable immediately after write"))
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        let (body_key, meta_key) = body_and_meta_keys(key);
        self.store.remove(&body_key).await?;
        self.store.remove(&meta_key).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}
