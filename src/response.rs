//! Cached response wrapper.
//!
//! A standalone view over a stored entry or a freshly fetched result:
//! metadata accessors, a body that may be consumed exactly once, the
//! `from_cache` provenance flag, and an eviction handle bound to the entry's
//! cache key.

use crate::key::CacheKey;
use crate::storage::{collect_body, CacheBackend, CachedItem, ResponseMeta};
use crate::{Error, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A response served through the cache.
pub struct CachedResponse {
    meta: ResponseMeta,
    body: Option<crate::BodyStream>,
    from_cache: bool,
    key: CacheKey,
    backend: Arc<dyn CacheBackend>,
}

impl CachedResponse {
    pub(crate) fn new(
        item: CachedItem,
        key: CacheKey,
        backend: Arc<dyn CacheBackend>,
        from_cache: bool,
    ) -> Self {
        Self {
            meta: item.meta,
            body: Some(item.body),
            from_cache,
            key,
            backend,
        }
    }

    /// Whether this response was replayed from storage rather than fetched.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// The fingerprint this response is stored under.
    pub fn cache_key(&self) -> &CacheKey {
        &self.key
    }

    pub fn status(&self) -> u16 {
        self.meta.status
    }

    pub fn status_text(&self) -> &str {
        &self.meta.status_text
    }

    pub fn url(&self) -> &str {
        &self.meta.url
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.meta.status)
    }

    /// True when the transport followed at least one redirect.
    pub fn redirected(&self) -> bool {
        self.meta.redirect_count > 0
    }

    /// The raw header list, name-sorted.
    pub fn headers(&self) -> &BTreeMap<String, Vec<String>> {
        &self.meta.headers
    }

    /// Header values by name, case-insensitively, multiple values joined
    /// with `", "`.
    pub fn header(&self, name: &str) -> Option<String> {
        self.meta
            .headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.join(", "))
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.meta
            .headers
            .keys()
            .any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn header_names(&self) -> impl Iterator<Item = &str> {
        self.meta.headers.keys().map(String::as_str)
    }

    pub fn header_values(&self) -> impl Iterator<Item = &str> {
        self.meta
            .headers
            .values()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    pub fn header_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.meta.headers.iter().flat_map(|(name, values)| {
            values.iter().map(move |value| (name.as_str(), value.as_str()))
        })
    }

    /// Consume the body as raw bytes. The body can be read at most once per
    /// response; a second read of any kind fails.
    pub async fn bytes(&mut self) -> Result<Bytes> {
        let body = self.body.take().ok_or(Error::BodyAlreadyConsumed)?;
        collect_body(body).await
    }

    /// Consume the body as UTF-8 text.
    pub async fn text(&mut self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Consume the body and parse it as JSON.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Remove this response's entry from the backing storage. Calling it
    /// again, or on an already-absent entry, is a no-op.
    pub async fn eject_from_cache(&self) -> Result<()> {
        self.backend.remove(&self.key).await
    }
}

impl std::fmt::Debug for CachedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedResponse")
            .field("url", &self.meta.url)
            .field("status", &self.meta.status)
            .field("from_cache", &self.from_cache)
            .field("body_consumed", &self.body.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryCache;
    use crate::storage::stream_from_bytes;

    fn sample_meta() -> ResponseMeta {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), vec!["application/json".to_string()]);
        headers.insert(
            "set-cookie".to_string(),
            vec!["a=1".to_string(), "b=2".to_string()],
        );
        ResponseMeta {
            url: "http://localhost/thing".to_string(),
            status: 200,
            status_text: "OK".to_string(),
            headers,
            size: None,
            redirect_count: 0,
        }
    }

    fn response_with(body: &'static [u8], meta: ResponseMeta) -> CachedResponse {
        CachedResponse::new(
            CachedItem {
                body: stream_from_bytes(Bytes::from_static(body)),
                meta,
            },
            CacheKey::from("resp-key"),
            Arc::new(MemoryCache::new(None)),
            true,
        )
    }

    #[tokio::test]
    async fn test_status_accessors() {
        let resp = response_with(b"{}", sample_meta());
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.status_text(), "OK");
        assert_eq!(resp.url(), "http://localhost/thing");
        assert!(resp.ok());
        assert!(!resp.redirected());
        assert!(resp.from_cache());
    }

    #[tokio::test]
    async fn test_not_ok_outside_2xx() {
        let mut meta = sample_meta();
        meta.status = 404;
        meta.status_text = "Not Found".to_string();
        let resp = response_with(b"", meta);
        assert!(!resp.ok());
    }

    #[tokio::test]
    async fn test_redirected_from_counter() {
        let mut meta = sample_meta();
        meta.redirect_count = 2;
        let resp = response_with(b"", meta);
        assert!(resp.redirected());
    }

    #[tokio::test]
    async fn test_header_accessors() {
        let resp = response_with(b"", sample_meta());
        assert_eq!(resp.header("Content-Type").as_deref(), Some("application/json"));
        assert_eq!(resp.header("set-cookie").as_deref(), Some("a=1, b=2"));
        assert_eq!(resp.header("x-missing"), None);
        assert!(resp.has_header("CONTENT-TYPE"));
        assert!(!resp.has_header("x-missing"));

        let names: Vec<&str> = resp.header_names().collect();
        assert_eq!(names, vec!["content-type", "set-cookie"]);
        let entries: Vec<(&str, &str)> = resp.header_entries().collect();
        assert_eq!(
            entries,
            vec![
                ("content-type", "application/json"),
                ("set-cookie", "a=1"),
                ("set-cookie", "b=2"),
            ]
        );
        assert_eq!(resp.header_values().count(), 3);
    }

    #[tokio::test]
    async fn test_text_body() {
        let mut resp = response_with(b"hello", sample_meta());
        assert_eq!(resp.text().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_json_body() {
        let mut resp = response_with(br#"{"n": 3}"#, sample_meta());
        let value: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(value["n"], 3);
    }

    #[tokio::test]
    async fn test_body_consumed_once() {
        let mut resp = response_with(b"once", sample_meta());
        resp.text().await.unwrap();
        assert!(matches!(resp.text().await, Err(Error::BodyAlreadyConsumed)));
        assert!(matches!(resp.bytes().await, Err(Error::BodyAlreadyConsumed)));
        assert!(matches!(
            resp.json::<serde_json::Value>().await,
            Err(Error::BodyAlreadyConsumed)
        ));
    }

    #[tokio::test]
    async fn test_eject_is_idempotent() {
        let backend = Arc::new(MemoryCache::new(None));
        let key = CacheKey::from("evictable");
        backend
            .set(
                &key,
                stream_from_bytes(Bytes::from_static(b"x")),
                sample_meta(),
            )
            .await
            .unwrap();

        let resp = CachedResponse::new(
            backend.get(&key).await.unwrap().unwrap(),
            key.clone(),
            backend.clone(),
            true,
        );
        resp.eject_from_cache().await.unwrap();
        resp.eject_from_cache().await.unwrap();
        assert!(backend.get(&key).await.unwrap().is_none());
    }
}
