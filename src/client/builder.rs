//! Builder for [`FetchCache`].

use super::FetchCache;
use crate::key::KeyOptions;
use crate::storage::memory::MemoryCache;
use crate::storage::CacheBackend;
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;

/// Configures and constructs a [`FetchCache`].
///
/// Defaults: an un-TTL'd [`MemoryCache`] backend, the reqwest
/// [`HttpTransport`], and [`KeyOptions::default`].
pub struct FetchCacheBuilder {
    backend: Option<Arc<dyn CacheBackend>>,
    transport: Option<Arc<dyn Transport>>,
    key_options: KeyOptions,
}

impl FetchCacheBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            transport: None,
            key_options: KeyOptions::default(),
        }
    }

    /// Use the given storage backend.
    pub fn backend(mut self, backend: impl CacheBackend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Use an already-shared storage backend.
    pub fn shared_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use the given fetch primitive.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use an already-shared fetch primitive.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Key-derivation options for every call made through this instance.
    pub fn key_options(mut self, options: KeyOptions) -> Self {
        self.key_options = options;
        self
    }

    pub fn build(self) -> Result<FetchCache> {
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(MemoryCache::new(None)));
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };
        Ok(FetchCache::new(backend, transport, self.key_options))
    }
}

impl Default for FetchCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_build() {
        let cache = FetchCacheBuilder::new().build().unwrap();
        assert_eq!(cache.backend().name(), "memory");
    }

    #[tokio::test]
    async fn test_explicit_backend_is_kept() {
        let cache = FetchCache::builder()
            .backend(crate::storage::filesystem::FileSystemCache::new(
                std::env::temp_dir().join("fetch-cache-builder-test"),
            ))
            .build()
            .unwrap();
        assert_eq!(cache.backend().name(), "filesystem");
    }
}
