//! # fetch-cache
//!
//! A caching decorator around HTTP fetches. Each outbound request is reduced
//! to a deterministic fingerprint; a stored, unexpired response for that
//! fingerprint is served without touching the network, otherwise the real
//! fetch runs exactly once per fingerprint and its result is persisted for
//! future calls.
//!
//! ## Overview
//!
//! Caching fetches is valuable for:
//! - Avoiding duplicate requests against rate-limited or metered endpoints
//! - Cutting response latency for repeated lookups
//! - Supporting offline development and deterministic test workflows
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`FetchCache`] | Orchestrator: key derivation, lookup, single-flight fetch-and-populate |
//! | [`CacheBackend`] | Trait for pluggable storage backends |
//! | [`MemoryCache`] | In-memory backend with per-key TTL eviction timers |
//! | [`FileSystemCache`] | On-disk backend over a content-addressed blob store |
//! | [`KeyOptions`] | Per-field inclusion flags for cache-key derivation |
//! | [`CachedResponse`] | Response wrapper with provenance and eviction |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fetch_cache::{FetchCache, MemoryCache, Request};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> fetch_cache::Result<()> {
//!     let cache = FetchCache::builder()
//!         .backend(MemoryCache::new(Some(Duration::from_secs(60))))
//!         .build()?;
//!
//!     let request = Request::get("https://example.com/data.json");
//!     if let Some(mut response) = cache.fetch(&request).await? {
//!         println!("from cache: {}", response.from_cache());
//!         println!("{}", response.text().await?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`request`] | Request descriptor, body kinds, cache-relevant options |
//! | [`key`] | Deterministic cache-key derivation |
//! | [`storage`] | Storage backend trait plus memory and filesystem backends |
//! | [`singleflight`] | Per-key mutual exclusion for the miss path |
//! | [`response`] | Cached response wrapper |
//! | [`transport`] | Fetch primitive trait and reqwest implementation |
//! | [`client`] | The `FetchCache` orchestrator and its builder |

pub mod client;
pub mod key;
pub mod request;
pub mod response;
pub mod singleflight;
pub mod storage;
pub mod transport;

// Re-export main types for convenience
pub use client::{FetchCache, FetchCacheBuilder};
pub use key::{compute_cache_key, CacheKey, HeaderInclusion, KeyOptions, CACHE_FORMAT_VERSION};
pub use request::{
    Body, CacheMode, CredentialsMode, FieldValue, MultipartField, MultipartForm, RedirectMode,
    Request,
};
pub use response::CachedResponse;
pub use storage::blob::{BlobInfo, BlobStore, FsBlobStore};
pub use storage::filesystem::FileSystemCache;
pub use storage::memory::MemoryCache;
pub use storage::{CacheBackend, CachedItem, ResponseMeta};
pub use transport::{FetchedResponse, HttpTransport, Transport};

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed byte stream: the unified body representation handed
/// between the transport, the storage backends, and the response wrapper.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Error type for the library
pub mod error;
pub use error::Error;
