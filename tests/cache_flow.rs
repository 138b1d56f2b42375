//! End-to-end cache behavior against a local mock HTTP server.

use fetch_cache::{CacheMode, FetchCache, MemoryCache, Request};
use std::sync::Arc;
use std::time::Duration;

fn memory_cache() -> FetchCache {
    FetchCache::builder()
        .backend(MemoryCache::new(None))
        .build()
        .expect("builder with defaults")
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/resource")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("cached body")
        .expect(1)
        .create_async()
        .await;

    let cache = memory_cache();
    let request = Request::get(format!("{}/resource", server.url()));

    let mut first = cache.fetch(&request).await.unwrap().unwrap();
    assert_eq!(first.status(), 200);
    assert!(!first.from_cache());
    assert_eq!(first.text().await.unwrap(), "cached body");

    let mut second = cache.fetch(&request).await.unwrap().unwrap();
    assert_eq!(second.status(), 200);
    assert!(second.from_cache());
    assert_eq!(second.text().await.unwrap(), "cached body");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_headers_survive_the_cache() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/headers")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-request-id", "abc-123")
        .with_body("{}")
        .create_async()
        .await;

    let cache = memory_cache();
    let request = Request::get(format!("{}/headers", server.url()));

    cache.fetch(&request).await.unwrap().unwrap();
    let replayed = cache.fetch(&request).await.unwrap().unwrap();
    assert!(replayed.from_cache());
    assert_eq!(
        replayed.header("Content-Type").as_deref(),
        Some("application/json")
    );
    assert_eq!(replayed.header("x-request-id").as_deref(), Some("abc-123"));
}

#[tokio::test]
async fn test_json_body_through_the_cache() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/data.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"answer": 42}"#)
        .create_async()
        .await;

    let cache = memory_cache();
    let request = Request::get(format!("{}/data.json", server.url()));

    let mut response = cache.fetch(&request).await.unwrap().unwrap();
    let value: serde_json::Value = response.json().await.unwrap();
    assert_eq!(value["answer"], 42);

    // The body is gone after the first read.
    assert!(matches!(
        response.bytes().await,
        Err(fetch_cache::Error::BodyAlreadyConsumed)
    ));
}

#[tokio::test]
async fn test_concurrent_cold_fetches_hit_upstream_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/burst")
        .with_status(200)
        .with_body("shared")
        .expect(1)
        .create_async()
        .await;

    let cache = Arc::new(memory_cache());
    let url = format!("{}/burst", server.url());

    let mut handles = Vec::new();
    for _ in 0..6 {
        let cache = Arc::clone(&cache);
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            let mut response = cache.fetch(&Request::get(url)).await.unwrap().unwrap();
            (response.from_cache(), response.text().await.unwrap())
        }));
    }

    let mut fresh = 0;
    for handle in handles {
        let (from_cache, body) = handle.await.unwrap();
        assert_eq!(body, "shared");
        if !from_cache {
            fresh += 1;
        }
    }
    assert_eq!(fresh, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_only_if_cached_never_touches_the_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/guarded")
        .with_status(200)
        .with_body("warm")
        .expect(1)
        .create_async()
        .await;

    let cache = memory_cache();
    let url = format!("{}/guarded", server.url());

    // Cold: no response, no request upstream.
    let cache_only = Request::get(&url).with_cache_mode(CacheMode::OnlyIfCached);
    assert!(cache.fetch(&cache_only).await.unwrap().is_none());

    // Warm the entry, then the cache-only request succeeds.
    cache.fetch(&Request::get(&url)).await.unwrap().unwrap();
    let cache_only = Request::get(&url).with_cache_mode(CacheMode::OnlyIfCached);
    let mut hit = cache.fetch(&cache_only).await.unwrap().unwrap();
    assert!(hit.from_cache());
    assert_eq!(hit.text().await.unwrap(), "warm");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_eject_then_refetch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/ejected")
        .with_status(200)
        .with_body("v")
        .expect(2)
        .create_async()
        .await;

    let cache = memory_cache();
    let request = Request::get(format!("{}/ejected", server.url()));

    let response = cache.fetch(&request).await.unwrap().unwrap();
    response.eject_from_cache().await.unwrap();
    response.eject_from_cache().await.unwrap();

    let refetched = cache.fetch(&request).await.unwrap().unwrap();
    assert!(!refetched.from_cache());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_memory_ttl_expires_entries() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/ttl")
        .with_status(200)
        .with_body("short-lived")
        .expect(2)
        .create_async()
        .await;

    let cache = FetchCache::builder()
        .backend(MemoryCache::new(Some(Duration::from_millis(60))))
        .build()
        .unwrap();
    let request = Request::get(format!("{}/ttl", server.url()));

    assert!(!cache.fetch(&request).await.unwrap().unwrap().from_cache());
    assert!(cache.fetch(&request).await.unwrap().unwrap().from_cache());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(!cache.fetch(&request).await.unwrap().unwrap().from_cache());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_distinct_bodies_are_distinct_entries() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/submit")
        .with_status(200)
        .with_body("ok")
        .expect(2)
        .create_async()
        .await;

    let cache = memory_cache();
    let url = format!("{}/submit", server.url());

    let a = Request::post(&url).with_body(fetch_cache::Body::text("a"));
    let b = Request::post(&url).with_body(fetch_cache::Body::text("b"));
    assert!(!cache.fetch(&a).await.unwrap().unwrap().from_cache());
    assert!(!cache.fetch(&b).await.unwrap().unwrap().from_cache());
    mock.assert_async().await;
}
