//! Benchmarks for cache-key derivation
//!
//! This benchmark measures:
//! - Canonicalization and hashing of simple GET requests
//! - Header-heavy requests
//! - Multipart bodies with boundary stripping

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fetch_cache::{compute_cache_key, Body, KeyOptions, MultipartForm, Request};

fn simple_get(c: &mut Criterion) {
    let options = KeyOptions::default();
    let request = Request::get("https://example.com/api/items?page=3");
    c.bench_function("derive_key_simple_get", |b| {
        b.iter(|| compute_cache_key(black_box(&request), black_box(&options)).unwrap())
    });
}

fn header_heavy(c: &mut Criterion) {
    let options = KeyOptions::default();
    let mut request = Request::get("https://example.com/api/items");
    for i in 0..24 {
        request = request.with_header(format!("x-header-{}", i), format!("value-{}", i));
    }
    c.bench_function("derive_key_header_heavy", |b| {
        b.iter(|| compute_cache_key(black_box(&request), black_box(&options)).unwrap())
    });
}

fn multipart_body(c: &mut Criterion) {
    let options = KeyOptions::default();
    let form = MultipartForm::new()
        .text("name", "value")
        .text("description", "a longer field with some text in it")
        .text("tag", "final");
    let request = Request::post("https://example.com/upload").with_body(Body::Multipart(form));
    c.bench_function("derive_key_multipart", |b| {
        b.iter(|| compute_cache_key(black_box(&request), black_box(&options)).unwrap())
    });
}

criterion_group!(benches, simple_get, header_heavy, multipart_body);
criterion_main!(benches);
