//! Deterministic cache-key derivation.
//!
//! A request is reduced to canonical key material (a sorted JSON structure
//! of only the fields enabled by [`KeyOptions`]), serialized together with
//! [`CACHE_FORMAT_VERSION`], and hashed. Two semantically equivalent
//! requests always produce the same key; any difference in an included
//! field produces a different key.

use crate::request::{Body, FieldValue, MultipartForm, Request};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Version of the key-material layout. Bumping it invalidates every entry
/// written under the previous layout without an explicit migration.
pub const CACHE_FORMAT_VERSION: u32 = 4;

/// An opaque, deterministic fingerprint of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Which headers participate in key material.
#[derive(Debug, Clone)]
pub enum HeaderInclusion {
    /// Every header (minus the `only-if-cached` control directive).
    All,
    /// No header at all.
    None,
    /// Per-name overrides; a header not listed is included by default.
    Filtered(HashMap<String, bool>),
}

/// Per-field inclusion flags for key derivation.
///
/// Every flag defaults to enabled. Options are instance-scoped: they are
/// handed to [`FetchCache`](crate::FetchCache) at construction and applied
/// to every call made through that instance.
#[derive(Debug, Clone)]
pub struct KeyOptions {
    pub method: bool,
    pub url: bool,
    pub headers: HeaderInclusion,
    pub body: bool,
    pub cache_mode: bool,
    pub credentials: bool,
    pub destination: bool,
    pub integrity: bool,
    pub redirect: bool,
    pub referrer: bool,
    pub referrer_policy: bool,
}

impl Default for KeyOptions {
    fn default() -> Self {
        Self {
            method: true,
            url: true,
            headers: HeaderInclusion::All,
            body: true,
            cache_mode: true,
            credentials: true,
            destination: true,
            integrity: true,
            redirect: true,
            referrer: true,
            referrer_policy: true,
        }
    }
}

impl KeyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, include: bool) -> Self {
        self.method = include;
        self
    }

    pub fn with_url(mut self, include: bool) -> Self {
        self.url = include;
        self
    }

    pub fn with_body(mut self, include: bool) -> Self {
        self.body = include;
        self
    }

    pub fn with_headers(mut self, headers: HeaderInclusion) -> Self {
        self.headers = headers;
        self
    }

    /// Exclude a single header by name, keeping the rest included.
    pub fn without_header(mut self, name: impl Into<String>) -> Self {
        let name = name.into().to_lowercase();
        match &mut self.headers {
            HeaderInclusion::Filtered(map) => {
                map.insert(name, false);
            }
            HeaderInclusion::All => {
                let mut map = HashMap::new();
                map.insert(name, false);
                self.headers = HeaderInclusion::Filtered(map);
            }
            HeaderInclusion::None => {}
        }
        self
    }
}

/// Derive the cache key for a request under the given options.
///
/// Fails with [`Error::UnsupportedBodyKind`] when the body carries no stable
/// identity (an opaque reader stream).
pub fn compute_cache_key(request: &Request, options: &KeyOptions) -> Result<CacheKey> {
    let material = key_material(request, options)?;
    let payload = json!([material, CACHE_FORMAT_VERSION]);
    let canonical = serde_json::to_string(&payload)?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
    Ok(CacheKey::new(hash))
}

fn key_material(request: &Request, options: &KeyOptions) -> Result<Value> {
    // Disabled fields collapse to "" instead of disappearing, so toggling a
    // flag changes the material without reshaping it.
    let mut material = Map::new();
    material.insert(
        "method".into(),
        gated(options.method, || request.method.to_uppercase().into()),
    );
    material.insert("url".into(), gated(options.url, || request.url.clone().into()));
    material.insert("headers".into(), headers_material(request, options));
    material.insert(
        "body".into(),
        if options.body {
            body_material(&request.body)?
        } else {
            Value::String(String::new())
        },
    );
    material.insert(
        "cache".into(),
        gated(options.cache_mode, || request.cache_mode.as_str().into()),
    );
    material.insert(
        "credentials".into(),
        gated(options.credentials, || request.credentials.as_str().into()),
    );
    material.insert(
        "destination".into(),
        gated(options.destination, || request.destination.clone().into()),
    );
    material.insert(
        "integrity".into(),
        gated(options.integrity, || request.integrity.clone().into()),
    );
    material.insert(
        "redirect".into(),
        gated(options.redirect, || request.redirect.as_str().into()),
    );
    material.insert(
        "referrer".into(),
        gated(options.referrer, || request.referrer.clone().into()),
    );
    material.insert(
        "referrerPolicy".into(),
        gated(options.referrer_policy, || request.referrer_policy.clone().into()),
    );
    Ok(Value::Object(material))
}

fn gated(include: bool, value: impl FnOnce() -> Value) -> Value {
    if include {
        value()
    } else {
        Value::String(String::new())
    }
}

fn headers_material(request: &Request, options: &KeyOptions) -> Value {
    let filter = match &options.headers {
        HeaderInclusion::None => return Value::String(String::new()),
        HeaderInclusion::All => None,
        HeaderInclusion::Filtered(map) => Some(map),
    };

    // Name-sorted so header order in the request never shifts the key.
    let mut collected: std::collections::BTreeMap<String, Vec<String>> =
        std::collections::BTreeMap::new();
    for (name, value) in &request.headers {
        let name = name.to_lowercase();

        // `only-if-cached` steers control flow, not cache identity.
        if name == "cache-control" && value.eq_ignore_ascii_case("only-if-cached") {
            continue;
        }
        if let Some(filter) = filter {
            if !filter.get(&name).copied().unwrap_or(true) {
                continue;
            }
        }
        collected.entry(name).or_default().push(value.clone());
    }

    let mut headers = Map::new();
    for (name, values) in collected {
        headers.insert(
            name,
            Value::Array(values.into_iter().map(Value::String).collect()),
        );
    }
    Value::Object(headers)
}

fn body_material(body: &Body) -> Result<Value> {
    match body {
        Body::Empty => Ok(Value::Null),
        Body::Text(text) => Ok(text.clone().into()),
        Body::Form(fields) => {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (name, value) in fields {
                serializer.append_pair(name, value);
            }
            Ok(serializer.finish().into())
        }
        // Identity by path, not content.
        Body::FilePath(path) => Ok(path.to_string_lossy().into_owned().into()),
        Body::Multipart(form) => Ok(multipart_material(form)),
        Body::Bytes(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned().into()),
        Body::Reader(_) => Err(Error::UnsupportedBodyKind),
    }
}

/// Structural copy of the field list with the random boundary token stripped
/// from every string value, so identical fields under different boundaries
/// canonicalize identically.
fn multipart_material(form: &MultipartForm) -> Value {
    let boundary = form.boundary();
    let strip = |s: &str| -> Value { s.replace(boundary, "").into() };

    let fields: Vec<Value> = form
        .fields()
        .iter()
        .map(|field| {
            let mut entry = Map::new();
            entry.insert("name".into(), strip(&field.name));
            entry.insert(
                "filename".into(),
                field.filename.as_deref().map(strip).unwrap_or(Value::Null),
            );
            entry.insert(
                "contentType".into(),
                field
                    .content_type
                    .as_deref()
                    .map(strip)
                    .unwrap_or(Value::Null),
            );
            entry.insert(
                "value".into(),
                match &field.value {
                    FieldValue::Text(text) => strip(text),
                    FieldValue::Bytes(bytes) => strip(&String::from_utf8_lossy(bytes)),
                    FieldValue::FilePath(path) => strip(&path.to_string_lossy()),
                },
            );
            Value::Object(entry)
        })
        .collect();
    Value::Array(fields)
}
