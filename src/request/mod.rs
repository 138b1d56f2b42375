//! Request descriptor: method, URL, headers, body, and the cache-relevant
//! request options that participate in key derivation.

mod body;

pub use body::{Body, FieldValue, MultipartField, MultipartForm};

/// Cache mode of a request, mirroring the fetch `cache` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    /// Never touch the network; succeed only on a cache hit.
    OnlyIfCached,
}

impl CacheMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::Default => "default",
            CacheMode::NoStore => "no-store",
            CacheMode::Reload => "reload",
            CacheMode::NoCache => "no-cache",
            CacheMode::ForceCache => "force-cache",
            CacheMode::OnlyIfCached => "only-if-cached",
        }
    }
}

/// Credentials mode of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialsMode {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

impl CredentialsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialsMode::Omit => "omit",
            CredentialsMode::SameOrigin => "same-origin",
            CredentialsMode::Include => "include",
        }
    }
}

/// Redirect mode of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectMode {
    #[default]
    Follow,
    Error,
    Manual,
}

impl RedirectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectMode::Follow => "follow",
            RedirectMode::Error => "error",
            RedirectMode::Manual => "manual",
        }
    }
}

/// Logical description of an outbound HTTP request.
///
/// Immutable once constructed; the orchestrator borrows it for the duration
/// of one call. Transport-only state (connection handles, TLS config) lives
/// in the [`Transport`](crate::Transport) implementation and can never leak
/// into key material.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    pub url: String,
    /// Header name/value pairs in insertion order. Names are canonicalized
    /// to lowercase during key derivation, not here.
    pub headers: Vec<(String, String)>,
    pub body: Body,
    pub cache_mode: CacheMode,
    pub credentials: CredentialsMode,
    pub redirect: RedirectMode,
    pub integrity: String,
    pub referrer: String,
    pub referrer_policy: String,
    pub destination: String,
}

impl Request {
    /// Create a request with the given method and URL.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: Body::Empty,
            cache_mode: CacheMode::Default,
            credentials: CredentialsMode::SameOrigin,
            redirect: RedirectMode::Follow,
            integrity: String::new(),
            referrer: String::new(),
            referrer_policy: String::new(),
            destination: String::new(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Shorthand for a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialsMode) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_redirect(mut self, redirect: RedirectMode) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn with_integrity(mut self, integrity: impl Into<String>) -> Self {
        self.integrity = integrity.into();
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    pub fn with_referrer_policy(mut self, policy: impl Into<String>) -> Self {
        self.referrer_policy = policy.into();
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// First value of a header, matched case-insensitively by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this request forbids network access and may only be satisfied
    /// from the cache, either via its cache mode or via a
    /// `Cache-Control: only-if-cached` header directive.
    pub fn is_only_if_cached(&self) -> bool {
        if self.cache_mode == CacheMode::OnlyIfCached {
            return true;
        }
        self.header("cache-control")
            .map(|v| v.eq_ignore_ascii_case("only-if-cached"))
            .unwrap_or(false)
    }
}
