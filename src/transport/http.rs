use crate::request::{Body, FieldValue, Request};
use crate::storage::ResponseMeta;
use crate::transport::{FetchedResponse, Transport};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;
use tokio_util::io::ReaderStream;

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        // Minimal production-friendly defaults (env-overridable).
        let timeout_secs = env::var("FETCH_CACHE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    /// Wrap a pre-configured client (pool sizing, proxies, and the like are
    /// the caller's business).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn request_body(&self, body: &Body) -> Result<Option<reqwest::Body>> {
        match body {
            Body::Empty => Ok(None),
            Body::Text(text) => Ok(Some(text.clone().into())),
            Body::Bytes(bytes) => Ok(Some(bytes.clone().into())),
            Body::FilePath(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(Some(reqwest::Body::wrap_stream(ReaderStream::new(file))))
            }
            Body::Reader(slot) => {
                let stream = slot
                    .lock()
                    .unwrap()
                    .take()
                    .ok_or_else(|| TransportError::Other("reader body already consumed".into()))?;
                Ok(Some(reqwest::Body::wrap_stream(stream)))
            }
            // Form and Multipart are assembled on the request builder, where
            // reqwest also sets the matching content-type.
            Body::Form(_) | Body::Multipart(_) => Ok(None),
        }
    }

    async fn multipart_form(form: &crate::request::MultipartForm) -> Result<reqwest::multipart::Form> {
        let mut out = reqwest::multipart::Form::new();
        for field in form.fields() {
            let mut part = match &field.value {
                FieldValue::Text(text) => reqwest::multipart::Part::text(text.clone()),
                FieldValue::Bytes(bytes) => reqwest::multipart::Part::bytes(bytes.to_vec()),
                FieldValue::FilePath(path) => {
                    let file = tokio::fs::File::open(path).await?;
                    reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(
                        ReaderStream::new(file),
                    ))
                }
            };
            if let Some(filename) = &field.filename {
                part = part.file_name(filename.clone());
            }
            if let Some(content_type) = &field.content_type {
                part = part
                    .mime_str(content_type)
                    .map_err(|e| Error::Transport(TransportError::Http(e)))?;
            }
            out = out.part(field.name.clone(), part);
        }
        Ok(out)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse> {
        let requested_url = url::Url::parse(&request.url)?;
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| TransportError::Other(format!("invalid method: {}", request.method)))?;

        let mut builder = self.client.request(method, requested_url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match &request.body {
            Body::Form(fields) => builder.form(fields),
            Body::Multipart(form) => builder.multipart(Self::multipart_form(form).await?),
            other => match self.request_body(other).await? {
                Some(body) => builder.body(body),
                None => builder,
            },
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        let status = response.status();
        let final_url = response.url().clone();
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let meta = ResponseMeta {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            size: response.content_length(),
            // reqwest does not surface a hop count; a changed final URL is
            // the observable fact callers derive `redirected` from.
            redirect_count: u32::from(final_url != requested_url),
        };

        let body = response
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));

        Ok(FetchedResponse {
            meta,
            body: Box::pin(body),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
