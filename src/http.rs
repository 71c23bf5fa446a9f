//! HTTP client adapter shared by page parsing, link resolution and downloads.
//!
//! Every request carries the same browser identity (user agent, accept
//! headers, keep-alive) and goes through one cookie-aware `reqwest::Client`,
//! so a whole album run reuses a single connection pool. Page and API bodies
//! are capped at [`MAX_RESPONSE_BYTES`]; file downloads stream to disk instead.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE,
    COOKIE, REFERER, USER_AGENT,
};
use reqwest::{Client, Response};
use serde_json::Value;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

/// Page and API responses longer than this are truncated.
pub const MAX_RESPONSE_BYTES: usize = 5_000_000;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("empty response from {0}")]
    EmptyBody(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NetworkError {
    fn request(url: &str, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            source,
        }
    }
}

/// Transport capability used by the rest of the crate.
///
/// The production implementation is [`Session`]; tests substitute a scripted
/// client so parsing, resolution and download logic run without a network.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// GET a page and return its (capped) body. Fails on transport errors and
    /// empty bodies; non-2xx pages are returned as-is because error pages
    /// still carry parseable markup.
    async fn get_text(
        &self,
        url: &str,
        cookies: &[(&str, &str)],
        referer: Option<&str>,
    ) -> Result<Vec<u8>, NetworkError>;

    /// POST a JSON body and return the (capped) response. Any status other
    /// than 200 is an error.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Vec<u8>, NetworkError>;

    /// HEAD probe returning `(status, content_length)`; the length is `-1`
    /// when the server does not declare one.
    async fn head_length(&self, url: &str, referer: &str) -> Result<(u16, i64), NetworkError>;

    /// GET `url` and stream the body into `path` (created or truncated),
    /// returning the number of bytes written.
    async fn fetch_to_file(&self, url: &str, referer: &str, path: &Path)
        -> Result<u64, NetworkError>;
}

/// Serialize cookies into a single `Cookie` header value (`k=v; ` pairs).
pub fn cookie_header(cookies: &[(&str, &str)]) -> String {
    let mut header = String::new();
    for (key, value) in cookies {
        header.push_str(key);
        header.push('=');
        header.push_str(value);
        header.push_str("; ");
    }
    header
}

/// reqwest-backed HTTP session with a fixed browser identity and cookie jar.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
}

impl Session {
    pub fn new(timeout: Duration, insecure_tls: bool) -> Result<Self, NetworkError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        default_headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
        default_headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        default_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(default_headers)
            .danger_accept_invalid_certs(insecure_tls)
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::request("<client builder>", e))?;

        Ok(Self { client })
    }
}

/// Read a response body, truncating it at [`MAX_RESPONSE_BYTES`].
async fn read_capped(url: &str, response: Response) -> Result<Vec<u8>, NetworkError> {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| NetworkError::request(url, e))?;
        let room = MAX_RESPONSE_BYTES - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            tracing::debug!(url, "Response truncated at {} bytes", MAX_RESPONSE_BYTES);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[async_trait::async_trait]
impl HttpClient for Session {
    async fn get_text(
        &self,
        url: &str,
        cookies: &[(&str, &str)],
        referer: Option<&str>,
    ) -> Result<Vec<u8>, NetworkError> {
        let mut builder = self.client.get(url);
        if !cookies.is_empty() {
            builder = builder.header(COOKIE, cookie_header(cookies));
        }
        if let Some(referer) = referer.filter(|r| !r.is_empty()) {
            builder = builder.header(REFERER, referer);
        }

        tracing::debug!("GET {}", url);
        let response = builder
            .send()
            .await
            .map_err(|e| NetworkError::request(url, e))?;
        let body = read_capped(url, response).await?;
        if body.is_empty() {
            return Err(NetworkError::EmptyBody(url.to_string()));
        }
        Ok(body)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Vec<u8>, NetworkError> {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| NetworkError::request(url, e))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(NetworkError::Status {
                status,
                url: url.to_string(),
            });
        }
        read_capped(url, response).await
    }

    async fn head_length(&self, url: &str, referer: &str) -> Result<(u16, i64), NetworkError> {
        tracing::debug!("HEAD {}", url);
        let response = self
            .client
            .head(url)
            .header(REFERER, referer)
            .send()
            .await
            .map_err(|e| NetworkError::request(url, e))?;

        // Read the header directly: HEAD responses have no body for reqwest
        // to size, so `Response::content_length` reports 0.
        let length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(-1);
        Ok((response.status().as_u16(), length))
    }

    async fn fetch_to_file(
        &self,
        url: &str,
        referer: &str,
        path: &Path,
    ) -> Result<u64, NetworkError> {
        tracing::debug!("GET {} -> {}", url, path.display());
        let response = self
            .client
            .get(url)
            .header(REFERER, referer)
            .send()
            .await
            .map_err(|e| NetworkError::request(url, e))?;

        let mut file = File::create(path).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| NetworkError::request(url, e))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}
