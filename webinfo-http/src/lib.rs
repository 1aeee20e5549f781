//! Minimal HTTP client with safe logging and optional retries.
//!
//! - Bearer auth is sanitized before use and never logged
//! - Retries (off by default) 429/5xx with exponential backoff and `Retry-After` support
//! - Optional *raw* request/response logging via `WEBINFO_HTTP_RAW=1`
//!
//! ```no_run
//! # async fn demo() -> Result<(), webinfo_http::HttpError> {
//! let client = webinfo_http::HttpClient::new("https://example.com")?;
//! let page = client
//!     .get_bytes("index.html", webinfo_http::RequestOpts::default())
//!     .await?;
//! println!("{} {:?}", page.status, page.content_type());
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), retries, final errors, and
//! (optionally) raw request/response lines (target `http.raw`).

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "WEBINFO_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug. The bearer token is
/// always shown as `<redacted>`.
fn make_curl(method: &Method, url: &Url, bearer: bool, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    if bearer {
        parts.push("-H 'authorization: Bearer <redacted>'".to_string());
    }
    if let Some(bytes) = body {
        parts.push("-H 'content-type: application/json'".to_string());
        if let Ok(s) = std::str::from_utf8(bytes) {
            let mut s = s.to_string();
            if s.len() > RAW_MAX_BODY {
                truncate_on_char_boundary(&mut s, RAW_MAX_BODY);
                s.push('…');
            }
            parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
        } else {
            parts.push(format!("--data-binary @- # ({} bytes)", bytes.len()));
        }
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") || key.eq_ignore_ascii_case("set-cookie")
            {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

// ==============================
// Request options
// ==============================

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use webinfo_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     bearer: Some("sk-demo"),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.retries.is_none());
/// assert!(!opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    /// Sent as `Authorization: Bearer <token>` after sanitizing.
    pub bearer: Option<&'a str>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

/// A response body together with the metadata callers may want to log.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// The `Content-Type` header, when present and readable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use webinfo_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(60));
    /// assert_eq!(client.max_retries, 0);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .user_agent(concat!("webinfo/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(60),
            max_retries: 0,
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Override the default retry budget returned by [`HttpClient::new`].
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// POST a JSON body and decode a JSON reply. Non-2xx statuses become
    /// [`HttpError::Api`] with the server's error message.
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .send_internal(Method::POST, path, Some(body), opts, |status| {
                status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            })
            .await?;

        let snippet = snip_body(&resp.body);
        let request_id = request_id_of(&resp.headers);

        if resp.status.is_success() {
            return serde_json::from_slice::<T>(&resp.body).map_err(|e| {
                tracing::warn!(
                    x_request_id=%request_id,
                    serde_line=%e.line(),
                    serde_col=%e.column(),
                    serde_err=%e.to_string(),
                    body_snippet=%snippet,
                    "http.response.decode_error"
                );
                HttpError::Decode(e.to_string(), snippet)
            });
        }

        let message = extract_error_message(&resp.body);
        tracing::warn!(
            status=%resp.status,
            message=%message,
            x_request_id=%request_id,
            body_snippet=%snippet,
            "http.error"
        );
        Err(HttpError::Api {
            status: resp.status,
            message,
            request_id,
        })
    }

    /// GET the raw body, whatever the status code.
    ///
    /// Only transport failures are errors; a 404 page is handed back like any
    /// other document so callers decide what a status means to them.
    pub async fn get_bytes(
        &self,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError> {
        self.send_internal::<()>(Method::GET, path, None, opts, |_| false)
            .await
    }

    // ==============================
    // Core request implementation
    // ==============================

    /// Send one logical request, retrying transport errors and any status for
    /// which `retryable` answers true, up to the retry budget.
    async fn send_internal<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
        retryable: impl Fn(StatusCode) -> bool,
    ) -> Result<RawResponse, HttpError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.resolve(path, opts.allow_absolute)?;

        // Serialize once so the exact bytes can be logged and resent.
        let request_body_bytes: Option<Vec<u8>> = match body {
            Some(b) => Some(serde_json::to_vec(b).map_err(|e| HttpError::Build(e.to_string()))?),
            None => None,
        };
        let bearer = opts.bearer.map(sanitize_api_key).transpose()?;

        let mut attempt = 0usize;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);

        loop {
            // ----- Build request -----
            let mut rb = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(timeout);

            if let Some(bytes) = &request_body_bytes {
                rb = rb
                    .header(CONTENT_TYPE, "application/json")
                    .body(bytes.clone());
            }
            if let Some(tok) = &bearer {
                rb = rb.bearer_auth(tok);
            }

            // ----- Safe request logging (pre-send) -----
            let req_id = format!(
                "r{:x}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos()
            );
            let attempt0 = attempt + 1;

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt0,
                max_retries,
                method=%method,
                host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                timeout_ms=timeout.as_millis() as u64,
                bearer=bearer.is_some(),
                has_body=%request_body_bytes.is_some(),
                "http.request.start"
            );

            if raw_enabled() {
                let curl = make_curl(&method, &url, bearer.is_some(), request_body_bytes.as_deref());
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            // ----- Send -----
            let t0 = std::time::Instant::now();
            let outcome = match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let headers = resp.headers().clone();
                    resp.bytes()
                        .await
                        .map(|body| (status, headers, body))
                        .map_err(|err| ("http.network_error.body", err.to_string()))
                }
                Err(err) => Err(("http.network_error.send", err.to_string())),
            };

            let (status, headers, bytes) = match outcome {
                Ok(parts) => parts,
                Err((event, message)) => {
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        message=%message,
                        "{}",
                        event
                    );
                    return Err(HttpError::Network(message));
                }
            };
            let dur_ms = t0.elapsed().as_millis() as u64;

            let x_request_id = request_id_of(&headers);
            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=bytes.len(),
                x_request_id=%x_request_id,
                content_type=?headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
                "http.response.headers"
            );

            if raw_enabled() {
                let hdrs = redact_headers(&headers);
                let truncated = bytes.len() > RAW_MAX_BODY;
                let body_snip = if truncated {
                    &bytes[..RAW_MAX_BODY]
                } else {
                    &bytes[..]
                };
                let text = String::from_utf8_lossy(body_snip);
                tracing::info!(
                    target:"http.raw",
                    %req_id,
                    status=%status,
                    duration_ms=dur_ms,
                    headers=?hdrs,
                    body=%text,
                    truncated
                );
            }

            tracing::trace!(
                req_id=%req_id,
                body_snippet=%snip_body(&bytes),
                "http.response.body_snippet"
            );

            if !status.is_success() && retryable(status) && attempt < max_retries {
                attempt += 1;
                let delay = match retry_after_delay_secs(&headers) {
                    Some(secs) => Duration::from_secs(secs),
                    None if status == StatusCode::TOO_MANY_REQUESTS => {
                        // default floor for 429 when no Retry-After is present
                        backoff(attempt).max(Duration::from_millis(1100))
                    }
                    None => backoff(attempt),
                };
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            return Ok(RawResponse {
                status,
                headers,
                body: bytes,
            });
        }
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }
}

// ==============================
// Helpers
// ==============================

fn backoff(attempt: usize) -> Duration {
    Duration::from_millis(200u64.saturating_mul(1 << (attempt.saturating_sub(1)).min(16)))
}

fn request_id_of(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

fn extract_error_message(body: &[u8]) -> String {
    // OpenAI style: {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct OpenAiEnv {
        error: OpenAiDetail,
    }
    #[derive(Deserialize)]
    struct OpenAiDetail {
        message: String,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<OpenAiEnv>(body) {
        return env.error.message;
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        if !m.message.is_empty() {
            return m.message;
        }
        if !m.detail.is_empty() {
            return m.detail;
        }
        if !m.error.is_empty() {
            return m.error;
        }
    }
    snip_body(body)
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        truncate_on_char_boundary(&mut snip, 500);
        snip.push_str("...");
    }
    snip
}

fn truncate_on_char_boundary(s: &mut String, max: usize) {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    // 1) Trim outer spaces/quotes
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    // 2) Remove *all* ASCII whitespace (spaces, tabs, newlines, carriage returns)
    s.retain(|ch| !ch.is_ascii_whitespace());

    // 3) Ensure ASCII and no control chars
    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }

    // 4) Validate header value upfront for clear errors
    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}
