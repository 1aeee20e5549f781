use async_trait::async_trait;
use std::time::Duration;
use url::Url;
use webinfo_common::{Result, WebinfoError};
use webinfo_http::{HttpClient, RequestOpts};

/// A downloaded document, body undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    /// `Content-Type` header as sent; its charset feeds decoding.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// A 200 response without a `Content-Type`.
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }
}

/// Downloads the document behind a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Return the response as received. No decoding, no status interpretation.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// [`PageFetcher`] issuing one plain GET per call.
pub struct HttpFetcher {
    timeout: Duration,
    retries: usize,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            retries: 0,
        }
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retries: usize) -> Self {
        Self { timeout, retries }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let parsed = parse_page_url(url)?;

        let client = HttpClient::new(parsed.as_str())
            .map_err(|e| WebinfoError::Fetch(e.to_string()))?
            .with_timeout(self.timeout)
            .with_retries(self.retries);

        let resp = client
            .get_bytes(
                parsed.as_str(),
                RequestOpts {
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| WebinfoError::Fetch(e.to_string()))?;

        if !resp.status.is_success() {
            tracing::warn!(%url, status = %resp.status, "fetch.non_success_status");
        }
        tracing::info!(
            %url,
            status = %resp.status,
            bytes = resp.body.len(),
            content_type = ?resp.content_type(),
            "fetch.done"
        );

        Ok(FetchedPage {
            status: resp.status.as_u16(),
            content_type: resp.content_type().map(str::to_string),
            body: resp.body.to_vec(),
        })
    }
}

/// Accept only absolute `http`/`https` URLs.
pub fn parse_page_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| WebinfoError::Fetch(format!("invalid URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(WebinfoError::Fetch(format!(
            "unsupported URL scheme {other:?} in {raw:?}"
        ))),
    }
}
