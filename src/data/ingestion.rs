use crate::error::{Result, TapError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

/// Public OeKB export listing every tax reporting fund.
pub const OEKB_URL: &str =
    "https://my.oekb.at/kms-reporting/public?report=steuerdaten-liste-mf-gesamt&format=CSV";

/// Anything that can hand back the raw Meldefonds CSV export.
///
/// The production implementation is [`OekbSource`]; tests substitute canned bodies
/// or failures.
#[async_trait]
pub trait MeldefondsSource: Send + Sync {
    /// Endpoint used to tag log lines and metrics.
    fn endpoint(&self) -> &str;

    /// Fetches the complete export as decoded text.
    async fn fetch(&self) -> Result<String>;
}

/// Downloads the Meldefonds export from the OeKB website.
///
/// The request goes out with an empty `User-Agent` header, no timeout and no retry.
/// A non-success status fails the fetch before the body is decoded.
pub struct OekbSource {
    url: String,
    client: reqwest::Client,
}

impl OekbSource {
    /// Creates a source pointed at [`OEKB_URL`].
    pub fn new() -> Self {
        Self::with_client(OEKB_URL, reqwest::Client::new())
    }

    /// Creates a source for an arbitrary URL with a caller-supplied client.
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(""));
        headers
    }

    fn http_error(&self, source: reqwest::Error) -> TapError {
        TapError::Http {
            url: self.url.clone(),
            source,
        }
    }
}

impl Default for OekbSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MeldefondsSource for OekbSource {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .headers(Self::headers())
            .send()
            .await
            .map_err(|e| self.http_error(e))?
            .error_for_status()
            .map_err(|e| self.http_error(e))?;

        debug!(status = %response.status(), "received response");

        // Decodes with the declared charset, falling back to UTF-8.
        response.text().await.map_err(|e| self.http_error(e))
    }
}
