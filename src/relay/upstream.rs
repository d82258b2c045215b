//! Upstream calls to mirrors
//!
//! `UpstreamClient` is the seam between the fan-out loop and the network.
//! Every outcome, including transport failure, is folded into an
//! `UpstreamResult` so the loop only ever reasons about status codes.

use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use reqwest::redirect::Policy;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Identifying user agent sent to every mirror.
pub const USER_AGENT: &str = "WEAO-3PService";

/// Status recorded when a mirror could not be reached or read.
pub const TRANSPORT_FAILURE_STATUS: u16 = 502;

/// Outcome of one upstream attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResult {
    pub status: u16,
    pub body: String,
}

impl UpstreamResult {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Connection error, timeout, or unreadable body.
    pub fn transport_failure() -> Self {
        Self::new(TRANSPORT_FAILURE_STATUS, String::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Performs a single GET against a mirror URL.
pub trait UpstreamClient: Send + Sync + 'static {
    fn fetch(&self, url: &Url) -> impl Future<Output = UpstreamResult> + Send;
}

/// `reqwest`-backed client used in production
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Build a client with a per-call timeout.
    ///
    /// Redirects are not followed and system proxy settings are ignored, so
    /// each mirror is contacted directly and a 3xx counts as a failed attempt.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(Policy::none())
            .no_proxy()
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self { client })
    }
}

impl UpstreamClient for HttpUpstream {
    fn fetch(&self, url: &Url) -> impl Future<Output = UpstreamResult> + Send {
        let request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json");
        let url = url.clone();

        async move {
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(upstream = %url, error = %e, "Upstream request failed");
                    return UpstreamResult::transport_failure();
                }
            };

            let status = response.status().as_u16();

            match response.text().await {
                Ok(body) => UpstreamResult::new(status, body),
                Err(e) => {
                    tracing::debug!(upstream = %url, status, error = %e, "Failed to read upstream body");
                    UpstreamResult::transport_failure()
                }
            }
        }
    }
}
