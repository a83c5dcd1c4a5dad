//! Support well-known resolver.
//!
//! One GET per call: no caching, no retries. Every failure mode collapses
//! into `FetchFailure`; callers are expected to treat the kinds alike and
//! only log the detail.

use async_trait::async_trait;
use thiserror::Error;

use muninn_core::error::BotError;
use muninn_core::protocol::SupportDocument;

#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("{url} returned an undecodable body: {reason}")]
    Decode { url: String, reason: String },
}

impl From<FetchFailure> for BotError {
    fn from(e: FetchFailure) -> Self {
        BotError::FetchFailure(e.to_string())
    }
}

pub fn support_url(server_name: &str) -> String {
    format!("https://{server_name}/.well-known/matrix/support")
}

#[async_trait]
pub trait SupportFetcher: Send + Sync {
    async fn fetch(&self, server_name: &str) -> Result<SupportDocument, FetchFailure>;
}

pub struct HttpSupportFetcher {
    http: reqwest::Client,
}

impl HttpSupportFetcher {
    /// `http` should carry the configured request timeout.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SupportFetcher for HttpSupportFetcher {
    async fn fetch(&self, server_name: &str) -> Result<SupportDocument, FetchFailure> {
        let url = support_url(server_name);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchFailure::Transport { url: url.clone(), reason: e.to_string() })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchFailure::Status { url, status: status.as_u16() });
        }

        // Content-Type is not checked; plenty of servers serve this as text/plain.
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchFailure::Transport { url: url.clone(), reason: e.to_string() })?;
        serde_json::from_slice(&body).map_err(|e| FetchFailure::Decode { url, reason: e.to_string() })
    }
}
