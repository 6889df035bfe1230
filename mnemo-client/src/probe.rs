//! Existence probes against the public artifact host.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::ClientResult;

/// Outcome of one existence probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// 2xx: the artifact is retrievable.
    Found,
    /// 404: the artifact does not exist (yet).
    NotFound,
    /// Any other status.
    Unexpected(u16),
    /// The request never produced a response.
    TransportError(String),
}

impl ProbeResult {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => ProbeResult::Found,
            404 => ProbeResult::NotFound,
            other => ProbeResult::Unexpected(other),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ProbeResult::Found)
    }
}

/// Asks whether a URL is currently retrievable.
///
/// Probes never fail: transport problems are reported as a result variant.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeResult;
}

/// Append a cache-defeating query parameter.
pub fn cache_busted(url: &str, stamp_millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}_={}", url, separator, stamp_millis)
}

/// HEAD-request prober.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeResult {
        let target = cache_busted(url, chrono::Utc::now().timestamp_millis());
        match self.client.head(&target).send().await {
            Ok(response) => {
                let status: StatusCode = response.status();
                ProbeResult::from_status(status.as_u16())
            }
            Err(e) => ProbeResult::TransportError(e.to_string()),
        }
    }
}
