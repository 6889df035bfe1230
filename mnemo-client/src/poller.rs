//! Availability poller.
//!
//! A bounded retry loop over an injected [`Sleeper`], so tests can run it
//! without wall-clock time.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ClientError, ClientResult};
use crate::probe::{ProbeResult, Prober};

/// Suspends the current flow between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Attempt bound and spacing for a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(1))
    }
}

/// Run `attempt` until it returns `true`, at most `policy.max_attempts` times.
///
/// Sleeps `policy.interval` between attempts, never after the last one.
///
/// # Errors
/// `ClientError::Timeout` when every attempt returned `false`.
pub async fn retry<F, Fut>(policy: PollPolicy, sleeper: &dyn Sleeper, mut attempt: F) -> ClientResult<()>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    for n in 1..=policy.max_attempts {
        if attempt(n).await {
            return Ok(());
        }
        if n < policy.max_attempts {
            sleeper.sleep(policy.interval).await;
        }
    }
    Err(ClientError::Timeout {
        attempts: policy.max_attempts,
    })
}

/// Wait until `url` answers a probe with 2xx.
///
/// Non-2xx responses and transport failures both count as "not yet".
pub async fn wait_until_available(
    prober: &dyn Prober,
    sleeper: &dyn Sleeper,
    url: &str,
    policy: PollPolicy,
) -> ClientResult<()> {
    let result = retry(policy, sleeper, |n| async move {
        let outcome = prober.probe(url).await;
        match &outcome {
            ProbeResult::Found => tracing::debug!(url, attempt = n, "Artifact available"),
            other => tracing::trace!(url, attempt = n, outcome = ?other, "Artifact not yet available"),
        }
        outcome.is_found()
    })
    .await;

    if let Err(ClientError::Timeout { attempts }) = &result {
        tracing::warn!(url, attempts, "Artifact did not become available");
    }
    result
}
