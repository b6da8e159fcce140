//! Retry with exponential backoff for proposer calls
//!
//! Transient provider failures (rate limiting, connection errors, timeouts)
//! are retried here, inside the proposer collaborator. The design loop above
//! never sees them as separate attempts.
//!
//! Backoff doubles with each retry: 4s -> 8s -> 16s -> 32s -> 60s (max).

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{LLMError, LLMProvider, Result};
use crate::config::RetryConfig;

/// Retry policy with exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries before giving up
    pub max_retries: u32,

    /// Initial backoff duration in milliseconds
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff_ms: 4_000,
            max_backoff_ms: 60_000,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(32);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Execute an async operation, retrying transient failures
    ///
    /// Non-transient errors are returned immediately. After `max_retries`
    /// retries the last transient error is returned.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.backoff_for(retry);
                    warn!(
                        "Transient provider error ({}). Retry {}/{} in {:?}",
                        e, retry, self.max_retries, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    debug!("Provider call failed after {} retries: {}", retry, e);
                    return Err(e);
                }
            }
        }
    }
}

/// Provider wrapper that applies a [`RetryPolicy`] to every completion
pub struct RetryingProvider {
    inner: Arc<dyn LLMProvider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LLMProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LLMProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.policy
            .execute(|| self.inner.complete(prompt))
            .await
    }

    async fn check_health(&self) -> bool {
        self.inner.check_health().await
    }
}
