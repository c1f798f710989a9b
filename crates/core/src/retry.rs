//! Credential-rotating retry.
//!
//! A rate limit belongs to a credential, not to a request, so the primary
//! mitigation is moving to the next pool client. The pause between attempts
//! is flat and short; it only keeps consecutive attempts out of the same
//! sub-second window.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::core::error::{SdkError, TransportError};
use crate::core::pool::CredentialPool;

/// Configuration for rotation retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries beyond the first attempt; the pool size raises this floor.
    pub max_retries: u32,
    /// Flat pause after a rate-limited or overloaded attempt.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// No pause between attempts; rotation only.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Duration::ZERO,
        }
    }

    pub fn custom(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Total attempts for a pool of `pool_size` clients.
    ///
    /// Always covers every credential once, even with a small retry budget.
    pub fn attempts_for(&self, pool_size: usize) -> usize {
        pool_size.max(self.max_retries as usize + 1)
    }
}

/// Trait for determining if an error should move on to the next credential
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Extract retry-after hint if available (in milliseconds for compatibility)
    fn retry_after_ms(&self) -> Option<u64> {
        None
    }
}

impl Retryable for SdkError {
    fn is_retryable(&self) -> bool {
        self.kind().is_rotatable()
    }

    fn retry_after_ms(&self) -> Option<u64> {
        match self {
            SdkError::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            SdkError::Overloaded { source, .. } => {
                source.as_deref().and_then(TransportError::retry_after_ms)
            }
            _ => None,
        }
    }
}

/// Runs operations against successive pool clients.
pub struct RetryCoordinator<C> {
    pool: Arc<CredentialPool<C>>,
    config: RetryConfig,
}

impl<C> Clone for RetryCoordinator<C> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            config: self.config.clone(),
        }
    }
}

impl<C> RetryCoordinator<C> {
    pub fn new(pool: Arc<CredentialPool<C>>, config: RetryConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &Arc<CredentialPool<C>> {
        &self.pool
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute with the configured retry budget.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, SdkError>
    where
        F: FnMut(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, SdkError>>,
    {
        self.execute_with_retry(operation, self.config.max_retries)
            .await
    }

    /// Execute `operation` against successive clients.
    ///
    /// Makes up to `max(pool size, max_retries + 1)` attempts. Rate-limited
    /// and overloaded failures rotate to the next client after the flat
    /// backoff; any other failure is returned at once. When every attempt
    /// is throttled the last failure is returned.
    pub async fn execute_with_retry<F, Fut, T>(
        &self,
        mut operation: F,
        max_retries: u32,
    ) -> Result<T, SdkError>
    where
        F: FnMut(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, SdkError>>,
    {
        let config = RetryConfig {
            max_retries,
            backoff: self.config.backoff,
        };
        let attempts = config.attempts_for(self.pool.size());
        let mut last_error: Option<SdkError> = None;

        for attempt in 1..=attempts {
            let (slot, client) = self.pool.acquire_indexed()?;
            match operation(client).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    tracing::warn!(
                        target: "storyboard::retry",
                        attempt,
                        attempts,
                        slot,
                        kind = ?err.kind(),
                        retry_after_ms = ?err.retry_after_ms(),
                        "credential throttled, switching"
                    );
                    last_error = Some(err);
                    if attempt < attempts && !config.backoff.is_zero() {
                        tokio::time::sleep(config.backoff).await;
                    }
                }
                Err(err) => {
                    tracing::debug!(
                        target: "storyboard::retry",
                        attempt,
                        slot,
                        kind = ?err.kind(),
                        error = %err,
                        "non-rotatable failure"
                    );
                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or(SdkError::PoolUninitialized))
    }
}
