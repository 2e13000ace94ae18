//! Bounded retries with a per-call timeout for external calls

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::services::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub call_timeout: Option<Duration>,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
            call_timeout: (config.call_timeout_secs > 0)
                .then(|| Duration::from_secs(config.call_timeout_secs)),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&crate::config::Config::default().pipeline)
    }
}

/// Outcome of a call that never succeeded
#[derive(Debug)]
pub enum RetryError<E> {
    /// The last attempt failed, or the error is not worth retrying
    Failed(E),
    /// The last attempt exceeded the per-call timeout
    TimedOut(Duration),
}

impl<E> RetryError<E> {
    /// Convert into a pipeline error, using `wrap` for adapter failures
    pub fn into_pipeline(self, operation: &str, wrap: impl FnOnce(E) -> PipelineError) -> PipelineError {
        match self {
            RetryError::Failed(e) => wrap(e),
            RetryError::TimedOut(elapsed) => PipelineError::Timeout {
                operation: operation.to_string(),
                elapsed,
            },
        }
    }
}

/// Errors that may succeed when attempted again
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for anyhow::Error {
    fn is_retryable(&self) -> bool {
        !matches!(
            self.downcast_ref::<PipelineError>(),
            Some(PipelineError::MalformedResponse { .. })
        )
    }
}

impl Retryable for StorageError {
    fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Io(_) | StorageError::Backend(_))
    }
}

/// Run `call` until it succeeds, fails with a permanent error, or the
/// attempts are used up. The delay between attempts is fixed.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let started = Instant::now();
        let outcome = match policy.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, call()).await {
                Ok(result) => result.map_err(RetryError::Failed),
                Err(_) => Err(RetryError::TimedOut(started.elapsed())),
            },
            None => call().await.map_err(RetryError::Failed),
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let retryable = match &error {
            RetryError::Failed(e) => e.is_retryable(),
            RetryError::TimedOut(_) => true,
        };

        if !retryable || attempt >= attempts {
            return Err(error);
        }

        match &error {
            RetryError::Failed(e) => warn!(
                "{} failed (attempt {}/{}): {}",
                operation, attempt, attempts, e
            ),
            RetryError::TimedOut(elapsed) => warn!(
                "{} timed out after {:?} (attempt {}/{})",
                operation, elapsed, attempt, attempts
            ),
        }

        attempt += 1;
        tokio::time::sleep(policy.delay).await;
    }
}
