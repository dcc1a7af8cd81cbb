//! Exponential backoff retry logic shared by both directory clients.

use std::time::Duration;
use tracing::{debug, warn};

/// Error classification consumed by [`RetryPolicy`].
///
/// Both directory client error types implement this so retry decisions live
/// in one place rather than per client.
pub trait RetryableError: std::fmt::Display {
    /// Transient failures worth retrying (network errors, rate limiting,
    /// timeouts).
    fn is_retryable(&self) -> bool;

    /// Server-side 5xx errors, retried separately from transient failures.
    fn is_server_error(&self) -> bool {
        false
    }

    /// Server-suggested delay in seconds, if the failure carried one
    /// (e.g. a `Retry-After` header on a rate-limit response).
    fn retry_after_secs(&self) -> Option<u64> {
        None
    }

    /// Construct the error reported after the final attempt fails.
    fn exhausted(attempts: u32, message: String) -> Self;
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Base delay in seconds for exponential backoff.
    pub base_delay_secs: u64,
    /// Maximum delay cap in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_secs: 2,
            max_delay_secs: 60,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with the given max retries and base delay.
    /// The maximum delay cap defaults to 60 seconds.
    #[must_use]
    pub fn new(max_retries: u32, base_delay_secs: u64) -> Self {
        Self {
            max_retries,
            base_delay_secs,
            max_delay_secs: 60,
        }
    }

    /// Whether the error should be retried at the given attempt number.
    pub fn should_retry<E: RetryableError>(&self, attempt: u32, error: &E) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        error.is_retryable() || error.is_server_error()
    }

    /// Calculate delay for the given attempt using exponential backoff.
    ///
    /// If the error carries a server-suggested delay, that value is used
    /// directly (capped at `max_delay_secs`). Otherwise the delay is
    /// `min(base_delay_secs * 2^attempt, max_delay_secs)`.
    pub fn delay_for<E: RetryableError>(&self, attempt: u32, error: &E) -> Duration {
        let secs = match error.retry_after_secs() {
            Some(retry_after) => retry_after.min(self.max_delay_secs),
            None => {
                let exponential = self
                    .base_delay_secs
                    .saturating_mul(2u64.saturating_pow(attempt));
                exponential.min(self.max_delay_secs)
            }
        };
        Duration::from_secs(secs)
    }

    /// Execute an async operation with retry.
    ///
    /// The closure `f` is called repeatedly until it succeeds, a
    /// non-retryable error is encountered, or the maximum number of retries
    /// is exhausted.
    pub async fn execute<F, Fut, T, E>(&self, operation_name: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: RetryableError,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(
                            operation = operation_name,
                            attempt = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !self.should_retry(attempt, &error) {
                        if attempt >= self.max_retries {
                            warn!(
                                operation = operation_name,
                                attempts = attempt + 1,
                                error = %error,
                                "Max retries exceeded"
                            );
                            return Err(E::exhausted(
                                attempt + 1,
                                format!(
                                    "{operation_name} failed after {} attempt(s): {error}",
                                    attempt + 1
                                ),
                            ));
                        }
                        // Non-retryable error, return immediately.
                        return Err(error);
                    }

                    let delay = self.delay_for(attempt, &error);
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs(),
                        error = %error,
                        "Retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
