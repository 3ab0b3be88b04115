//! Bounded retry with exponential backoff for transient provider failures.
//!
//! Only errors for which [`EmbeddingError::is_retryable`] holds are retried.
//! Validation errors fail on the first attempt.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::EmbeddingError;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call.
    pub max_retries: u32,
    /// Base delay between retries (doubled on every attempt).
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Maximum delay between retries.
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Longest a retried call can take when every attempt runs into
    /// `call_timeout`, counting the largest possible backoff sleeps.
    pub fn worst_case(&self, call_timeout: Duration) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let sleeps: Duration = (0..self.max_retries)
            .map(|attempt| {
                let delay = capped_delay(self, attempt);
                if self.jitter {
                    delay + delay / 2
                } else {
                    delay
                }
            })
            .sum();
        call_timeout.saturating_mul(attempts).saturating_add(sleeps)
    }
}

/// Outcome of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryResult<T> {
    pub result: Result<T, EmbeddingError>,
    /// Number of attempts made (1 = no retries needed).
    pub attempts: u32,
    /// Total time spent across attempts and backoff sleeps.
    pub total_duration: Duration,
}

impl<T> RetryResult<T> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, EmbeddingError> {
        self.result
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent. `operation` receives the zero-based attempt number.
pub async fn execute_with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> RetryResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, EmbeddingError>>,
{
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                };
            }
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "provider call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                return RetryResult {
                    result: Err(err),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                };
            }
        }
    }
}

/// Exponential backoff capped at `max_delay`.
fn capped_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config.base_delay.as_millis() as u64;
    let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
    Duration::from_millis(exponential.min(config.max_delay.as_millis() as u64))
}

/// [`capped_delay`] plus up to 50% jitter.
fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let delay = capped_delay(config, attempt);
    if config.jitter {
        let jitter = fastrand::u64(0..=delay.as_millis() as u64 / 2);
        delay + Duration::from_millis(jitter)
    } else {
        delay
    }
}
