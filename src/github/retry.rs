//! Exponential backoff.
//!
//! Two schedules share one shape:
//!
//! - [`RetryConfig::DEFAULT`] for individual GitHub API calls (3 retries,
//!   2s, 4s, 8s);
//! - [`RetryConfig::JOBS`] for rescheduling failed jobs (5 retries starting
//!   at 30s, capped at 30 minutes).
//!
//! Only transient API errors are retried in place, and only for queries. Permanent errors and SHA
//! mismatches are returned immediately.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::error::{GitHubApiError, GitHubErrorKind};

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,

    /// Initial delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Retries for a single GitHub API call.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(16),
        backoff_multiplier: 2.0,
    };

    /// A single attempt.
    pub const NONE: Self = Self {
        max_retries: 0,
        initial_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        backoff_multiplier: 1.0,
    };

    /// Rescheduling of failed jobs by the queue runner.
    ///
    /// Long enough to ride out a pull request that is waiting on CI.
    pub const JOBS: Self = Self {
        max_retries: 5,
        initial_delay: Duration::from_secs(30),
        max_delay: Duration::from_secs(30 * 60),
        backoff_multiplier: 2.0,
    };

    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Computes the delay for the given retry attempt (0-indexed).
    ///
    /// `initial_delay * backoff_multiplier^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }

    /// Returns true if a job that has failed `attempts` times may run again.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_retries
    }

    /// Returns an iterator over all retry delays.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|attempt| self.delay_for_attempt(attempt))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Outcome of [`retry_with_backoff`].
#[derive(Debug)]
pub enum RetryResult<T> {
    Success(T),

    /// Still failing transiently after the last retry.
    ExhaustedRetries {
        last_error: GitHubApiError,
        /// Attempts made, including the first.
        attempts: u32,
    },

    PermanentError(GitHubApiError),

    ShaMismatch(GitHubApiError),
}

impl<T> RetryResult<T> {
    pub fn into_result(self) -> Result<T, GitHubApiError> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::ExhaustedRetries { last_error, .. } => Err(last_error),
            RetryResult::PermanentError(e) => Err(e),
            RetryResult::ShaMismatch(e) => Err(e),
        }
    }
}

/// Runs `operation`, retrying transient errors per `config`.
pub async fn retry_with_backoff<T, F, Fut>(config: RetryConfig, mut operation: F) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubApiError>>,
{
    let max_attempts = config.max_retries + 1;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) => {
                attempt += 1;

                match e.kind {
                    GitHubErrorKind::Permanent => return RetryResult::PermanentError(e),
                    GitHubErrorKind::ShaMismatch => return RetryResult::ShaMismatch(e),
                    GitHubErrorKind::Transient => {
                        if attempt >= max_attempts {
                            return RetryResult::ExhaustedRetries {
                                last_error: e,
                                attempts: attempt,
                            };
                        }

                        let delay = config.delay_for_attempt(attempt - 1);
                        debug!(attempt, ?delay, error = %e, "Transient GitHub error, retrying");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
