//! Retry policy and the cancellable retry driver

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activity::ActivityError;
use crate::workflow::{CancelScope, Interrupted};

const MIN_INITIAL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_BACKOFF_COEFFICIENT: f64 = 2.0;

/// Configuration for activity retries
///
/// Exponential backoff with bounded jitter. Each wait is the current
/// interval scaled by a uniform factor in `[0.5, 1.5)`, so consecutive
/// failures across many workflows do not land on the same instant.
///
/// # Example
///
/// ```
/// use windlass::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential()
///     .with_max_attempts(5)
///     .with_initial_interval(Duration::from_secs(1))
///     .with_max_interval(Duration::from_secs(60));
///
/// // First retry after ~1 second
/// // Second retry after ~2 seconds
/// // Third retry after ~4 seconds
/// // etc.
/// # let _ = policy;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial one)
    ///
    /// Values below 1 behave as 1.
    pub max_attempts: u32,

    /// Delay before the first retry
    ///
    /// A zero interval behaves as 100 milliseconds.
    #[serde(with = "duration_millis")]
    pub initial_interval: Duration,

    /// Cap on the delay between retries (zero means unbounded)
    #[serde(with = "duration_millis")]
    pub max_interval: Duration,

    /// Backoff multiplier (e.g., 2.0 for exponential)
    ///
    /// Values at or below zero behave as 2.0.
    pub backoff_coefficient: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}

impl RetryPolicy {
    /// Create an exponential backoff retry policy with sensible defaults
    ///
    /// - 5 max attempts
    /// - 1 second initial interval
    /// - 60 second max interval
    /// - 2x backoff coefficient
    pub fn exponential() -> Self {
        Self {
            max_attempts: 5,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
            backoff_coefficient: 2.0,
        }
    }

    /// Create a policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            backoff_coefficient: 1.0,
        }
    }

    /// Create a policy with fixed intervals (no backoff)
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_interval: interval,
            max_interval: interval,
            backoff_coefficient: 1.0,
        }
    }

    /// Set the maximum number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the initial retry interval
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Set the maximum retry interval
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Set the backoff coefficient
    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    fn clamp_interval(&self, interval: Duration) -> Duration {
        if !self.max_interval.is_zero() && interval > self.max_interval {
            self.max_interval
        } else {
            interval
        }
    }

    /// Drive `op` until it succeeds or this policy gives up
    ///
    /// Attempt numbers passed to `op` are 1-based. Cancellation is checked
    /// before every attempt and interrupts backoff sleeps immediately.
    /// `on_retry` fires for each failed attempt that will be retried; an
    /// error marked non-retryable short-circuits without firing it.
    pub async fn run<T, F, Fut, R>(
        &self,
        scope: &CancelScope,
        mut on_retry: R,
        mut op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ActivityError>>,
        R: FnMut(&ActivityError),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut interval = if self.initial_interval.is_zero() {
            MIN_INITIAL_INTERVAL
        } else {
            self.initial_interval
        };
        let coefficient = if self.backoff_coefficient <= 0.0 {
            DEFAULT_BACKOFF_COEFFICIENT
        } else {
            self.backoff_coefficient
        };

        let mut attempt = 1u32;
        loop {
            if scope.is_canceled() {
                return Err(scope.interrupt_error().into());
            }

            let error = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.retryable {
                return Err(RetryError::Permanent(error));
            }
            if attempt >= max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: max_attempts,
                    last: error,
                });
            }

            on_retry(&error);

            // The 0.5 floor keeps jitter from ever producing a zero wait
            let wait = {
                let factor = rand::thread_rng().gen_range(0.5..1.5);
                self.clamp_interval(interval.mul_f64(factor))
            };
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = scope.cancelled() => return Err(scope.interrupt_error().into()),
            }

            interval = self.clamp_interval(interval.mul_f64(coefficient));
            attempt += 1;
        }
    }
}

/// Errors from the retry driver
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// Cancellation observed before or between attempts
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// The operation failed with an error marked non-retryable
    #[error(transparent)]
    Permanent(ActivityError),

    /// Every attempt failed
    #[error("failed after {attempts} attempts: {last}")]
    Exhausted {
        /// How many attempts ran
        attempts: u32,
        /// The error from the final attempt
        #[source]
        last: ActivityError,
    },
}

impl RetryError {
    /// Collapse into an [`ActivityError`] for activity callers
    pub fn into_activity_error(self) -> ActivityError {
        match self {
            Self::Interrupted(interrupted) => interrupted.into(),
            Self::Permanent(error) => error,
            Self::Exhausted { attempts, last } => ActivityError {
                message: format!("failed after {attempts} attempts: {}", last.message),
                error_type: last.error_type,
                retryable: false,
            },
        }
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
