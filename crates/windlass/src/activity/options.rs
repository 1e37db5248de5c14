//! Options for activity execution

use std::time::Duration;

use crate::reliability::RetryPolicy;

pub(crate) const DEFAULT_ACTIVITY_NAME: &str = "activity";

/// Options for a single activity invocation
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use windlass::{ActivityOptions, RetryPolicy};
///
/// let options = ActivityOptions::new()
///     .with_name("charge_card")
///     .with_timeout(Duration::from_secs(30))
///     .with_retry_policy(RetryPolicy::exponential().with_max_attempts(3));
/// # let _ = options;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActivityOptions {
    /// Name recorded in history events and passed to the activity context
    pub name: Option<String>,

    /// Overall deadline for the invocation, retries included
    pub timeout: Option<Duration>,

    /// Retry policy; `None` means a single attempt
    pub retry_policy: Option<RetryPolicy>,
}

impl ActivityOptions {
    /// Create options with no timeout and no retries
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the activity name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the overall invocation deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_ACTIVITY_NAME)
    }

    pub(crate) fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|d| !d.is_zero())
    }
}
