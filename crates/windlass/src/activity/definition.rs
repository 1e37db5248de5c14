//! Activity functions, errors, and execution context

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::workflow::{CancelScope, Interrupted};

/// Error type for activity failures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityError {
    /// Error message
    pub message: String,

    /// Error type/code for programmatic handling
    pub error_type: Option<String>,

    /// Whether this error is retryable
    ///
    /// Non-retryable errors fail the activity immediately, with no further
    /// retry attempts. Validation errors should always be non-retryable.
    pub retryable: bool,
}

impl ActivityError {
    /// Create a new retryable error
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            retryable: true,
        }
    }

    /// Create a non-retryable error
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            retryable: false,
        }
    }

    /// Set the error type
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }
}

impl std::fmt::Display for ActivityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActivityError {}

impl From<anyhow::Error> for ActivityError {
    fn from(err: anyhow::Error) -> Self {
        Self::retryable(err.to_string())
    }
}

impl From<Interrupted> for ActivityError {
    fn from(interrupted: Interrupted) -> Self {
        Self::non_retryable(interrupted.to_string()).with_type(interrupted.code())
    }
}

/// Context provided to activities during execution
///
/// Carries the cancellation scope the activity must observe, along with
/// attempt information when a retry policy is in play.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    workflow_id: String,
    activity_name: String,
    attempt: u32,
    scope: CancelScope,
}

impl ActivityContext {
    /// Create a context for invoking an activity function directly
    ///
    /// The engine builds contexts itself; this constructor exists for
    /// exercising activities in tests and in custom executors.
    pub fn new(
        workflow_id: impl Into<String>,
        activity_name: impl Into<String>,
        attempt: u32,
        scope: CancelScope,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            activity_name: activity_name.into(),
            attempt,
            scope,
        }
    }

    /// Workflow that owns this activity
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Name the activity was invoked under
    pub fn activity_name(&self) -> &str {
        &self.activity_name
    }

    /// Current attempt number (1-based)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Check if cancellation was requested
    ///
    /// Cancellation reaches the activity from the workflow scope or from an
    /// activity timeout, whichever fires first.
    pub fn is_canceled(&self) -> bool {
        self.scope.is_canceled()
    }

    /// Resolve when cancellation is requested
    ///
    /// Useful in select patterns:
    ///
    /// ```ignore
    /// tokio::select! {
    ///     result = do_work() => { /* ... */ }
    ///     _ = ctx.cancelled() => return Err(ctx.interrupt_error().into()),
    /// }
    /// ```
    pub async fn cancelled(&self) {
        self.scope.cancelled().await
    }

    /// The interrupt cause once cancellation has been observed
    pub fn interrupt_error(&self) -> Interrupted {
        self.scope.interrupt_error()
    }

    /// Wait for `duration`, or return early with the interrupt cause
    pub async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        if self.scope.is_canceled() {
            return Err(self.scope.interrupt_error());
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.scope.cancelled() => Err(self.scope.interrupt_error()),
        }
    }
}

/// Type-erased activity function
///
/// Activities take the execution context and an optional JSON input, and
/// produce an optional JSON result. Use [`activity_fn`] to build one from a
/// plain async closure.
pub type ActivityFn = Arc<
    dyn Fn(ActivityContext, Option<serde_json::Value>) -> BoxFuture<'static, Result<Option<serde_json::Value>, ActivityError>>
        + Send
        + Sync,
>;

/// Wrap an async closure as an [`ActivityFn`]
///
/// # Example
///
/// ```
/// use windlass::{activity_fn, ActivityError};
///
/// let double = activity_fn(|_ctx, input| async move {
///     let n = input
///         .as_ref()
///         .and_then(|v| v.as_i64())
///         .ok_or_else(|| ActivityError::non_retryable("expected a number"))?;
///     Ok(Some(serde_json::json!(n * 2)))
/// });
/// # let _ = double;
/// ```
pub fn activity_fn<F, Fut>(f: F) -> ActivityFn
where
    F: Fn(ActivityContext, Option<serde_json::Value>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Option<serde_json::Value>, ActivityError>> + Send + 'static,
{
    Arc::new(move |ctx, input| Box::pin(f(ctx, input)))
}
