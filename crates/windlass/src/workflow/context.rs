//! The deterministic API exposed to workflow code

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::activity::{runner, ActivityError, ActivityFn, ActivityOptions};
use crate::engine::Hooks;

use super::cancel::{CancelScope, Interrupted};
use super::event::EventKind;
use super::signal::{SignalHub, SignalReceiver};
use super::state::WorkflowState;

/// Error type for workflow failures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowError {
    /// Error message
    pub message: String,

    /// Error code for programmatic handling
    pub code: Option<String>,

    /// Whether this error is retryable
    pub retryable: bool,
}

impl WorkflowError {
    /// Create a new workflow error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            retryable: false,
        }
    }

    /// Create a retryable error
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            retryable: true,
        }
    }

    /// Set the error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for WorkflowError {}

impl From<Interrupted> for WorkflowError {
    fn from(interrupted: Interrupted) -> Self {
        Self::new(interrupted.to_string()).with_code(interrupted.code())
    }
}

impl From<ActivityError> for WorkflowError {
    fn from(error: ActivityError) -> Self {
        Self {
            message: error.message,
            code: error.error_type,
            retryable: error.retryable,
        }
    }
}

/// Type-erased workflow function
///
/// The function receives its context and the optional input it was started
/// with, and produces the workflow result. Use [`workflow_fn`] to build one
/// from a plain async closure.
pub type WorkflowFn = Arc<
    dyn Fn(WorkflowContext, Option<Value>) -> BoxFuture<'static, Result<Option<Value>, WorkflowError>>
        + Send
        + Sync,
>;

/// Wrap an async closure as a [`WorkflowFn`]
pub fn workflow_fn<F, Fut>(f: F) -> WorkflowFn
where
    F: Fn(WorkflowContext, Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Option<Value>, WorkflowError>> + Send + 'static,
{
    Arc::new(move |ctx, input| Box::pin(f(ctx, input)))
}

/// Per-workflow handle passed to workflow code
///
/// The context is the only channel between a workflow and the outside
/// world. Exactly three operations may suspend: [`execute_activity`],
/// [`receive_signal`] (reading from the returned channel), and [`sleep`].
/// All three unblock on workflow-scoped cancellation. Keeping side effects
/// behind this surface is what keeps replay feasible.
///
/// [`execute_activity`]: WorkflowContext::execute_activity
/// [`receive_signal`]: WorkflowContext::receive_signal
/// [`sleep`]: WorkflowContext::sleep
#[derive(Clone)]
pub struct WorkflowContext {
    workflow_id: String,
    run_id: Uuid,
    input: Option<Value>,
    scope: CancelScope,
    signals: Arc<SignalHub>,
    state: Arc<Mutex<WorkflowState>>,
    hooks: Arc<Hooks>,
}

impl WorkflowContext {
    pub(crate) fn new(
        workflow_id: impl Into<String>,
        run_id: Uuid,
        input: Option<Value>,
        scope: CancelScope,
        signals: Arc<SignalHub>,
        state: Arc<Mutex<WorkflowState>>,
        hooks: Arc<Hooks>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id,
            input,
            scope,
            signals,
            state,
            hooks,
        }
    }

    /// The workflow identifier
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// The unique identifier for this execution attempt
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The input the workflow was started with
    pub fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    /// Whether the workflow scope has been cancelled
    pub fn is_canceled(&self) -> bool {
        self.scope.is_canceled()
    }

    /// Resolve when the workflow scope is cancelled
    pub async fn cancelled(&self) {
        self.scope.cancelled().await
    }

    /// Run an activity, synchronously from the workflow's point of view
    ///
    /// The call spans the whole invocation: timeout, retries, and backoff.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let result = ctx
    ///     .execute_activity(
    ///         activity_fn(|_actx, input| async move { Ok(input) }),
    ///         Some(json!({"order_id": 7})),
    ///         ActivityOptions::new().with_name("lookup_order"),
    ///     )
    ///     .await?;
    /// ```
    pub async fn execute_activity(
        &self,
        f: ActivityFn,
        input: Option<Value>,
        options: ActivityOptions,
    ) -> Result<Option<Value>, ActivityError> {
        runner::run_activity(self, f, input, options).await
    }

    /// Obtain the receiving end of a named signal channel
    ///
    /// The channel is created lazily on first use of the name, by either
    /// this call or an incoming signal delivery. Repeated calls with the
    /// same name return the same live channel. Payloads arrive FIFO per
    /// name; ordering across names is undefined.
    pub fn receive_signal(&self, name: &str) -> SignalReceiver {
        self.signals.receiver(name, self.scope.clone())
    }

    /// Durable sleep
    ///
    /// Waits for `duration` or for cancellation, whichever comes first. A
    /// normal wake records a timer event in the workflow history.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        if self.scope.is_canceled() {
            return Err(self.scope.interrupt_error());
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {
                self.record_event(EventKind::TimerFired { duration });
                Ok(())
            }
            _ = self.scope.cancelled() => Err(self.scope.interrupt_error()),
        }
    }

    pub(crate) fn scope(&self) -> &CancelScope {
        &self.scope
    }

    pub(crate) fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub(crate) fn record_event(&self, kind: EventKind) {
        self.state.lock().record_event(kind);
    }
}
