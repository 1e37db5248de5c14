//! Composable lifecycle hooks

use std::sync::Arc;

use serde_json::Value;

use crate::activity::ActivityError;
use crate::workflow::{Signal, WorkflowError};

type ValueHook = Arc<dyn Fn(&str, Option<&Value>) + Send + Sync>;
type FailHook = Arc<dyn Fn(&str, &WorkflowError) + Send + Sync>;
type SignalHook = Arc<dyn Fn(&str, &Signal) + Send + Sync>;
type RetryHook = Arc<dyn Fn(&str, &ActivityError) + Send + Sync>;

/// Optional lifecycle callbacks fired by the executor
///
/// Every callback receives the workflow ID plus the datum relevant to the
/// event. Hooks run on the executor's own tasks and must not block; slow
/// work belongs on a worker dispatched from the hook.
///
/// # Example
///
/// ```
/// use windlass::Hooks;
///
/// let hooks = Hooks::new()
///     .on_workflow_start(|id, _input| println!("{id} started"))
///     .on_workflow_complete(|id, _result| println!("{id} completed"));
/// # let _ = hooks;
/// ```
#[derive(Clone, Default)]
pub struct Hooks {
    on_workflow_start: Option<ValueHook>,
    on_workflow_complete: Option<ValueHook>,
    on_workflow_fail: Option<FailHook>,
    on_activity_start: Option<ValueHook>,
    on_activity_complete: Option<ValueHook>,
    on_signal: Option<SignalHook>,
    on_retry: Option<RetryHook>,
}

impl Hooks {
    /// Create an empty hook set
    pub fn new() -> Self {
        Self::default()
    }

    /// Fired after the workflow is registered, before its function runs
    pub fn on_workflow_start(mut self, f: impl Fn(&str, Option<&Value>) + Send + Sync + 'static) -> Self {
        self.on_workflow_start = Some(Arc::new(f));
        self
    }

    /// Fired after a successful workflow return, before persistence
    pub fn on_workflow_complete(mut self, f: impl Fn(&str, Option<&Value>) + Send + Sync + 'static) -> Self {
        self.on_workflow_complete = Some(Arc::new(f));
        self
    }

    /// Fired after a failed (or canceled) workflow return, before persistence
    pub fn on_workflow_fail(mut self, f: impl Fn(&str, &WorkflowError) + Send + Sync + 'static) -> Self {
        self.on_workflow_fail = Some(Arc::new(f));
        self
    }

    /// Fired once before an activity's first attempt
    pub fn on_activity_start(mut self, f: impl Fn(&str, Option<&Value>) + Send + Sync + 'static) -> Self {
        self.on_activity_start = Some(Arc::new(f));
        self
    }

    /// Fired once after a successful activity return
    pub fn on_activity_complete(mut self, f: impl Fn(&str, Option<&Value>) + Send + Sync + 'static) -> Self {
        self.on_activity_complete = Some(Arc::new(f));
        self
    }

    /// Fired synchronously during signal delivery, before the payload is enqueued
    pub fn on_signal(mut self, f: impl Fn(&str, &Signal) + Send + Sync + 'static) -> Self {
        self.on_signal = Some(Arc::new(f));
        self
    }

    /// Fired for each failed activity attempt that will be retried
    pub fn on_retry(mut self, f: impl Fn(&str, &ActivityError) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(f));
        self
    }

    /// Merge two hook sets, calling `self`'s callbacks before `other`'s
    pub fn merge(self, other: Hooks) -> Hooks {
        Hooks {
            on_workflow_start: chain_value(self.on_workflow_start, other.on_workflow_start),
            on_workflow_complete: chain_value(self.on_workflow_complete, other.on_workflow_complete),
            on_workflow_fail: chain(self.on_workflow_fail, other.on_workflow_fail),
            on_activity_start: chain_value(self.on_activity_start, other.on_activity_start),
            on_activity_complete: chain_value(self.on_activity_complete, other.on_activity_complete),
            on_signal: chain(self.on_signal, other.on_signal),
            on_retry: chain(self.on_retry, other.on_retry),
        }
    }

    /// Compose hook sets into one, calling underlying hooks in declaration order
    pub fn compose<I: IntoIterator<Item = Hooks>>(sets: I) -> Hooks {
        sets.into_iter().fold(Hooks::new(), Hooks::merge)
    }

    pub(crate) fn fire_workflow_start(&self, workflow_id: &str, input: Option<&Value>) {
        if let Some(hook) = &self.on_workflow_start {
            hook(workflow_id, input);
        }
    }

    pub(crate) fn fire_workflow_complete(&self, workflow_id: &str, result: Option<&Value>) {
        if let Some(hook) = &self.on_workflow_complete {
            hook(workflow_id, result);
        }
    }

    pub(crate) fn fire_workflow_fail(&self, workflow_id: &str, error: &WorkflowError) {
        if let Some(hook) = &self.on_workflow_fail {
            hook(workflow_id, error);
        }
    }

    pub(crate) fn fire_activity_start(&self, workflow_id: &str, input: Option<&Value>) {
        if let Some(hook) = &self.on_activity_start {
            hook(workflow_id, input);
        }
    }

    pub(crate) fn fire_activity_complete(&self, workflow_id: &str, result: Option<&Value>) {
        if let Some(hook) = &self.on_activity_complete {
            hook(workflow_id, result);
        }
    }

    pub(crate) fn fire_signal(&self, workflow_id: &str, signal: &Signal) {
        if let Some(hook) = &self.on_signal {
            hook(workflow_id, signal);
        }
    }

    pub(crate) fn fire_retry(&self, workflow_id: &str, error: &ActivityError) {
        if let Some(hook) = &self.on_retry {
            hook(workflow_id, error);
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("on_workflow_start", &self.on_workflow_start.is_some())
            .field("on_workflow_complete", &self.on_workflow_complete.is_some())
            .field("on_workflow_fail", &self.on_workflow_fail.is_some())
            .field("on_activity_start", &self.on_activity_start.is_some())
            .field("on_activity_complete", &self.on_activity_complete.is_some())
            .field("on_signal", &self.on_signal.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

fn chain_value(first: Option<ValueHook>, second: Option<ValueHook>) -> Option<ValueHook> {
    match (first, second) {
        (Some(a), Some(b)) => Some(Arc::new(move |id, value| {
            a(id, value);
            b(id, value);
        })),
        (a, None) => a,
        (None, b) => b,
    }
}

fn chain<T: ?Sized + 'static>(
    first: Option<Arc<dyn Fn(&str, &T) + Send + Sync>>,
    second: Option<Arc<dyn Fn(&str, &T) + Send + Sync>>,
) -> Option<Arc<dyn Fn(&str, &T) + Send + Sync>> {
    match (first, second) {
        (Some(a), Some(b)) => Some(Arc::new(move |id, data| {
            a(id, data);
            b(id, data);
        })),
        (a, None) => a,
        (None, b) => b,
    }
}
