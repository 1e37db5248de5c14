//! The executor: workflow lifecycle management

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::persistence::{StoreError, WorkflowStore};
use crate::workflow::{
    CancelScope, EventKind, Interrupted, Signal, SignalHub, WorkflowContext, WorkflowError,
    WorkflowFn, WorkflowState, WorkflowStatus,
};

use super::handle::WorkflowHandle;
use super::hooks::Hooks;

/// Well-known query types
pub mod query_types {
    /// Current (or persisted) status of a workflow
    pub const STATUS: &str = "status";

    /// Persisted result of a terminal workflow
    pub const RESULT: &str = "result";
}

/// Errors from executor operations
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Workflow is not currently running and no persisted record was found
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Query type is not supported
    #[error("unknown query type: {0}")]
    UnknownQueryType(String),

    /// Signal channel is full; the sender is outpacing the workflow
    #[error("signal buffer full for workflow {0}")]
    SignalBufferFull(String),

    /// Store error while answering a query
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Capacity of each per-name signal channel
    pub signal_buffer: usize,

    /// Prefix for generated workflow identifiers
    pub id_prefix: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            signal_buffer: 64,
            id_prefix: "wf".to_string(),
        }
    }
}

/// Per-execution options
#[derive(Debug, Clone, Default)]
pub struct WorkflowOptions {
    /// Workflow identifier; generated when empty
    pub id: Option<String>,

    /// Deadline for the whole workflow
    pub timeout: Option<Duration>,

    /// Caller-owned scope the workflow scope is derived from
    pub parent: Option<CancelScope>,
}

impl WorkflowOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workflow identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the workflow deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Derive the workflow scope from a caller-owned scope
    ///
    /// Cancelling the parent cancels the workflow, which then terminates as
    /// failed rather than canceled.
    pub fn with_parent(mut self, parent: CancelScope) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// The executor contract
///
/// Implementations manage workflow lifecycles: start, track, signal, query,
/// cancel. All operations are safe under concurrent callers.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Start a workflow and return its handle
    ///
    /// Launching always succeeds; failures surface through the handle.
    async fn execute(
        &self,
        f: WorkflowFn,
        input: Option<Value>,
        options: WorkflowOptions,
    ) -> WorkflowHandle;

    /// Deliver a signal to a running workflow
    async fn signal(&self, workflow_id: &str, signal: Signal) -> Result<(), ExecutorError>;

    /// Inspect a workflow from outside
    async fn query(&self, workflow_id: &str, query_type: &str) -> Result<Value, ExecutorError>;

    /// Request cancellation of a running workflow
    async fn cancel(&self, workflow_id: &str) -> Result<(), ExecutorError>;

    /// Install additional lifecycle hooks
    ///
    /// Hook sets compose in installation order. The default implementation
    /// ignores the hooks; implementations that fire hooks should override.
    fn install_hooks(&self, hooks: Hooks) {
        let _ = hooks;
    }
}

/// One entry in the running-workflow map
#[derive(Clone)]
struct RunningWorkflow {
    handle: WorkflowHandle,
    scope: CancelScope,
    cancel_requested: Arc<AtomicBool>,
    signals: Arc<SignalHub>,
    state: Arc<Mutex<WorkflowState>>,
}

struct ExecutorInner {
    config: ExecutorConfig,
    running: RwLock<HashMap<String, RunningWorkflow>>,
    store: Option<Arc<dyn WorkflowStore>>,
    hooks: RwLock<Arc<Hooks>>,
    root: CancelScope,
    next_id: AtomicU64,
}

/// In-process executor
///
/// Runs each workflow function on its own tokio task and keeps all live
/// state in memory. Initial and terminal states are persisted through the
/// attached store, best effort, for auditing and terminal-result queries.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemoryWorkflowStore::new());
/// let executor = LocalExecutor::with_store(store);
///
/// let handle = executor
///     .execute(
///         workflow_fn(|ctx, input| async move { Ok(input) }),
///         Some(json!("hello")),
///         WorkflowOptions::new().with_id("wf-echo"),
///     )
///     .await;
///
/// let result = handle.result().await?;
/// ```
pub struct LocalExecutor {
    inner: Arc<ExecutorInner>,
}

impl LocalExecutor {
    /// Create an executor with no store and default config
    pub fn new() -> Self {
        Self::with_config(None, ExecutorConfig::default())
    }

    /// Create an executor persisting through the given store
    pub fn with_store(store: Arc<dyn WorkflowStore>) -> Self {
        Self::with_config(Some(store), ExecutorConfig::default())
    }

    /// Create an executor with explicit store and config
    pub fn with_config(store: Option<Arc<dyn WorkflowStore>>, config: ExecutorConfig) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                config,
                running: RwLock::new(HashMap::new()),
                store,
                hooks: RwLock::new(Arc::new(Hooks::new())),
                root: CancelScope::new(),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Number of workflows currently running
    pub fn running_count(&self) -> usize {
        self.inner.running.read().len()
    }

    /// Cancel every running workflow
    ///
    /// Workflows observe the cancellation through their scopes and
    /// terminate as failed, the same as caller-context cancellation.
    pub fn shutdown(&self) {
        info!("executor shutting down, cancelling running workflows");
        self.inner.root.cancel(Interrupted::Canceled);
    }

    fn next_workflow_id(&self) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.inner.config.id_prefix, n)
    }

    #[instrument(skip(self, f, input, options))]
    async fn execute_inner(
        &self,
        f: WorkflowFn,
        input: Option<Value>,
        options: WorkflowOptions,
    ) -> WorkflowHandle {
        let workflow_id = match options.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => self.next_workflow_id(),
        };
        let run_id = Uuid::now_v7();
        info!(%workflow_id, %run_id, "starting workflow");

        let parent = options.parent.unwrap_or_else(|| self.inner.root.clone());
        let scope = parent.child();
        let watcher = options
            .timeout
            .filter(|d| !d.is_zero())
            .map(|timeout| scope.deadline_watcher(timeout));

        let handle = WorkflowHandle::new(workflow_id.clone(), run_id);
        let signals = Arc::new(SignalHub::new(self.inner.config.signal_buffer));

        let mut initial = WorkflowState::new(workflow_id.clone(), run_id, input.clone());
        initial.record_event(EventKind::WorkflowStarted {
            input: input.clone(),
        });
        let state = Arc::new(Mutex::new(initial));

        let record = RunningWorkflow {
            handle: handle.clone(),
            scope: scope.clone(),
            cancel_requested: Arc::new(AtomicBool::new(false)),
            signals: signals.clone(),
            state: state.clone(),
        };

        if self
            .inner
            .running
            .write()
            .insert(workflow_id.clone(), record.clone())
            .is_some()
        {
            warn!(%workflow_id, "replaced a running workflow with the same id");
        }

        if let Some(store) = &self.inner.store {
            let snapshot = state.lock().clone();
            if let Err(error) = store.save(&snapshot).await {
                warn!(%workflow_id, %error, "failed to persist initial workflow state");
            }
        }

        let hooks = self.inner.hooks.read().clone();
        hooks.fire_workflow_start(&workflow_id, input.as_ref());

        let ctx = WorkflowContext::new(
            workflow_id.clone(),
            run_id,
            input.clone(),
            scope,
            signals,
            state,
            hooks,
        );

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let output = f(ctx, input).await;
            finish_workflow(&inner, &workflow_id, record, output, watcher).await;
        });

        handle
    }

    #[instrument(skip(self, signal))]
    async fn signal_inner(&self, workflow_id: &str, signal: Signal) -> Result<(), ExecutorError> {
        let record = self
            .inner
            .running
            .read()
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| ExecutorError::WorkflowNotFound(workflow_id.to_string()))?;

        if record.handle.status() != WorkflowStatus::Running {
            return Err(ExecutorError::WorkflowNotFound(workflow_id.to_string()));
        }

        let tx = record.signals.sender(&signal.name);
        let hooks = self.inner.hooks.read().clone();
        hooks.fire_signal(workflow_id, &signal);

        tx.try_send(signal.payload.clone())
            .map_err(|_| ExecutorError::SignalBufferFull(workflow_id.to_string()))?;

        record.state.lock().record_event(EventKind::SignalReceived {
            signal_name: signal.name.clone(),
            signal_payload: signal.payload,
        });

        debug!(%workflow_id, signal = %signal.name, "signal delivered");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn query_inner(
        &self,
        workflow_id: &str,
        query_type: &str,
    ) -> Result<Value, ExecutorError> {
        let running = self.inner.running.read().get(workflow_id).cloned();
        if let Some(record) = running {
            return match query_type {
                query_types::STATUS => Ok(serde_json::json!(record.handle.status())),
                other => Err(ExecutorError::UnknownQueryType(other.to_string())),
            };
        }

        let Some(store) = &self.inner.store else {
            return Err(ExecutorError::WorkflowNotFound(workflow_id.to_string()));
        };
        let Some(state) = store.load(workflow_id).await? else {
            return Err(ExecutorError::WorkflowNotFound(workflow_id.to_string()));
        };

        match query_type {
            query_types::STATUS => Ok(serde_json::json!(state.status)),
            query_types::RESULT => Ok(state.result.unwrap_or(Value::Null)),
            other => Err(ExecutorError::UnknownQueryType(other.to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn cancel_inner(&self, workflow_id: &str) -> Result<(), ExecutorError> {
        // The whole critical section runs under the read lock so that
        // termination (which takes the write lock to unregister) cannot
        // interleave with a cancel on the same record.
        let running = self.inner.running.read();
        let record = running
            .get(workflow_id)
            .ok_or_else(|| ExecutorError::WorkflowNotFound(workflow_id.to_string()))?;

        record.cancel_requested.store(true, Ordering::SeqCst);
        record.handle.mark_canceled();
        record.scope.cancel(Interrupted::Canceled);

        info!(%workflow_id, "workflow cancel requested");
        Ok(())
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(
        &self,
        f: WorkflowFn,
        input: Option<Value>,
        options: WorkflowOptions,
    ) -> WorkflowHandle {
        self.execute_inner(f, input, options).await
    }

    async fn signal(&self, workflow_id: &str, signal: Signal) -> Result<(), ExecutorError> {
        self.signal_inner(workflow_id, signal).await
    }

    async fn query(&self, workflow_id: &str, query_type: &str) -> Result<Value, ExecutorError> {
        self.query_inner(workflow_id, query_type).await
    }

    async fn cancel(&self, workflow_id: &str) -> Result<(), ExecutorError> {
        self.cancel_inner(workflow_id).await
    }

    fn install_hooks(&self, hooks: Hooks) {
        let mut current = self.inner.hooks.write();
        let composed = Hooks::compose([(**current).clone(), hooks]);
        *current = Arc::new(composed);
    }
}

/// Termination processing for one workflow
///
/// Runs on the workflow's task after the function returns. Unregisters the
/// record, resolves the terminal status (an explicit cancel wins over the
/// raw scope state), records the terminal event, releases `result` callers,
/// and persists the final state best effort.
async fn finish_workflow(
    inner: &Arc<ExecutorInner>,
    workflow_id: &str,
    record: RunningWorkflow,
    output: Result<Option<Value>, WorkflowError>,
    watcher: Option<tokio::task::JoinHandle<()>>,
) {
    inner.running.write().remove(workflow_id);
    if let Some(watcher) = watcher {
        watcher.abort();
    }

    let canceled = record.cancel_requested.load(Ordering::SeqCst);
    let (status, result, error) = if canceled {
        let error = match output {
            Err(error) => error,
            Ok(_) => WorkflowError::from(Interrupted::Canceled),
        };
        (WorkflowStatus::Canceled, None, Some(error))
    } else {
        match output {
            Ok(_) if record.scope.is_canceled() => {
                // The function returned cleanly under a cancelled scope;
                // adopt the interrupt cause as the workflow error
                let error = WorkflowError::from(record.scope.interrupt_error());
                (WorkflowStatus::Failed, None, Some(error))
            }
            Ok(result) => (WorkflowStatus::Completed, result, None),
            Err(error) => (WorkflowStatus::Failed, None, Some(error)),
        }
    };

    {
        let mut state = record.state.lock();
        match status {
            WorkflowStatus::Completed => state.complete(result.clone()),
            WorkflowStatus::Failed => {
                state.fail(error.as_ref().map(|e| e.message.clone()).unwrap_or_default())
            }
            WorkflowStatus::Canceled => {
                state.cancel(error.as_ref().map(|e| e.message.clone()).unwrap_or_default())
            }
            WorkflowStatus::Running => unreachable!("terminal status resolved above"),
        }
    }

    record
        .handle
        .record_outcome(status, result.clone(), error.clone());

    let hooks = inner.hooks.read().clone();
    match &error {
        None => {
            info!(%workflow_id, "workflow completed");
            hooks.fire_workflow_complete(workflow_id, result.as_ref());
        }
        Some(error) => {
            info!(%workflow_id, %status, %error, "workflow did not complete");
            hooks.fire_workflow_fail(workflow_id, error);
        }
    }

    record.handle.mark_done();

    // Termination also cancels the workflow scope, releasing anything
    // still derived from it
    record.scope.cancel(Interrupted::Canceled);

    if let Some(store) = &inner.store {
        let snapshot = record.state.lock().clone();
        if let Err(error) = store.save(&snapshot).await {
            warn!(%workflow_id, %error, "failed to persist terminal workflow state");
        }
    }
}
