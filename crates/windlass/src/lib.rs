//! # Windlass
//!
//! An in-process durable workflow execution engine.
//!
//! ## Features
//!
//! - **Workflow functions as tasks**: each workflow runs on its own tokio
//!   task, driven entirely through its [`WorkflowContext`]
//! - **Event-sourced history**: every step is recorded as an append-only
//!   [`HistoryEvent`] list, persisted for auditing and result retrieval
//! - **Automatic retries**: configurable [`RetryPolicy`] with exponential
//!   backoff and bounded jitter
//! - **Signals and queries**: named FIFO signal channels into running
//!   workflows, read-only queries from outside
//! - **Cooperative cancellation**: deadlines and explicit cancels propagate
//!   through [`CancelScope`] trees
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       LocalExecutor                          │
//! │  (starts, tracks, signals, queries, cancels workflows)      │
//! └─────────────────────────────────────────────────────────────┘
//!               │                                │
//!               ▼                                ▼
//! ┌───────────────────────────┐    ┌───────────────────────────┐
//! │      WorkflowContext       │    │       WorkflowStore       │
//! │  (activities, signals,     │    │  (save / load / list /    │
//! │   durable sleep)           │    │   delete workflow states) │
//! └───────────────────────────┘    └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use windlass::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), WorkflowError> {
//! let store = Arc::new(InMemoryWorkflowStore::new());
//! let executor = LocalExecutor::with_store(store);
//!
//! let handle = executor
//!     .execute(
//!         workflow_fn(|ctx, input| async move {
//!             let result = ctx
//!                 .execute_activity(
//!                     activity_fn(|_actx, input| async move { Ok(input) }),
//!                     input,
//!                     ActivityOptions::new().with_name("echo"),
//!                 )
//!                 .await?;
//!             Ok(result)
//!         }),
//!         Some(json!("hello")),
//!         WorkflowOptions::new().with_id("wf-example"),
//!     )
//!     .await;
//!
//! let result = handle.result().await?;
//! assert_eq!(result, Some(json!("hello")));
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod engine;
pub mod persistence;
pub mod reliability;
pub mod workflow;

/// Prelude for common imports
pub mod prelude {
    pub use crate::activity::{activity_fn, ActivityContext, ActivityError, ActivityOptions};
    pub use crate::engine::{
        Executor, ExecutorConfig, ExecutorError, Hooks, LocalExecutor, WorkflowHandle,
        WorkflowOptions,
    };
    pub use crate::persistence::{InMemoryWorkflowStore, StoreError, WorkflowStore};
    pub use crate::reliability::RetryPolicy;
    pub use crate::workflow::{
        workflow_fn, Signal, WorkflowContext, WorkflowError, WorkflowFilter, WorkflowState,
        WorkflowStatus,
    };
}

// Re-export key types at crate root
pub use activity::{activity_fn, ActivityContext, ActivityError, ActivityFn, ActivityOptions};
pub use engine::{
    apply, query_types, registry, with_hooks, Executor, ExecutorConfig, ExecutorError, Hooks,
    LocalExecutor, Middleware, WorkflowHandle, WorkflowOptions,
};
pub use persistence::{InMemoryWorkflowStore, StoreError, WorkflowStore};
pub use reliability::{RetryError, RetryPolicy};
pub use workflow::{
    workflow_fn, CancelScope, EventKind, HistoryEvent, Interrupted, Signal, SignalReceiver,
    WorkflowContext, WorkflowError, WorkflowFilter, WorkflowFn, WorkflowState, WorkflowStatus,
};
