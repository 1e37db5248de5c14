//! Workflow-side types: context, state, history, signals, cancellation

mod cancel;
mod context;
mod event;
mod signal;
mod state;

pub use cancel::{CancelScope, Interrupted};
pub use context::{workflow_fn, WorkflowContext, WorkflowError, WorkflowFn};
pub use event::{EventKind, HistoryEvent};
pub use signal::{Signal, SignalReceiver};
pub use state::{WorkflowFilter, WorkflowState, WorkflowStatus};

pub(crate) use signal::SignalHub;
