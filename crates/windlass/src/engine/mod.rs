//! Engine-side types: executor, handle, hooks, middleware, registry

mod executor;
mod handle;
mod hooks;
mod middleware;
pub mod registry;

pub use executor::{
    query_types, Executor, ExecutorConfig, ExecutorError, LocalExecutor, WorkflowOptions,
};
pub use handle::WorkflowHandle;
pub use hooks::Hooks;
pub use middleware::{apply, with_hooks, Middleware};
