//! Chainable decorators over the executor contract

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::workflow::{Signal, WorkflowFn};

use super::executor::{Executor, ExecutorError, WorkflowOptions};
use super::handle::WorkflowHandle;
use super::hooks::Hooks;

/// A middleware wraps one executor and returns another with the same contract
pub type Middleware = Arc<dyn Fn(Arc<dyn Executor>) -> Arc<dyn Executor> + Send + Sync>;

/// Apply middlewares so the first listed becomes the outermost wrapper
pub fn apply(executor: Arc<dyn Executor>, middlewares: Vec<Middleware>) -> Arc<dyn Executor> {
    middlewares
        .into_iter()
        .rev()
        .fold(executor, |inner, middleware| middleware(inner))
}

/// Middleware that attaches lifecycle hooks
///
/// Installs the hooks on the wrapped executor (hook sets compose in
/// installation order) and otherwise delegates every operation.
pub fn with_hooks(hooks: Hooks) -> Middleware {
    Arc::new(move |inner: Arc<dyn Executor>| {
        inner.install_hooks(hooks.clone());
        Arc::new(HookLayer { inner }) as Arc<dyn Executor>
    })
}

struct HookLayer {
    inner: Arc<dyn Executor>,
}

#[async_trait]
impl Executor for HookLayer {
    async fn execute(
        &self,
        f: WorkflowFn,
        input: Option<Value>,
        options: WorkflowOptions,
    ) -> WorkflowHandle {
        self.inner.execute(f, input, options).await
    }

    async fn signal(&self, workflow_id: &str, signal: Signal) -> Result<(), ExecutorError> {
        self.inner.signal(workflow_id, signal).await
    }

    async fn query(&self, workflow_id: &str, query_type: &str) -> Result<Value, ExecutorError> {
        self.inner.query(workflow_id, query_type).await
    }

    async fn cancel(&self, workflow_id: &str) -> Result<(), ExecutorError> {
        self.inner.cancel(workflow_id).await
    }

    fn install_hooks(&self, hooks: Hooks) {
        self.inner.install_hooks(hooks);
    }
}
