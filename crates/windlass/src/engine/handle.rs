//! External handle for observing one workflow execution

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::workflow::{WorkflowError, WorkflowStatus};

#[derive(Debug)]
struct Outcome {
    status: WorkflowStatus,
    result: Option<Value>,
    error: Option<WorkflowError>,
}

#[derive(Debug)]
struct Shared {
    outcome: RwLock<Outcome>,
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

/// Observe-only reference to one workflow execution
///
/// The handle holds identifiers, a status cell, and the done latch. It does
/// not keep the workflow's running record alive; that record is dropped
/// when the workflow terminates.
///
/// # Example
///
/// ```ignore
/// let handle = executor.execute(my_workflow, input, WorkflowOptions::default()).await;
/// println!("started {} (run {})", handle.id(), handle.run_id());
/// let result = handle.result().await?;
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowHandle {
    workflow_id: String,
    run_id: Uuid,
    shared: Arc<Shared>,
}

impl WorkflowHandle {
    pub(crate) fn new(workflow_id: impl Into<String>, run_id: Uuid) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        Self {
            workflow_id: workflow_id.into(),
            run_id,
            shared: Arc::new(Shared {
                outcome: RwLock::new(Outcome {
                    status: WorkflowStatus::Running,
                    result: None,
                    error: None,
                }),
                done_tx,
                done_rx,
            }),
        }
    }

    /// The workflow identifier (caller-supplied or generated)
    pub fn id(&self) -> &str {
        &self.workflow_id
    }

    /// The unique identifier for this execution attempt
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The current status; safe to poll from any task
    pub fn status(&self) -> WorkflowStatus {
        self.shared.outcome.read().status
    }

    /// Whether the done latch has closed
    pub fn is_finished(&self) -> bool {
        *self.shared.done_rx.borrow()
    }

    /// Wait for the workflow to terminate and return its outcome
    ///
    /// Once the workflow has terminated this returns immediately, and
    /// repeated calls return the same outcome. Callers that need to give up
    /// early can drop the future or race it with `tokio::select!`.
    pub async fn result(&self) -> Result<Option<Value>, WorkflowError> {
        let mut done = self.shared.done_rx.clone();
        loop {
            if *done.borrow() {
                break;
            }
            if done.changed().await.is_err() {
                // Sender lives in Shared alongside this receiver
                break;
            }
        }

        let outcome = self.shared.outcome.read();
        match &outcome.error {
            Some(error) => Err(error.clone()),
            None => Ok(outcome.result.clone()),
        }
    }

    /// Force the observable status to `Canceled` if the workflow is still running
    pub(crate) fn mark_canceled(&self) {
        let mut outcome = self.shared.outcome.write();
        if outcome.status == WorkflowStatus::Running {
            outcome.status = WorkflowStatus::Canceled;
        }
    }

    /// Record the terminal outcome without releasing waiters yet
    pub(crate) fn record_outcome(
        &self,
        status: WorkflowStatus,
        result: Option<Value>,
        error: Option<WorkflowError>,
    ) {
        let mut outcome = self.shared.outcome.write();
        outcome.status = status;
        outcome.result = result;
        outcome.error = error;
    }

    /// Close the done latch, unblocking every `result` caller
    pub(crate) fn mark_done(&self) {
        let _ = self.shared.done_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifiers() {
        let run_id = Uuid::now_v7();
        let handle = WorkflowHandle::new("wf-7", run_id);
        assert_eq!(handle.id(), "wf-7");
        assert_eq!(handle.run_id(), run_id);
        assert_eq!(handle.status(), WorkflowStatus::Running);
        assert!(!handle.is_finished());
    }

    #[tokio::test]
    async fn test_result_blocks_until_done() {
        let handle = WorkflowHandle::new("wf-1", Uuid::now_v7());
        let mut waiter = tokio_test::task::spawn({
            let handle = handle.clone();
            async move { handle.result().await }
        });

        tokio_test::assert_pending!(waiter.poll());

        handle.record_outcome(WorkflowStatus::Completed, Some(json!("ok")), None);
        handle.mark_done();

        let result = waiter.await.expect("workflow result");
        assert_eq!(result, Some(json!("ok")));
    }

    #[tokio::test]
    async fn test_repeated_results_return_same_outcome() {
        let handle = WorkflowHandle::new("wf-1", Uuid::now_v7());
        handle.record_outcome(
            WorkflowStatus::Failed,
            None,
            Some(WorkflowError::new("boom")),
        );
        handle.mark_done();

        for _ in 0..3 {
            let error = handle.result().await.expect_err("workflow failed");
            assert_eq!(error.message, "boom");
        }
        assert!(handle.is_finished());
    }

    #[test]
    fn test_mark_canceled_only_overrides_running() {
        let handle = WorkflowHandle::new("wf-1", Uuid::now_v7());
        handle.mark_canceled();
        assert_eq!(handle.status(), WorkflowStatus::Canceled);

        let finished = WorkflowHandle::new("wf-2", Uuid::now_v7());
        finished.record_outcome(WorkflowStatus::Completed, None, None);
        finished.mark_canceled();
        assert_eq!(finished.status(), WorkflowStatus::Completed);
    }
}
