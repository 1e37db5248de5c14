//! Workflow state and listing filters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{EventKind, HistoryEvent};

/// Workflow lifecycle status
///
/// Once a workflow reaches a terminal status it never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Workflow is running
    Running,

    /// Workflow completed successfully
    Completed,

    /// Workflow failed
    Failed,

    /// Workflow was canceled
    Canceled,
}

impl WorkflowStatus {
    /// Check if this status is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Full persistent record for one workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowState {
    /// Caller-supplied or generated workflow identifier
    pub workflow_id: String,

    /// Unique identifier for this execution attempt
    pub run_id: Uuid,

    /// Current lifecycle status
    pub status: WorkflowStatus,

    /// Input the workflow was started with
    pub input: Option<serde_json::Value>,

    /// Result produced on successful completion
    pub result: Option<serde_json::Value>,

    /// Error message recorded on failure or cancellation
    pub error: Option<String>,

    /// Ordered, append-only event history
    pub history: Vec<HistoryEvent>,

    /// When the workflow was created
    pub created_at: DateTime<Utc>,

    /// When the record was last mutated
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Create a fresh running state with an empty history
    pub fn new(workflow_id: impl Into<String>, run_id: Uuid, input: Option<serde_json::Value>) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: workflow_id.into(),
            run_id,
            status: WorkflowStatus::Running,
            input,
            result: None,
            error: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the workflow has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append an event to the history
    ///
    /// Event IDs are assigned densely starting at 1. Terminal states accept
    /// no further events; a record against a terminal state is dropped.
    pub fn record_event(&mut self, kind: EventKind) {
        if self.is_terminal() {
            return;
        }
        let id = self.history.len() as u64 + 1;
        self.history.push(HistoryEvent::new(id, kind));
        self.updated_at = Utc::now();
    }

    /// Transition to `Completed` with the given result
    pub fn complete(&mut self, result: Option<serde_json::Value>) {
        if self.is_terminal() {
            return;
        }
        self.record_event(EventKind::WorkflowCompleted {
            result: result.clone(),
        });
        self.status = WorkflowStatus::Completed;
        self.result = result;
        self.updated_at = Utc::now();
    }

    /// Transition to `Failed` with the given error message
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        let error = error.into();
        self.record_event(EventKind::WorkflowFailed {
            error: error.clone(),
        });
        self.status = WorkflowStatus::Failed;
        self.error = Some(error);
        self.updated_at = Utc::now();
    }

    /// Transition to `Canceled` with the given error message
    pub fn cancel(&mut self, error: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.record_event(EventKind::WorkflowCanceled);
        self.status = WorkflowStatus::Canceled;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

/// Criteria for listing persisted workflows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowFilter {
    /// Keep only workflows with this status
    pub status: Option<WorkflowStatus>,

    /// Cap the number of returned workflows (0 means no cap)
    pub limit: usize,
}

impl WorkflowFilter {
    /// Create an empty filter matching everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only workflows with the given status
    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Cap the number of returned workflows
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Check whether a state passes the status criterion
    pub fn matches(&self, state: &WorkflowState) -> bool {
        self.status.is_none_or(|status| state.status == status)
    }
}
