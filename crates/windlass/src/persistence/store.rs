//! WorkflowStore trait definition

use async_trait::async_trait;

use crate::workflow::{WorkflowFilter, WorkflowState};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A state with an empty workflow ID cannot be persisted
    #[error("workflow id must not be empty")]
    EmptyWorkflowId,

    /// The state could not be serialized for this backend
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Transport or backend failure
    #[error("backend error: {0}")]
    Backend(String),
}

/// Persistence contract for workflow states
///
/// The executor saves the full state at workflow start and at termination.
/// Implementations must be thread-safe, must round-trip every field they
/// accept, and must keep "not found" (`Ok(None)` from [`load`]) distinct
/// from transport errors.
///
/// [`load`]: WorkflowStore::load
#[async_trait]
pub trait WorkflowStore: Send + Sync + 'static {
    /// Upsert the state for its workflow ID
    ///
    /// An empty `workflow_id` is an error; otherwise any prior state for
    /// that ID is overwritten.
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError>;

    /// Load the state for a workflow, or `None` if there is no record
    async fn load(&self, workflow_id: &str) -> Result<Option<WorkflowState>, StoreError>;

    /// List states matching the filter; order is unspecified
    async fn list(&self, filter: &WorkflowFilter) -> Result<Vec<WorkflowState>, StoreError>;

    /// Remove the state for a workflow; missing records are not an error
    async fn delete(&self, workflow_id: &str) -> Result<(), StoreError>;
}
