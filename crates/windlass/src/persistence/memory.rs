//! In-memory implementation of WorkflowStore

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::workflow::{WorkflowFilter, WorkflowState};

use super::store::{StoreError, WorkflowStore};

/// In-memory workflow store
///
/// Keeps full state clones in a map keyed by workflow ID. Suitable for
/// tests and for single-process deployments that only need terminal-result
/// retrieval within the process lifetime.
///
/// # Example
///
/// ```
/// use windlass::InMemoryWorkflowStore;
///
/// let store = InMemoryWorkflowStore::new();
/// assert_eq!(store.workflow_count(), 0);
/// ```
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<String, WorkflowState>>,
}

impl InMemoryWorkflowStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// Number of persisted workflows
    pub fn workflow_count(&self) -> usize {
        self.workflows.read().len()
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        self.workflows.write().clear();
    }
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        if state.workflow_id.is_empty() {
            return Err(StoreError::EmptyWorkflowId);
        }
        self.workflows
            .write()
            .insert(state.workflow_id.clone(), state.clone());
        Ok(())
    }

    async fn load(&self, workflow_id: &str) -> Result<Option<WorkflowState>, StoreError> {
        Ok(self.workflows.read().get(workflow_id).cloned())
    }

    async fn list(&self, filter: &WorkflowFilter) -> Result<Vec<WorkflowState>, StoreError> {
        let workflows = self.workflows.read();
        let mut states: Vec<WorkflowState> = workflows
            .values()
            .filter(|state| filter.matches(state))
            .cloned()
            .collect();
        if filter.limit > 0 {
            states.truncate(filter.limit);
        }
        Ok(states)
    }

    async fn delete(&self, workflow_id: &str) -> Result<(), StoreError> {
        self.workflows.write().remove(workflow_id);
        Ok(())
    }
}
