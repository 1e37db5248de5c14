//! # Windlass adapters
//!
//! Thin typed wrappers that turn external collaborators into
//! [`ActivityFn`](windlass::ActivityFn)s:
//!
//! - [`llm_activity`] wraps an [`LlmInvoker`] (prompt string in, completion
//!   string out)
//! - [`tool_activity`] wraps a [`ToolExecutor`] (named tool plus an
//!   argument map)
//! - [`human_activity`] wraps an [`InteractionManager`] (typed
//!   request/response for human-in-the-loop steps)
//!
//! Each adapter validates its input shape up front; a mismatch fails with a
//! descriptive non-retryable error before the collaborator is invoked.

mod human;
mod llm;
mod tool;

pub use human::{human_activity, InteractionManager, InteractionRequest, InteractionResponse};
pub use llm::{llm_activity, LlmInvoker};
pub use tool::{tool_activity, ToolExecutor};

/// Human-readable name for a JSON value's type, for validation errors
pub(crate) fn json_kind(value: Option<&serde_json::Value>) -> &'static str {
    match value {
        None => "nothing",
        Some(serde_json::Value::Null) => "null",
        Some(serde_json::Value::Bool(_)) => "a boolean",
        Some(serde_json::Value::Number(_)) => "a number",
        Some(serde_json::Value::String(_)) => "a string",
        Some(serde_json::Value::Array(_)) => "an array",
        Some(serde_json::Value::Object(_)) => "an object",
    }
}
