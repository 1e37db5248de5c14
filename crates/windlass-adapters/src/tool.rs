//! Tool adapter: execute a named tool with an argument map

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use windlass::{activity_fn, ActivityError, ActivityFn};

use crate::json_kind;

/// Caller-supplied seam for executing named tools
#[async_trait]
pub trait ToolExecutor: Send + Sync + 'static {
    /// Execute the tool registered under `name` with the given arguments
    async fn execute(&self, name: &str, args: &Map<String, Value>) -> Result<Value, ActivityError>;
}

/// Build an activity that executes a named tool
///
/// The activity accepts an object with a required non-empty string `name`
/// and an optional object `args`:
///
/// ```json
/// { "name": "get_weather", "args": { "city": "Lisbon" } }
/// ```
pub fn tool_activity(executor: Arc<dyn ToolExecutor>) -> ActivityFn {
    activity_fn(move |_actx, input| {
        let executor = executor.clone();
        async move {
            let call = match input {
                Some(Value::Object(call)) => call,
                other => {
                    return Err(ActivityError::non_retryable(format!(
                        "tool activity expects an object with name and args, got {}",
                        json_kind(other.as_ref()),
                    ))
                    .with_type("invalid_input"));
                }
            };

            let name = match call.get("name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => {
                    return Err(ActivityError::non_retryable(
                        "tool activity requires a non-empty string field \"name\"",
                    )
                    .with_type("invalid_input"));
                }
            };

            let args = match call.get("args") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(args)) => args.clone(),
                Some(other) => {
                    return Err(ActivityError::non_retryable(format!(
                        "tool activity field \"args\" must be an object, got {}",
                        json_kind(Some(other)),
                    ))
                    .with_type("invalid_input"));
                }
            };

            let result = executor.execute(&name, &args).await?;
            Ok(Some(result))
        }
    })
}
