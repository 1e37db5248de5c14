//! LLM adapter: prompt in, completion out

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use windlass::{activity_fn, ActivityError, ActivityFn};

use crate::json_kind;

/// Caller-supplied LLM invocation seam
///
/// Implementations handle provider-specific API calls and response parsing;
/// the adapter only moves strings across the activity boundary.
#[async_trait]
pub trait LlmInvoker: Send + Sync + 'static {
    /// Run one prompt to completion
    async fn invoke(&self, prompt: &str) -> Result<String, ActivityError>;
}

/// Build an activity that calls an LLM with a prompt string
///
/// The activity accepts only string input and returns the completion as a
/// string. Any other input shape fails with a non-retryable error.
///
/// # Example
///
/// ```ignore
/// let activity = llm_activity(Arc::new(MyProvider::new(api_key)));
/// let completion = ctx
///     .execute_activity(activity, Some(json!("Summarize this order")), options)
///     .await?;
/// ```
pub fn llm_activity(invoker: Arc<dyn LlmInvoker>) -> ActivityFn {
    activity_fn(move |_actx, input| {
        let invoker = invoker.clone();
        async move {
            let prompt = match input {
                Some(Value::String(prompt)) => prompt,
                other => {
                    return Err(ActivityError::non_retryable(format!(
                        "llm activity expects a string prompt, got {}",
                        json_kind(other.as_ref()),
                    ))
                    .with_type("invalid_input"));
                }
            };
            let completion = invoker.invoke(&prompt).await?;
            Ok(Some(Value::String(completion)))
        }
    })
}
