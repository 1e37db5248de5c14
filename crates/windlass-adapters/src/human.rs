//! Human adapter: request interaction from a person

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use windlass::{activity_fn, ActivityError, ActivityFn};

use crate::json_kind;

/// A request for human interaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRequest {
    /// What to ask the person
    pub prompt: String,

    /// Choices offered to the person, if the interaction is a selection
    #[serde(default)]
    pub options: Vec<String>,

    /// Free-form context forwarded to the interaction surface
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl InteractionRequest {
    /// Create a request with just a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            options: Vec::new(),
            metadata: None,
        }
    }
}

/// The person's response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionResponse {
    /// Whatever the person provided (a choice, text, structured data)
    pub payload: Value,
}

impl InteractionResponse {
    /// Create a response carrying the given payload
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }
}

/// Caller-supplied manager for human-in-the-loop steps
#[async_trait]
pub trait InteractionManager: Send + Sync + 'static {
    /// Deliver the request to a person and wait for their response
    async fn request_interaction(
        &self,
        request: InteractionRequest,
    ) -> Result<InteractionResponse, ActivityError>;
}

/// Build an activity that requests human interaction
///
/// The activity accepts only input deserializing to [`InteractionRequest`];
/// anything else fails with a non-retryable error.
pub fn human_activity(manager: Arc<dyn InteractionManager>) -> ActivityFn {
    activity_fn(move |_actx, input| {
        let manager = manager.clone();
        async move {
            let request: InteractionRequest = match input {
                Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
                    ActivityError::non_retryable(format!(
                        "human activity expects an interaction request, got {}: {err}",
                        json_kind(Some(&value)),
                    ))
                    .with_type("invalid_input")
                })?,
                None => {
                    return Err(ActivityError::non_retryable(
                        "human activity expects an interaction request, got nothing",
                    )
                    .with_type("invalid_input"));
                }
            };

            let response = manager.request_interaction(request).await?;
            let encoded = serde_json::to_value(response).map_err(|err| {
                ActivityError::non_retryable(format!("unserializable interaction response: {err}"))
            })?;
            Ok(Some(encoded))
        }
    })
}
