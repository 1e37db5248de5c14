//! Drives a single activity invocation on the calling workflow's task

use serde_json::Value;
use tracing::debug;

use crate::reliability::RetryError;
use crate::workflow::{EventKind, WorkflowContext};

use super::definition::{ActivityContext, ActivityError, ActivityFn};
use super::options::ActivityOptions;

/// Run one activity invocation, retries and timeout included
///
/// The activity scope is a child of the workflow scope, so workflow
/// cancellation reaches every attempt. A configured timeout covers the
/// whole invocation; its watcher is aborted on return regardless of
/// outcome.
pub(crate) async fn run_activity(
    ctx: &WorkflowContext,
    f: ActivityFn,
    input: Option<Value>,
    options: ActivityOptions,
) -> Result<Option<Value>, ActivityError> {
    let name = options.display_name().to_string();
    let workflow_id = ctx.workflow_id().to_string();
    let hooks = ctx.hooks();

    debug!(%workflow_id, activity = %name, "starting activity");
    hooks.fire_activity_start(&workflow_id, input.as_ref());
    ctx.record_event(EventKind::ActivityStarted {
        activity_name: name.clone(),
        input: input.clone(),
    });

    let scope = ctx.scope().child();
    let watcher = options
        .effective_timeout()
        .map(|timeout| scope.deadline_watcher(timeout));

    let outcome = match &options.retry_policy {
        Some(policy) => policy
            .run(
                &scope,
                |error| hooks.fire_retry(&workflow_id, error),
                |attempt| {
                    let attempt_ctx = ActivityContext::new(
                        workflow_id.clone(),
                        name.clone(),
                        attempt,
                        scope.clone(),
                    );
                    f(attempt_ctx, input.clone())
                },
            )
            .await
            .map_err(RetryError::into_activity_error),
        None => {
            let attempt_ctx =
                ActivityContext::new(workflow_id.clone(), name.clone(), 1, scope.clone());
            f(attempt_ctx, input).await
        }
    };

    if let Some(watcher) = watcher {
        watcher.abort();
    }

    match &outcome {
        Ok(result) => {
            debug!(%workflow_id, activity = %name, "activity completed");
            hooks.fire_activity_complete(&workflow_id, result.as_ref());
            ctx.record_event(EventKind::ActivityCompleted {
                activity_name: name,
                result: result.clone(),
            });
        }
        Err(error) => {
            debug!(%workflow_id, activity = %name, %error, "activity failed");
            ctx.record_event(EventKind::ActivityFailed {
                activity_name: name,
                error: error.to_string(),
            });
        }
    }

    outcome
}
