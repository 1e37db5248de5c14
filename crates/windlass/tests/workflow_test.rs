//! End-to-end tests driving workflows through the executor

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use windlass::prelude::*;
use windlass::{activity_fn, query_types, EventKind, Signal};

fn executor_with_store() -> (LocalExecutor, Arc<InMemoryWorkflowStore>) {
    let store = Arc::new(InMemoryWorkflowStore::new());
    (LocalExecutor::with_store(store.clone()), store)
}

/// Terminal persistence runs after the done latch closes, so give the
/// store a moment to catch up
async fn load_terminal(store: &InMemoryWorkflowStore, workflow_id: &str) -> WorkflowState {
    for _ in 0..200 {
        if let Some(state) = store.load(workflow_id).await.expect("load succeeds") {
            if state.is_terminal() {
                return state;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no terminal state persisted for {workflow_id}");
}

#[tokio::test]
async fn simple_workflow_completes() {
    let executor = LocalExecutor::new();

    let handle = executor
        .execute(
            workflow_fn(|_ctx, input| async move {
                let input = input.and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default();
                Ok(Some(json!(format!("result: {input}"))))
            }),
            Some(json!("hello")),
            WorkflowOptions::new().with_id("wf-simple"),
        )
        .await;

    assert_eq!(handle.id(), "wf-simple");
    assert!(!handle.run_id().is_nil());

    let result = handle.result().await.expect("workflow succeeds");
    assert_eq!(result, Some(json!("result: hello")));
    assert_eq!(handle.status(), WorkflowStatus::Completed);
}

#[tokio::test]
async fn workflow_error_reaches_result() {
    let executor = LocalExecutor::new();

    let handle = executor
        .execute(
            workflow_fn(|_ctx, _input| async move {
                Err::<Option<serde_json::Value>, _>(WorkflowError::new("order rejected"))
            }),
            None,
            WorkflowOptions::new(),
        )
        .await;

    let error = handle.result().await.expect_err("workflow fails");
    assert_eq!(error.message, "order rejected");
    assert_eq!(handle.status(), WorkflowStatus::Failed);
}

#[tokio::test]
async fn activity_retries_until_success() {
    let executor = LocalExecutor::new();
    let invocations = Arc::new(AtomicU32::new(0));

    let flaky = {
        let invocations = invocations.clone();
        activity_fn(move |actx, _input| {
            invocations.fetch_add(1, Ordering::SeqCst);
            async move {
                if actx.attempt() < 3 {
                    Err(ActivityError::retryable("not yet"))
                } else {
                    Ok(Some(json!("success")))
                }
            }
        })
    };

    let handle = executor
        .execute(
            workflow_fn(move |ctx, _input| {
                let flaky = flaky.clone();
                async move {
                    let result = ctx
                        .execute_activity(
                            flaky,
                            None,
                            ActivityOptions::new().with_retry_policy(
                                RetryPolicy::exponential()
                                    .with_max_attempts(5)
                                    .with_initial_interval(Duration::from_millis(1))
                                    .with_backoff_coefficient(1.5),
                            ),
                        )
                        .await?;
                    Ok(result)
                }
            }),
            None,
            WorkflowOptions::new(),
        )
        .await;

    let result = handle.result().await.expect("workflow succeeds");
    assert_eq!(result, Some(json!("success")));
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn activity_retry_exhaustion_reports_attempts() {
    let executor = LocalExecutor::new();
    let invocations = Arc::new(AtomicU32::new(0));

    let broken = {
        let invocations = invocations.clone();
        activity_fn(move |_actx, _input| {
            invocations.fetch_add(1, Ordering::SeqCst);
            async { Err(ActivityError::retryable("still broken")) }
        })
    };

    let handle = executor
        .execute(
            workflow_fn(move |ctx, _input| {
                let broken = broken.clone();
                async move {
                    let result = ctx
                        .execute_activity(
                            broken,
                            None,
                            ActivityOptions::new().with_retry_policy(RetryPolicy::fixed(
                                Duration::from_millis(1),
                                3,
                            )),
                        )
                        .await?;
                    Ok(result)
                }
            }),
            None,
            WorkflowOptions::new(),
        )
        .await;

    let error = handle.result().await.expect_err("workflow fails");
    assert!(error.message.contains("after 3 attempts"));
    assert!(error.message.contains("still broken"));
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn signal_unblocks_waiting_workflow() {
    let executor = LocalExecutor::new();

    let handle = executor
        .execute(
            workflow_fn(|ctx, _input| async move {
                let approval = ctx.receive_signal("approval").recv().await?;
                Ok(Some(json!(format!("approved: {approval}"))))
            }),
            None,
            WorkflowOptions::new().with_id("wf-approval"),
        )
        .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    executor
        .signal("wf-approval", Signal::new("approval", json!(true)))
        .await
        .expect("signal delivered");

    let result = handle.result().await.expect("workflow succeeds");
    assert_eq!(result, Some(json!("approved: true")));
}

#[tokio::test]
async fn signal_sent_before_receive_is_observed() {
    let executor = LocalExecutor::new();

    let handle = executor
        .execute(
            workflow_fn(|ctx, _input| async move {
                // Delay so the signal lands before the first read
                ctx.sleep(Duration::from_millis(50)).await?;
                let payload = ctx.receive_signal("early").recv().await?;
                Ok(Some(payload))
            }),
            None,
            WorkflowOptions::new().with_id("wf-early"),
        )
        .await;

    executor
        .signal("wf-early", Signal::new("early", json!("buffered")))
        .await
        .expect("signal delivered");

    let result = handle.result().await.expect("workflow succeeds");
    assert_eq!(result, Some(json!("buffered")));
}

#[tokio::test]
async fn same_name_signals_arrive_in_order() {
    let executor = LocalExecutor::new();

    let handle = executor
        .execute(
            workflow_fn(|ctx, _input| async move {
                let numbers = ctx.receive_signal("numbers");
                let mut seen = Vec::new();
                for _ in 0..5 {
                    seen.push(numbers.recv().await?);
                }
                Ok(Some(json!(seen)))
            }),
            None,
            WorkflowOptions::new().with_id("wf-fifo"),
        )
        .await;

    for i in 0..5 {
        executor
            .signal("wf-fifo", Signal::new("numbers", json!(i)))
            .await
            .expect("signal delivered");
    }

    let result = handle.result().await.expect("workflow succeeds");
    assert_eq!(result, Some(json!([0, 1, 2, 3, 4])));
}

#[tokio::test]
async fn activity_timeout_fails_workflow() {
    let executor = LocalExecutor::new();

    let handle = executor
        .execute(
            workflow_fn(|ctx, _input| async move {
                let result = ctx
                    .execute_activity(
                        activity_fn(|actx, _input| async move {
                            actx.sleep(Duration::from_secs(10)).await?;
                            Ok(None)
                        }),
                        None,
                        ActivityOptions::new()
                            .with_name("slow")
                            .with_timeout(Duration::from_millis(50)),
                    )
                    .await?;
                Ok(result)
            }),
            None,
            WorkflowOptions::new(),
        )
        .await;

    let error = handle.result().await.expect_err("deadline exceeded");
    assert_eq!(error.code.as_deref(), Some("deadline_exceeded"));
    assert_eq!(handle.status(), WorkflowStatus::Failed);
}

#[tokio::test]
async fn cancel_mid_sleep() {
    let executor = LocalExecutor::new();

    let handle = executor
        .execute(
            workflow_fn(|ctx, _input| async move {
                ctx.sleep(Duration::from_secs(10)).await?;
                Ok(None)
            }),
            None,
            WorkflowOptions::new().with_id("wf-cancel"),
        )
        .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    executor.cancel("wf-cancel").await.expect("cancel accepted");

    let error = handle.result().await.expect_err("workflow canceled");
    assert_eq!(error.code.as_deref(), Some("canceled"));
    assert_eq!(handle.status(), WorkflowStatus::Canceled);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let executor = LocalExecutor::new();

    let handle = executor
        .execute(
            workflow_fn(|ctx, _input| async move {
                ctx.sleep(Duration::from_secs(10)).await?;
                Ok(None)
            }),
            None,
            WorkflowOptions::new().with_id("wf-twice"),
        )
        .await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    executor.cancel("wf-twice").await.expect("first cancel");

    // A second cancel races termination: accepted while the record is
    // still registered, not-found afterwards
    match executor.cancel("wf-twice").await {
        Ok(()) => {}
        Err(ExecutorError::WorkflowNotFound(_)) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }

    handle.result().await.expect_err("workflow canceled");
    assert_eq!(handle.status(), WorkflowStatus::Canceled);

    let after = executor.cancel("wf-twice").await;
    assert!(matches!(after, Err(ExecutorError::WorkflowNotFound(_))));
}

#[tokio::test]
async fn query_unknown_workflow_is_not_found() {
    let executor = LocalExecutor::new();
    let result = executor.query("nonexistent", query_types::STATUS).await;
    assert!(matches!(result, Err(ExecutorError::WorkflowNotFound(_))));
}

#[tokio::test]
async fn signals_rejected_after_termination() {
    let executor = LocalExecutor::new();
    let handle = executor
        .execute(
            workflow_fn(|_ctx, _input| async move { Ok(None) }),
            None,
            WorkflowOptions::new().with_id("wf-finished"),
        )
        .await;
    handle.result().await.expect("workflow succeeds");

    let result = executor
        .signal("wf-finished", Signal::new("late", json!(null)))
        .await;
    assert!(matches!(result, Err(ExecutorError::WorkflowNotFound(_))));
}

#[tokio::test]
async fn run_ids_are_unique_across_executions() {
    let executor = LocalExecutor::new();
    let mut run_ids = Vec::new();

    for _ in 0..10 {
        let handle = executor
            .execute(
                workflow_fn(|_ctx, _input| async move { Ok(None) }),
                None,
                WorkflowOptions::new(),
            )
            .await;
        run_ids.push(handle.run_id());
        handle.result().await.unwrap();
    }

    let mut deduped = run_ids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), run_ids.len());
}

#[tokio::test]
async fn terminal_status_never_transitions() {
    let executor = LocalExecutor::new();
    let handle = executor
        .execute(
            workflow_fn(|_ctx, _input| async move { Ok(Some(json!("done"))) }),
            None,
            WorkflowOptions::new(),
        )
        .await;

    handle.result().await.unwrap();
    assert_eq!(handle.status(), WorkflowStatus::Completed);

    // Repeated result calls return the same outcome without blocking
    for _ in 0..3 {
        assert_eq!(handle.result().await.unwrap(), Some(json!("done")));
        assert_eq!(handle.status(), WorkflowStatus::Completed);
    }
}

#[test_log::test(tokio::test)]
async fn persisted_history_is_dense_and_ordered() {
    let (executor, store) = executor_with_store();

    let handle = executor
        .execute(
            workflow_fn(|ctx, _input| async move {
                let result = ctx
                    .execute_activity(
                        activity_fn(|_actx, input| async move { Ok(input) }),
                        Some(json!("step")),
                        ActivityOptions::new().with_name("echo"),
                    )
                    .await?;
                ctx.sleep(Duration::from_millis(1)).await?;
                Ok(result)
            }),
            Some(json!("input")),
            WorkflowOptions::new().with_id("wf-history"),
        )
        .await;
    handle.result().await.expect("workflow succeeds");

    let state = load_terminal(&store, "wf-history").await;

    assert_eq!(state.status, WorkflowStatus::Completed);
    assert_eq!(state.run_id, handle.run_id());

    let ids: Vec<u64> = state.history.iter().map(|e| e.id).collect();
    assert_eq!(ids, (1..=state.history.len() as u64).collect::<Vec<_>>());

    for pair in state.history.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }

    assert!(matches!(
        state.history.first().map(|e| &e.kind),
        Some(EventKind::WorkflowStarted { .. })
    ));
    assert!(matches!(
        state.history.last().map(|e| &e.kind),
        Some(EventKind::WorkflowCompleted { .. })
    ));
    assert!(state
        .history
        .iter()
        .any(|e| matches!(&e.kind, EventKind::ActivityCompleted { activity_name, .. } if activity_name == "echo")));
    assert!(state
        .history
        .iter()
        .any(|e| matches!(&e.kind, EventKind::TimerFired { .. })));
}

#[tokio::test]
async fn canceled_workflow_persists_canceled_state() {
    let (executor, store) = executor_with_store();

    let handle = executor
        .execute(
            workflow_fn(|ctx, _input| async move {
                ctx.sleep(Duration::from_secs(10)).await?;
                Ok(None)
            }),
            None,
            WorkflowOptions::new().with_id("wf-audit-cancel"),
        )
        .await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    executor.cancel("wf-audit-cancel").await.unwrap();
    handle.result().await.expect_err("workflow canceled");

    let state = load_terminal(&store, "wf-audit-cancel").await;
    assert_eq!(state.status, WorkflowStatus::Canceled);
    assert!(state.error.is_some());
    assert!(matches!(
        state.history.last().map(|e| &e.kind),
        Some(EventKind::WorkflowCanceled)
    ));
}

#[tokio::test]
async fn hooks_fire_across_the_lifecycle() {
    let starts = Arc::new(AtomicU32::new(0));
    let completes = Arc::new(AtomicU32::new(0));
    let activity_starts = Arc::new(AtomicU32::new(0));
    let activity_completes = Arc::new(AtomicU32::new(0));
    let retries = Arc::new(AtomicU32::new(0));
    let signals = Arc::new(AtomicU32::new(0));

    let hooks = {
        let starts = starts.clone();
        let completes = completes.clone();
        let activity_starts = activity_starts.clone();
        let activity_completes = activity_completes.clone();
        let retries = retries.clone();
        let signals = signals.clone();
        Hooks::new()
            .on_workflow_start(move |_, _| {
                starts.fetch_add(1, Ordering::SeqCst);
            })
            .on_workflow_complete(move |_, _| {
                completes.fetch_add(1, Ordering::SeqCst);
            })
            .on_activity_start(move |_, _| {
                activity_starts.fetch_add(1, Ordering::SeqCst);
            })
            .on_activity_complete(move |_, _| {
                activity_completes.fetch_add(1, Ordering::SeqCst);
            })
            .on_retry(move |_, _| {
                retries.fetch_add(1, Ordering::SeqCst);
            })
            .on_signal(move |_, _| {
                signals.fetch_add(1, Ordering::SeqCst);
            })
    };

    let executor = LocalExecutor::new();
    executor.install_hooks(hooks);

    let handle = executor
        .execute(
            workflow_fn(|ctx, _input| async move {
                let go = ctx.receive_signal("go").recv().await?;
                let result = ctx
                    .execute_activity(
                        activity_fn(|actx, input| async move {
                            if actx.attempt() < 2 {
                                Err(ActivityError::retryable("warming up"))
                            } else {
                                Ok(input)
                            }
                        }),
                        Some(go),
                        ActivityOptions::new().with_retry_policy(RetryPolicy::fixed(
                            Duration::from_millis(1),
                            3,
                        )),
                    )
                    .await?;
                Ok(result)
            }),
            None,
            WorkflowOptions::new().with_id("wf-hooks"),
        )
        .await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    executor
        .signal("wf-hooks", Signal::new("go", json!("payload")))
        .await
        .unwrap();

    let result = handle.result().await.expect("workflow succeeds");
    assert_eq!(result, Some(json!("payload")));

    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(completes.load(Ordering::SeqCst), 1);
    assert_eq!(activity_starts.load(Ordering::SeqCst), 1);
    assert_eq!(activity_completes.load(Ordering::SeqCst), 1);
    assert_eq!(retries.load(Ordering::SeqCst), 1);
    assert_eq!(signals.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn workflow_fail_hook_receives_the_error() {
    let failures = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let hooks = {
        let failures = failures.clone();
        Hooks::new().on_workflow_fail(move |id, error| {
            failures.lock().push((id.to_string(), error.message.clone()));
        })
    };

    let executor = LocalExecutor::new();
    executor.install_hooks(hooks);

    let handle = executor
        .execute(
            workflow_fn(|_ctx, _input| async move {
                Err::<Option<serde_json::Value>, _>(WorkflowError::new("bad state"))
            }),
            None,
            WorkflowOptions::new().with_id("wf-fail"),
        )
        .await;
    handle.result().await.expect_err("workflow fails");

    assert_eq!(
        *failures.lock(),
        vec![("wf-fail".to_string(), "bad state".to_string())]
    );
}
