use std::time::Duration;

use taskstack_engine::dal::Dal;
use taskstack_engine::database::Database;
use taskstack_engine::engine::StackEngine;
use taskstack_engine::models::{StackStatus, TaskDefinition, TaskKind};
use taskstack_engine::EngineHandle;

async fn test_handle() -> EngineHandle {
    let db = Database::new(":memory:", 1).expect("pool");
    db.run_migrations().await.expect("migrations");
    let dal = Dal::new(db);
    let stack_engine = StackEngine::new(dal.stacks.clone(), dal.tasks.clone(), dal.control.clone());
    EngineHandle { dal, stack_engine }
}

async fn seed_task(handle: &EngineHandle, task_id: &str, code: &str) {
    let task = TaskDefinition::new(task_id, TaskKind::ShellCommand, code, Duration::from_secs(5));
    handle.dal.tasks.create(task).await.expect("seed task");
}

#[tokio::test]
async fn echo_scenario_completes_with_expected_output() {
    let handle = test_handle().await;
    seed_task(
        &handle,
        "hello",
        r#"printf '{"taskstack_result":true,"output":"Hello ${greeting}"}'"#,
    )
    .await;

    let stack_id = handle
        .stack_engine
        .create(
            "req-1".to_string(),
            "hello".to_string(),
            serde_json::json!({"greeting": "World"}),
        )
        .await
        .expect("create stack");

    let outcome = handle
        .stack_engine
        .run_to_completion(&stack_id)
        .await
        .expect("run");

    assert_eq!(outcome.status, StackStatus::Done);
    assert_eq!(outcome.final_output, Some(serde_json::json!("Hello World")));

    let trace = handle.stack_engine.trace(&stack_id).await.expect("trace");
    assert_eq!(trace.len(), 1);
}

#[tokio::test]
async fn fan_out_runs_children_in_reverse_declared_order() {
    let handle = test_handle().await;
    seed_task(
        &handle,
        "fanout",
        r#"printf '{"taskstack_result":true,"output":"root","pushed_children":[{"task_id":"leaf","parameters":{"name":"A"}},{"task_id":"leaf","parameters":{"name":"B"}},{"task_id":"leaf","parameters":{"name":"C"}}]}'"#,
    )
    .await;
    seed_task(
        &handle,
        "leaf",
        r#"printf '{"taskstack_result":true,"output":"${name}","decisions":["ran-${name}"]}'"#,
    )
    .await;

    let stack_id = handle
        .stack_engine
        .create("req-2".to_string(), "fanout".to_string(), serde_json::json!({}))
        .await
        .expect("create stack");

    let outcome = handle
        .stack_engine
        .run_to_completion(&stack_id)
        .await
        .expect("run");

    assert_eq!(outcome.status, StackStatus::Done);
    assert_eq!(
        outcome.context.decisions,
        vec!["ran-C".to_string(), "ran-B".to_string(), "ran-A".to_string()]
    );

    let trace = handle.stack_engine.trace(&stack_id).await.expect("trace");
    let task_order: Vec<&str> = trace.iter().map(|e| e.task_id.as_str()).collect();
    assert_eq!(task_order, vec!["fanout", "leaf", "leaf", "leaf"]);
}

#[tokio::test]
async fn abort_short_circuits_remaining_siblings() {
    let handle = test_handle().await;
    seed_task(
        &handle,
        "fanout_abort",
        r#"printf '{"taskstack_result":true,"output":"root","pushed_children":[{"task_id":"noop","parameters":{}},{"task_id":"noop","parameters":{}},{"task_id":"aborter","parameters":{}}]}'"#,
    )
    .await;
    seed_task(&handle, "noop", r#"printf '{"taskstack_result":true,"output":"ok"}'"#).await;
    seed_task(
        &handle,
        "aborter",
        r#"printf '{"taskstack_result":true,"output":"stop","abort":true}'"#,
    )
    .await;

    let stack_id = handle
        .stack_engine
        .create(
            "req-3".to_string(),
            "fanout_abort".to_string(),
            serde_json::json!({}),
        )
        .await
        .expect("create stack");

    let outcome = handle
        .stack_engine
        .run_to_completion(&stack_id)
        .await
        .expect("run");

    assert_eq!(outcome.status, StackStatus::Cancelled);

    let trace = handle.stack_engine.trace(&stack_id).await.expect("trace");
    let cancelled = trace.iter().filter(|e| e.status == "cancelled").count();
    assert_eq!(cancelled, 2);
}

#[tokio::test]
async fn failing_task_fails_the_whole_stack() {
    let handle = test_handle().await;
    seed_task(&handle, "boom", "exit 7").await;

    let stack_id = handle
        .stack_engine
        .create("req-4".to_string(), "boom".to_string(), serde_json::json!({}))
        .await
        .expect("create stack");

    let outcome = handle
        .stack_engine
        .run_to_completion(&stack_id)
        .await
        .expect("run");

    assert_eq!(outcome.status, StackStatus::Failed);
    assert!(outcome.error_message.is_some());
}
