use std::time::Duration;

use taskstack_engine::dal::request_queue::RequestFilter;
use taskstack_engine::dal::Dal;
use taskstack_engine::database::Database;
use taskstack_engine::models::{RequestStatus, RequestSubmission, TaskDefinition, TaskKind};

async fn test_dal() -> Dal {
    let db = Database::new(":memory:", 1).expect("pool");
    db.run_migrations().await.expect("migrations");
    let dal = Dal::new(db);
    dal.tasks
        .create(TaskDefinition::new(
            "noop",
            TaskKind::ShellCommand,
            "true",
            Duration::from_secs(5),
        ))
        .await
        .expect("seed task");
    dal
}

#[tokio::test]
async fn submit_is_idempotent_on_repeated_request_id() {
    let dal = test_dal().await;
    let mut submission = RequestSubmission::new("noop", serde_json::json!({}));
    submission.request_id = "fixed-id".to_string();

    let first = dal.requests.submit(submission.clone()).await.unwrap();
    assert!(first.is_new);
    let second = dal.requests.submit(submission).await.unwrap();
    assert!(!second.is_new);
    assert_eq!(first.request.request_id, second.request.request_id);

    let all = dal
        .requests
        .list(RequestFilter {
            status: None,
            limit: 100,
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn dependent_request_stays_blocked_until_dependency_completes() {
    let dal = test_dal().await;

    let mut r1 = RequestSubmission::new("noop", serde_json::json!({}));
    r1.request_id = "r1".to_string();
    let r1_outcome = dal.requests.submit(r1).await.unwrap();
    assert_eq!(r1_outcome.request.status().unwrap(), RequestStatus::Pending);

    let mut r2 = RequestSubmission::new("noop", serde_json::json!({}));
    r2.request_id = "r2".to_string();
    r2.depends_on = vec!["r1".to_string()];
    let r2_outcome = dal.requests.submit(r2).await.unwrap();
    assert_eq!(r2_outcome.request.status().unwrap(), RequestStatus::Blocked);

    // r2 must never be claimable while blocked.
    let claimed = dal.requests.claim_next("worker-a".to_string()).await.unwrap();
    assert_eq!(claimed.unwrap().request_id, "r1");

    dal.requests
        .mark_done("r1".to_string(), "stack-1".to_string())
        .await
        .unwrap();
    let unblocked = dal.requests.unblock_dependents("r1".to_string()).await.unwrap();
    assert_eq!(unblocked, vec!["r2".to_string()]);

    let r2_now = dal.requests.get("r2").await.unwrap();
    assert_eq!(r2_now.status().unwrap(), RequestStatus::Pending);

    let claimed2 = dal.requests.claim_next("worker-b".to_string()).await.unwrap();
    assert_eq!(claimed2.unwrap().request_id, "r2");
}

#[tokio::test]
async fn submitting_a_request_that_depends_on_itself_is_rejected() {
    let dal = test_dal().await;

    let mut r = RequestSubmission::new("noop", serde_json::json!({}));
    r.request_id = "self-ref".to_string();
    r.depends_on = vec!["self-ref".to_string()];
    let err = dal.requests.submit(r).await.unwrap_err();
    assert!(matches!(err, taskstack_engine::EngineError::Validation(_)));
}

#[tokio::test]
async fn a_chain_of_dependencies_unblocks_in_order() {
    let dal = test_dal().await;

    let mut a = RequestSubmission::new("noop", serde_json::json!({}));
    a.request_id = "a".to_string();
    dal.requests.submit(a).await.unwrap();

    let mut b = RequestSubmission::new("noop", serde_json::json!({}));
    b.request_id = "b".to_string();
    b.depends_on = vec!["a".to_string()];
    let b_outcome = dal.requests.submit(b).await.unwrap();
    assert_eq!(b_outcome.request.status().unwrap(), RequestStatus::Blocked);

    let mut c = RequestSubmission::new("noop", serde_json::json!({}));
    c.request_id = "c".to_string();
    c.depends_on = vec!["b".to_string()];
    let c_outcome = dal.requests.submit(c).await.unwrap();
    assert_eq!(c_outcome.request.status().unwrap(), RequestStatus::Blocked);

    dal.requests.claim_next("w".to_string()).await.unwrap();
    dal.requests.mark_done("a".to_string(), "stack-a".to_string()).await.unwrap();
    let unblocked = dal.requests.unblock_dependents("a".to_string()).await.unwrap();
    assert_eq!(unblocked, vec!["b".to_string()]);

    // c is still blocked on b, which is not yet done.
    let c_now = dal.requests.get("c").await.unwrap();
    assert_eq!(c_now.status().unwrap(), RequestStatus::Blocked);
}

#[tokio::test]
async fn cancel_is_rejected_once_claimed() {
    let dal = test_dal().await;
    let mut r = RequestSubmission::new("noop", serde_json::json!({}));
    r.request_id = "r-cancel".to_string();
    dal.requests.submit(r).await.unwrap();

    dal.requests.claim_next("worker".to_string()).await.unwrap();

    let err = dal.requests.cancel("r-cancel".to_string()).await.unwrap_err();
    assert!(matches!(err, taskstack_engine::EngineError::NotCancellable(_)));
}
