use std::time::Duration;

use taskstack_engine::dal::Dal;
use taskstack_engine::database::Database;
use taskstack_engine::models::{RequestStatus, SourceArtifact, TaskDefinition, TaskKind};

async fn test_dal() -> Dal {
    let db = Database::new(":memory:", 1).expect("pool");
    db.run_migrations().await.expect("migrations");
    let dal = Dal::new(db);
    dal.tasks
        .create(TaskDefinition::new(
            "reindex",
            TaskKind::ShellCommand,
            "true",
            Duration::from_secs(5),
        ))
        .await
        .expect("seed task");
    dal
}

#[tokio::test]
async fn a_matching_commit_materializes_a_pending_request() {
    let dal = test_dal().await;
    dal.cascade
        .create_rule(
            "rule-1".to_string(),
            Some("document".to_string()),
            "reindex".to_string(),
            r#"{"document_id":"$source.id"}"#.to_string(),
            50,
        )
        .await
        .unwrap();

    let mut fields = serde_json::Map::new();
    fields.insert("id".to_string(), serde_json::json!("doc-42"));
    let created = dal
        .cascade
        .evaluate_source(SourceArtifact {
            kind: "document".to_string(),
            fields,
        })
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    let request = dal.requests.get(&created[0]).await.unwrap();
    assert_eq!(request.task_id, "reindex");
    assert_eq!(request.status().unwrap(), RequestStatus::Pending);
    assert_eq!(request.triggered_by_rule.as_deref(), Some("rule-1"));
    let params: serde_json::Value = serde_json::from_str(&request.parameters).unwrap();
    assert_eq!(params["document_id"], "doc-42");
}

#[tokio::test]
async fn a_disabled_rule_does_not_fire() {
    let dal = test_dal().await;
    dal.cascade
        .create_rule(
            "rule-2".to_string(),
            Some("document".to_string()),
            "reindex".to_string(),
            r#"{"document_id":"$source.id"}"#.to_string(),
            50,
        )
        .await
        .unwrap();
    dal.cascade.set_enabled("rule-2".to_string(), false).await.unwrap();

    let mut fields = serde_json::Map::new();
    fields.insert("id".to_string(), serde_json::json!("doc-1"));
    let created = dal
        .cascade
        .evaluate_source(SourceArtifact {
            kind: "document".to_string(),
            fields,
        })
        .await
        .unwrap();

    assert!(created.is_empty());
}

#[tokio::test]
async fn a_rule_with_no_source_kind_filter_matches_every_commit() {
    let dal = test_dal().await;
    dal.cascade
        .create_rule(
            "rule-wildcard".to_string(),
            None,
            "reindex".to_string(),
            r#"{"kind":"any"}"#.to_string(),
            10,
        )
        .await
        .unwrap();

    let created = dal
        .cascade
        .evaluate_source(SourceArtifact {
            kind: "anything".to_string(),
            fields: serde_json::Map::new(),
        })
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
}

#[tokio::test]
async fn a_non_matching_source_kind_does_not_fire() {
    let dal = test_dal().await;
    dal.cascade
        .create_rule(
            "rule-3".to_string(),
            Some("document".to_string()),
            "reindex".to_string(),
            r#"{"document_id":"$source.id"}"#.to_string(),
            50,
        )
        .await
        .unwrap();

    let created = dal
        .cascade
        .evaluate_source(SourceArtifact {
            kind: "image".to_string(),
            fields: serde_json::Map::new(),
        })
        .await
        .unwrap();

    assert!(created.is_empty());
}
