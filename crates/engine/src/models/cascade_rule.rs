//! C8 — materializes new requests when a matching source artifact commits.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::cascade_rules;

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = cascade_rules)]
pub struct CascadeRuleRow {
    pub id: i32,
    pub rule_id: String,
    pub source_kind: Option<String>,
    pub task_id: String,
    pub parameter_template: String,
    pub priority: i32,
    pub enabled: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cascade_rules)]
pub struct NewCascadeRuleRow {
    pub rule_id: String,
    pub source_kind: Option<String>,
    pub task_id: String,
    pub parameter_template: String,
    pub priority: i32,
    pub enabled: bool,
    pub created_at: NaiveDateTime,
}

/// A committed source artifact, as observed by cascade evaluation.
#[derive(Debug, Clone)]
pub struct SourceArtifact {
    pub kind: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl CascadeRuleRow {
    pub fn matches(&self, source: &SourceArtifact) -> bool {
        self.enabled
            && self
                .source_kind
                .as_ref()
                .map(|k| k == &source.kind)
                .unwrap_or(true)
    }
}
