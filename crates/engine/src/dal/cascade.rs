//! C8 policy 2 — cascade rule evaluation on source-artifact commit.

use chrono::Utc;
use diesel::prelude::*;
use regex::Regex;

use crate::database::Database;
use crate::error::EngineResult;
use crate::models::{
    CascadeRuleRow, ExecutionEventType, NewCascadeRuleRow, NewExecutionEvent, NewTaskRequestRow,
    RequestStatus, SourceArtifact,
};
use crate::schema::{cascade_rules, execution_events, task_requests};

#[derive(Clone)]
pub struct CascadeDal {
    db: Database,
}

impl CascadeDal {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create_rule(
        &self,
        rule_id: String,
        source_kind: Option<String>,
        task_id: String,
        parameter_template: String,
        priority: i32,
    ) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                diesel::insert_into(cascade_rules::table)
                    .values(NewCascadeRuleRow {
                        rule_id,
                        source_kind,
                        task_id,
                        parameter_template,
                        priority,
                        enabled: true,
                        created_at: Utc::now().naive_utc(),
                    })
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    pub async fn set_enabled(&self, rule_id: String, enabled: bool) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                diesel::update(cascade_rules::table.filter(cascade_rules::rule_id.eq(&rule_id)))
                    .set(cascade_rules::enabled.eq(enabled))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    pub async fn list_rules(&self) -> EngineResult<Vec<CascadeRuleRow>> {
        self.db
            .interact(|conn| cascade_rules::table.load(conn).map_err(Into::into))
            .await
    }

    /// Materialize a new `TaskRequest` for every enabled rule matching
    /// `source`'s kind. Returns the newly created request ids.
    pub async fn evaluate_source(&self, source: SourceArtifact) -> EngineResult<Vec<String>> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<Vec<String>> {
                    let rules: Vec<CascadeRuleRow> = cascade_rules::table.load(conn)?;
                    let mut created = Vec::new();

                    for rule in rules.iter().filter(|r| r.matches(&source)) {
                        let parameters_str = render_template(&rule.parameter_template, &source);
                        let parameters: serde_json::Value =
                            serde_json::from_str(&parameters_str).unwrap_or(serde_json::Value::Null);
                        let request_id = uuid::Uuid::new_v4().to_string();
                        let now = Utc::now().naive_utc();

                        diesel::insert_into(task_requests::table)
                            .values(NewTaskRequestRow {
                                request_id: request_id.clone(),
                                task_id: rule.task_id.clone(),
                                parameters: parameters.to_string(),
                                status: RequestStatus::Pending.as_str().to_string(),
                                priority: rule.priority,
                                requester: format!("cascade:{}", rule.rule_id),
                                created_at: now,
                                triggered_by_rule: Some(rule.rule_id.clone()),
                            })
                            .execute(conn)?;

                        let seq: Option<i64> = execution_events::table
                            .select(diesel::dsl::max(execution_events::sequence_num))
                            .first(conn)?;
                        diesel::insert_into(execution_events::table)
                            .values(NewExecutionEvent::request_event(
                                &request_id,
                                ExecutionEventType::CascadeFired,
                                None,
                                None,
                                seq.unwrap_or(0) + 1,
                            ))
                            .execute(conn)?;

                        created.push(request_id);
                    }
                    Ok(created)
                })
            })
            .await
    }
}

/// Replace `$source.<field>` occurrences with the artifact's field values.
/// A placeholder is substituted with the field's *raw* text (escaped if it
/// is a string) rather than a re-quoted JSON literal, so authors who already
/// wrap the placeholder in quotes — `{"id":"$source.id"}` — get a valid JSON
/// string, and authors who don't — `{"count":$source.count}` — get a valid
/// JSON number.
fn render_template(template: &str, source: &SourceArtifact) -> String {
    let re = Regex::new(r"\$source\.([A-Za-z0-9_]+)").expect("static pattern");
    re.replace_all(template, |caps: &regex::Captures| {
        let field = &caps[1];
        match source.fields.get(field) {
            Some(serde_json::Value::String(s)) => s.replace('\\', "\\\\").replace('"', "\\\""),
            Some(other) => other.to_string(),
            None => "null".to_string(),
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_quoted_string_field() {
        let mut fields = serde_json::Map::new();
        fields.insert("id".to_string(), serde_json::json!("s1"));
        let source = SourceArtifact {
            kind: "json".to_string(),
            fields,
        };
        let rendered = render_template(r#"{"id":"$source.id"}"#, &source);
        assert_eq!(rendered, r#"{"id":"s1"}"#);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["id"], "s1");
    }

    #[test]
    fn substitutes_unquoted_numeric_field() {
        let mut fields = serde_json::Map::new();
        fields.insert("count".to_string(), serde_json::json!(3));
        let source = SourceArtifact {
            kind: "json".to_string(),
            fields,
        };
        let rendered = render_template(r#"{"count":$source.count}"#, &source);
        assert_eq!(rendered, r#"{"count":3}"#);
    }
}
