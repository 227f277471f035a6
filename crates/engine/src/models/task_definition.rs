//! C1 — the task catalog's durable record.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::schema::tasks;

/// How the subprocess runner launches a task's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    ShellCommand,
    InlineScriptA,
    ScriptFileA,
    InlineScriptB,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShellCommand => "shell-command",
            Self::InlineScriptA => "inline-script-a",
            Self::ScriptFileA => "script-file-a",
            Self::InlineScriptB => "inline-script-b",
        }
    }

    pub fn from_str(s: &str) -> EngineResult<Self> {
        Ok(match s {
            "shell-command" => Self::ShellCommand,
            "inline-script-a" => Self::InlineScriptA,
            "script-file-a" => Self::ScriptFileA,
            "inline-script-b" => Self::InlineScriptB,
            other => {
                return Err(EngineError::Validation(format!(
                    "unknown task kind '{other}'"
                )))
            }
        })
    }
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = tasks)]
pub struct TaskDefinitionRow {
    pub task_id: String,
    pub kind: String,
    pub code: String,
    pub default_params: String,
    pub working_dir: Option<String>,
    pub env: String,
    pub timeout_seconds: i64,
    pub enabled: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskDefinitionRow {
    pub task_id: String,
    pub kind: String,
    pub code: String,
    pub default_params: String,
    pub working_dir: Option<String>,
    pub env: String,
    pub timeout_seconds: i64,
    pub enabled: bool,
    pub created_at: NaiveDateTime,
}

/// Materialized view of a task definition used by the stack engine and runner.
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub task_id: String,
    pub kind: TaskKind,
    pub code: String,
    pub default_params: HashMap<String, Value>,
    pub working_dir: Option<String>,
    pub env: HashMap<String, String>,
    pub timeout: std::time::Duration,
    pub enabled: bool,
}

impl TaskDefinition {
    pub fn new(
        task_id: impl Into<String>,
        kind: TaskKind,
        code: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            kind,
            code: code.into(),
            default_params: HashMap::new(),
            working_dir: None,
            env: HashMap::new(),
            timeout,
            enabled: true,
        }
    }

    pub fn into_new_row(self) -> EngineResult<NewTaskDefinitionRow> {
        Ok(NewTaskDefinitionRow {
            task_id: self.task_id,
            kind: self.kind.as_str().to_string(),
            code: self.code,
            default_params: serde_json::to_string(&self.default_params)?,
            working_dir: self.working_dir,
            env: serde_json::to_string(&self.env)?,
            timeout_seconds: self.timeout.as_secs() as i64,
            enabled: self.enabled,
            created_at: Utc::now().naive_utc(),
        })
    }
}

impl TryFrom<TaskDefinitionRow> for TaskDefinition {
    type Error = EngineError;

    fn try_from(row: TaskDefinitionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            task_id: row.task_id,
            kind: TaskKind::from_str(&row.kind)?,
            code: row.code,
            default_params: serde_json::from_str(&row.default_params)?,
            working_dir: row.working_dir,
            env: serde_json::from_str(&row.env)?,
            timeout: std::time::Duration::from_secs(row.timeout_seconds.max(0) as u64),
            enabled: row.enabled,
        })
    }
}
