//! C2 — one row per task invocation inside a stack.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::schema::stack_queue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Queued,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> EngineResult<Self> {
        Ok(match s {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "done" => Self::Done,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            other => {
                return Err(EngineError::Validation(format!(
                    "unknown node status '{other}'"
                )))
            }
        })
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Running)
    }
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = stack_queue)]
pub struct StackNodeRow {
    pub id: i32,
    pub stack_id: String,
    pub request_id: String,
    pub task_id: String,
    pub depth: i32,
    pub parent_queue_id: Option<i32>,
    pub sequence: i32,
    pub status: String,
    pub enqueued_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub worker_id: Option<String>,
    pub lease_expires_at: Option<NaiveDateTime>,
    pub parameters: String,
    pub input_context: String,
    pub output: Option<String>,
    pub output_context: Option<String>,
    pub pushed_children: String,
    pub error_message: Option<String>,
}

impl StackNodeRow {
    pub fn queue_id(&self) -> i32 {
        self.id
    }

    pub fn status(&self) -> EngineResult<NodeStatus> {
        NodeStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = stack_queue)]
pub struct NewStackNodeRow {
    pub stack_id: String,
    pub request_id: String,
    pub task_id: String,
    pub depth: i32,
    pub parent_queue_id: Option<i32>,
    pub sequence: i32,
    pub status: String,
    pub enqueued_at: NaiveDateTime,
    pub parameters: String,
    pub input_context: String,
    pub pushed_children: String,
}

/// One finalized entry of a stack's execution trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub queue_id: i32,
    pub task_id: String,
    pub depth: i32,
    pub status: String,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub input_context: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub pushed_children: serde_json::Value,
    pub error_message: Option<String>,
}

impl TryFrom<&StackNodeRow> for TraceEntry {
    type Error = EngineError;

    fn try_from(row: &StackNodeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            queue_id: row.id,
            task_id: row.task_id.clone(),
            depth: row.depth,
            status: row.status.clone(),
            started_at: row.started_at,
            finished_at: row.finished_at,
            input_context: serde_json::from_str(&row.input_context)?,
            output: row
                .output
                .as_ref()
                .map(|s| serde_json::from_str(s))
                .transpose()?,
            pushed_children: serde_json::from_str(&row.pushed_children)?,
            error_message: row.error_message.clone(),
        })
    }
}
