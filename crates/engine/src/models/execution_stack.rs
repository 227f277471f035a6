//! C2 — the durable record of a running or finished stack.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::context::StackContext;
use crate::error::{EngineError, EngineResult};
use crate::schema::execution_stacks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackStatus {
    Running,
    Done,
    Failed,
    Cancelled,
}

impl StackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> EngineResult<Self> {
        Ok(match s {
            "running" => Self::Running,
            "done" => Self::Done,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            other => {
                return Err(EngineError::Validation(format!(
                    "unknown stack status '{other}'"
                )))
            }
        })
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = execution_stacks)]
pub struct ExecutionStackRow {
    pub id: i32,
    pub stack_id: String,
    pub created_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub status: String,
    pub initial_request_id: String,
    pub initial_task_id: String,
    pub initial_params: String,
    pub variables: String,
    pub outputs: String,
    pub decisions: String,
    pub errors: String,
    pub metadata: String,
    pub final_output: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = execution_stacks)]
pub struct NewExecutionStackRow {
    pub stack_id: String,
    pub created_at: NaiveDateTime,
    pub status: String,
    pub initial_request_id: String,
    pub initial_task_id: String,
    pub initial_params: String,
    pub variables: String,
    pub outputs: String,
    pub decisions: String,
    pub errors: String,
    pub metadata: String,
}

impl ExecutionStackRow {
    pub fn context(&self) -> EngineResult<StackContext> {
        Ok(StackContext {
            variables: serde_json::from_str(&self.variables)?,
            outputs: serde_json::from_str(&self.outputs)?,
            decisions: serde_json::from_str(&self.decisions)?,
            errors: serde_json::from_str(&self.errors)?,
            metadata: serde_json::from_str(&self.metadata)?,
        })
    }

    pub fn status(&self) -> EngineResult<StackStatus> {
        StackStatus::from_str(&self.status)
    }
}
