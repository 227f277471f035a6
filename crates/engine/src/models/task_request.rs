//! C6 — nodes of the graph-backed request queue.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::schema::task_requests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Blocked,
    Claimed,
    Executing,
    Done,
    Failed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Blocked => "blocked",
            Self::Claimed => "claimed",
            Self::Executing => "executing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> EngineResult<Self> {
        Ok(match s {
            "pending" => Self::Pending,
            "blocked" => Self::Blocked,
            "claimed" => Self::Claimed,
            "executing" => Self::Executing,
            "done" => Self::Done,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            other => {
                return Err(EngineError::Validation(format!(
                    "unknown request status '{other}'"
                )))
            }
        })
    }
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = task_requests)]
pub struct TaskRequestRow {
    pub id: i32,
    pub request_id: String,
    pub task_id: String,
    pub parameters: String,
    pub status: String,
    pub priority: i32,
    pub requester: String,
    pub created_at: NaiveDateTime,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub result_ref: Option<String>,
    pub error: Option<String>,
    pub triggered_by_rule: Option<String>,
}

impl TaskRequestRow {
    pub fn status(&self) -> EngineResult<RequestStatus> {
        RequestStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_requests)]
pub struct NewTaskRequestRow {
    pub request_id: String,
    pub task_id: String,
    pub parameters: String,
    pub status: String,
    pub priority: i32,
    pub requester: String,
    pub created_at: NaiveDateTime,
    pub triggered_by_rule: Option<String>,
}

/// A request as given to `submit`, before validation assigns its status.
#[derive(Debug, Clone)]
pub struct RequestSubmission {
    pub request_id: String,
    pub task_id: String,
    pub parameters: serde_json::Value,
    pub priority: i32,
    pub requester: String,
    pub depends_on: Vec<String>,
    pub triggered_by_rule: Option<String>,
}

impl RequestSubmission {
    pub fn new(task_id: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            parameters,
            priority: 100,
            requester: "unknown".to_string(),
            depends_on: Vec::new(),
            triggered_by_rule: None,
        }
    }
}
