//! Append-only audit trail emitted alongside every state transition.
//!
//! Nothing in the engine reads these rows back to make decisions; they exist
//! so an operator can reconstruct "what happened to stack S" after the fact.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::execution_events;

/// Every kind of transition the engine and daemon record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionEventType {
    RequestSubmitted,
    RequestBlocked,
    RequestPending,
    RequestClaimed,
    RequestExecuting,
    RequestDone,
    RequestFailed,
    RequestCancelled,
    StackCreated,
    NodeEnqueued,
    NodeStarted,
    NodeCompleted,
    NodeFailed,
    NodeCancelled,
    StackCompleted,
    StackFailed,
    StackCancelled,
    CascadeFired,
    DependencyUnblocked,
    QueueTaskEnqueued,
    QueueTaskClaimed,
    QueueTaskCompleted,
    QueueTaskFailed,
}

impl ExecutionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestSubmitted => "request_submitted",
            Self::RequestBlocked => "request_blocked",
            Self::RequestPending => "request_pending",
            Self::RequestClaimed => "request_claimed",
            Self::RequestExecuting => "request_executing",
            Self::RequestDone => "request_done",
            Self::RequestFailed => "request_failed",
            Self::RequestCancelled => "request_cancelled",
            Self::StackCreated => "stack_created",
            Self::NodeEnqueued => "node_enqueued",
            Self::NodeStarted => "node_started",
            Self::NodeCompleted => "node_completed",
            Self::NodeFailed => "node_failed",
            Self::NodeCancelled => "node_cancelled",
            Self::StackCompleted => "stack_completed",
            Self::StackFailed => "stack_failed",
            Self::StackCancelled => "stack_cancelled",
            Self::CascadeFired => "cascade_fired",
            Self::DependencyUnblocked => "dependency_unblocked",
            Self::QueueTaskEnqueued => "queue_task_enqueued",
            Self::QueueTaskClaimed => "queue_task_claimed",
            Self::QueueTaskCompleted => "queue_task_completed",
            Self::QueueTaskFailed => "queue_task_failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "request_submitted" => Self::RequestSubmitted,
            "request_blocked" => Self::RequestBlocked,
            "request_pending" => Self::RequestPending,
            "request_claimed" => Self::RequestClaimed,
            "request_executing" => Self::RequestExecuting,
            "request_done" => Self::RequestDone,
            "request_failed" => Self::RequestFailed,
            "request_cancelled" => Self::RequestCancelled,
            "stack_created" => Self::StackCreated,
            "node_enqueued" => Self::NodeEnqueued,
            "node_started" => Self::NodeStarted,
            "node_completed" => Self::NodeCompleted,
            "node_failed" => Self::NodeFailed,
            "node_cancelled" => Self::NodeCancelled,
            "stack_completed" => Self::StackCompleted,
            "stack_failed" => Self::StackFailed,
            "stack_cancelled" => Self::StackCancelled,
            "cascade_fired" => Self::CascadeFired,
            "dependency_unblocked" => Self::DependencyUnblocked,
            "queue_task_enqueued" => Self::QueueTaskEnqueued,
            "queue_task_claimed" => Self::QueueTaskClaimed,
            "queue_task_completed" => Self::QueueTaskCompleted,
            "queue_task_failed" => Self::QueueTaskFailed,
            _ => return None,
        })
    }
}

impl std::fmt::Display for ExecutionEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = execution_events)]
pub struct ExecutionEvent {
    pub id: i32,
    pub stack_id: Option<String>,
    pub queue_id: Option<i32>,
    pub request_id: Option<String>,
    pub event_type: String,
    pub event_data: Option<String>,
    pub worker_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub sequence_num: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = execution_events)]
pub struct NewExecutionEvent {
    pub stack_id: Option<String>,
    pub queue_id: Option<i32>,
    pub request_id: Option<String>,
    pub event_type: String,
    pub event_data: Option<String>,
    pub worker_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub sequence_num: i64,
}

impl NewExecutionEvent {
    pub fn stack_event(
        stack_id: &str,
        event_type: ExecutionEventType,
        data: Option<Value>,
        sequence_num: i64,
    ) -> Self {
        Self {
            stack_id: Some(stack_id.to_string()),
            queue_id: None,
            request_id: None,
            event_type: event_type.as_str().to_string(),
            event_data: data.map(|v| v.to_string()),
            worker_id: None,
            created_at: Utc::now().naive_utc(),
            sequence_num,
        }
    }

    pub fn node_event(
        stack_id: &str,
        queue_id: i32,
        event_type: ExecutionEventType,
        data: Option<Value>,
        sequence_num: i64,
    ) -> Self {
        Self {
            stack_id: Some(stack_id.to_string()),
            queue_id: Some(queue_id),
            request_id: None,
            event_type: event_type.as_str().to_string(),
            event_data: data.map(|v| v.to_string()),
            worker_id: None,
            created_at: Utc::now().naive_utc(),
            sequence_num,
        }
    }

    pub fn request_event(
        request_id: &str,
        event_type: ExecutionEventType,
        worker_id: Option<&str>,
        data: Option<Value>,
        sequence_num: i64,
    ) -> Self {
        Self {
            stack_id: None,
            queue_id: None,
            request_id: Some(request_id.to_string()),
            event_type: event_type.as_str().to_string(),
            event_data: data.map(|v| v.to_string()),
            worker_id: worker_id.map(|s| s.to_string()),
            created_at: Utc::now().naive_utc(),
            sequence_num,
        }
    }
}
