//! C2 — durable state for `ExecutionStack` and its `StackNode`s.
//!
//! Every mutating method follows the same transactional shape as the rest of
//! this codebase: update the row(s), append an `ExecutionEvent` in the same
//! transaction, return. Selection of the next runnable node implements the
//! stack engine's LIFO ordering (greatest `(depth, sequence, queue_id)`
//! among `queued` rows).

use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::context::StackContext;
use crate::database::Database;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    ExecutionEventType, ExecutionStackRow, NewExecutionEvent, NewExecutionStackRow,
    NewStackNodeRow, NodeStatus, StackNodeRow, StackStatus, TraceEntry,
};
use crate::runner::PushedChild;
use crate::schema::{execution_events, execution_stacks, stack_queue};

#[derive(Clone)]
pub struct StackStoreDal {
    db: Database,
}

fn next_sequence_num(conn: &mut SqliteConnection) -> EngineResult<i64> {
    let max: Option<i64> = execution_events::table
        .select(diesel::dsl::max(execution_events::sequence_num))
        .first(conn)?;
    Ok(max.unwrap_or(0) + 1)
}

impl StackStoreDal {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a fresh stack with a single root node, status `queued`.
    pub async fn create_stack(
        &self,
        stack_id: String,
        request_id: String,
        task_id: String,
        parameters: serde_json::Value,
    ) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<()> {
                    let now = Utc::now().naive_utc();
                    let empty_context = serde_json::to_string(&StackContext::new())?;

                    diesel::insert_into(execution_stacks::table)
                        .values(NewExecutionStackRow {
                            stack_id: stack_id.clone(),
                            created_at: now,
                            status: StackStatus::Running.as_str().to_string(),
                            initial_request_id: request_id.clone(),
                            initial_task_id: task_id.clone(),
                            initial_params: parameters.to_string(),
                            variables: "{}".to_string(),
                            outputs: "[]".to_string(),
                            decisions: "[]".to_string(),
                            errors: "[]".to_string(),
                            metadata: "{}".to_string(),
                        })
                        .execute(conn)?;

                    diesel::insert_into(stack_queue::table)
                        .values(NewStackNodeRow {
                            stack_id: stack_id.clone(),
                            request_id: request_id.clone(),
                            task_id,
                            depth: 0,
                            parent_queue_id: None,
                            sequence: 0,
                            status: NodeStatus::Queued.as_str().to_string(),
                            enqueued_at: now,
                            parameters: parameters.to_string(),
                            input_context: empty_context,
                            pushed_children: "[]".to_string(),
                        })
                        .execute(conn)?;

                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::stack_event(
                            &stack_id,
                            ExecutionEventType::StackCreated,
                            None,
                            seq,
                        ))
                        .execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    pub async fn get_stack(&self, stack_id: &str) -> EngineResult<ExecutionStackRow> {
        let stack_id = stack_id.to_string();
        self.db
            .interact(move |conn| {
                execution_stacks::table
                    .filter(execution_stacks::stack_id.eq(&stack_id))
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| EngineError::StackNotFound(stack_id.clone()))
            })
            .await
    }

    /// Select the next node to run: greatest `(depth, sequence, queue_id)`
    /// among `queued` rows of this stack. `None` means the stack is drained.
    pub async fn next_runnable_node(&self, stack_id: &str) -> EngineResult<Option<StackNodeRow>> {
        let stack_id = stack_id.to_string();
        self.db
            .interact(move |conn| {
                stack_queue::table
                    .filter(stack_queue::stack_id.eq(&stack_id))
                    .filter(stack_queue::status.eq(NodeStatus::Queued.as_str()))
                    .order((
                        stack_queue::depth.desc(),
                        stack_queue::sequence.desc(),
                        stack_queue::id.desc(),
                    ))
                    .first(conn)
                    .optional()
                    .map_err(Into::into)
            })
            .await
    }

    pub async fn mark_node_running(&self, queue_id: i32, worker_id: &str) -> EngineResult<()> {
        let worker_id = worker_id.to_string();
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<()> {
                    let now = Utc::now().naive_utc();
                    diesel::update(stack_queue::table.filter(stack_queue::id.eq(queue_id)))
                        .set((
                            stack_queue::status.eq(NodeStatus::Running.as_str()),
                            stack_queue::started_at.eq(now),
                            stack_queue::worker_id.eq(&worker_id),
                        ))
                        .execute(conn)?;

                    let stack_id: String = stack_queue::table
                        .filter(stack_queue::id.eq(queue_id))
                        .select(stack_queue::stack_id)
                        .first(conn)?;
                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::node_event(
                            &stack_id,
                            queue_id,
                            ExecutionEventType::NodeStarted,
                            None,
                            seq,
                        ))
                        .execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    /// Record a node's successful completion: output, the context snapshot
    /// after folding, and any children it pushed (for the trace only — the
    /// caller is responsible for inserting the child rows via
    /// [`Self::enqueue_children`] inside the same logical step).
    pub async fn mark_node_done(
        &self,
        queue_id: i32,
        output: serde_json::Value,
        output_context: &StackContext,
        pushed_children: &[PushedChild],
    ) -> EngineResult<()> {
        let output_str = output.to_string();
        let context_str = serde_json::to_string(output_context)?;
        let children_str = serde_json::to_string(pushed_children)?;
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<()> {
                    let now = Utc::now().naive_utc();
                    diesel::update(stack_queue::table.filter(stack_queue::id.eq(queue_id)))
                        .set((
                            stack_queue::status.eq(NodeStatus::Done.as_str()),
                            stack_queue::finished_at.eq(now),
                            stack_queue::output.eq(Some(output_str)),
                            stack_queue::output_context.eq(Some(context_str)),
                            stack_queue::pushed_children.eq(children_str),
                        ))
                        .execute(conn)?;

                    let stack_id: String = stack_queue::table
                        .filter(stack_queue::id.eq(queue_id))
                        .select(stack_queue::stack_id)
                        .first(conn)?;
                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::node_event(
                            &stack_id,
                            queue_id,
                            ExecutionEventType::NodeCompleted,
                            None,
                            seq,
                        ))
                        .execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    pub async fn mark_node_failed(&self, queue_id: i32, error_message: String) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<()> {
                    let now = Utc::now().naive_utc();
                    diesel::update(stack_queue::table.filter(stack_queue::id.eq(queue_id)))
                        .set((
                            stack_queue::status.eq(NodeStatus::Failed.as_str()),
                            stack_queue::finished_at.eq(now),
                            stack_queue::error_message.eq(Some(error_message)),
                        ))
                        .execute(conn)?;

                    let stack_id: String = stack_queue::table
                        .filter(stack_queue::id.eq(queue_id))
                        .select(stack_queue::stack_id)
                        .first(conn)?;
                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::node_event(
                            &stack_id,
                            queue_id,
                            ExecutionEventType::NodeFailed,
                            None,
                            seq,
                        ))
                        .execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    /// Insert a sibling group atomically, `sequence` assigned in declared
    /// order. Because selection favors the greatest sequence, the
    /// last-declared child becomes the next-runnable node.
    pub async fn enqueue_children(
        &self,
        stack_id: String,
        parent_queue_id: i32,
        parent_depth: i32,
        parent_request_id_prefix: String,
        input_context: &StackContext,
        children: Vec<PushedChild>,
    ) -> EngineResult<()> {
        if children.is_empty() {
            return Ok(());
        }
        let context_str = serde_json::to_string(input_context)?;
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<()> {
                    let now = Utc::now().naive_utc();
                    for (i, child) in children.into_iter().enumerate() {
                        let request_id =
                            format!("{parent_request_id_prefix}-child-{parent_queue_id}-{i}");
                        diesel::insert_into(stack_queue::table)
                            .values(NewStackNodeRow {
                                stack_id: stack_id.clone(),
                                request_id,
                                task_id: child.task_id,
                                depth: parent_depth + 1,
                                parent_queue_id: Some(parent_queue_id),
                                sequence: i as i32,
                                status: NodeStatus::Queued.as_str().to_string(),
                                enqueued_at: now,
                                parameters: child.parameters.to_string(),
                                input_context: context_str.clone(),
                                pushed_children: "[]".to_string(),
                            })
                            .execute(conn)?;
                    }

                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::node_event(
                            &stack_id,
                            parent_queue_id,
                            ExecutionEventType::NodeEnqueued,
                            None,
                            seq,
                        ))
                        .execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    /// Cancel every still-`queued` node of a stack, e.g. after a failure or
    /// an `abort=true` result.
    pub async fn cancel_remaining_queued(&self, stack_id: String, reason: String) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<()> {
                    let now = Utc::now().naive_utc();
                    diesel::update(
                        stack_queue::table
                            .filter(stack_queue::stack_id.eq(&stack_id))
                            .filter(stack_queue::status.eq(NodeStatus::Queued.as_str())),
                    )
                    .set((
                        stack_queue::status.eq(NodeStatus::Cancelled.as_str()),
                        stack_queue::finished_at.eq(now),
                        stack_queue::error_message.eq(Some(reason)),
                    ))
                    .execute(conn)?;

                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::stack_event(
                            &stack_id,
                            ExecutionEventType::NodeCancelled,
                            None,
                            seq,
                        ))
                        .execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    pub async fn update_stack_context(
        &self,
        stack_id: String,
        context: &StackContext,
    ) -> EngineResult<()> {
        let variables = serde_json::to_string(&context.variables)?;
        let outputs = serde_json::to_string(&context.outputs)?;
        let decisions = serde_json::to_string(&context.decisions)?;
        let errors = serde_json::to_string(&context.errors)?;
        let metadata = serde_json::to_string(&context.metadata)?;
        self.db
            .interact(move |conn| {
                diesel::update(execution_stacks::table.filter(execution_stacks::stack_id.eq(&stack_id)))
                    .set((
                        execution_stacks::variables.eq(variables),
                        execution_stacks::outputs.eq(outputs),
                        execution_stacks::decisions.eq(decisions),
                        execution_stacks::errors.eq(errors),
                        execution_stacks::metadata.eq(metadata),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    pub async fn finalize_stack(
        &self,
        stack_id: String,
        status: StackStatus,
        final_output: Option<serde_json::Value>,
        error_message: Option<String>,
    ) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<()> {
                    let now = Utc::now().naive_utc();
                    diesel::update(execution_stacks::table.filter(execution_stacks::stack_id.eq(&stack_id)))
                        .set((
                            execution_stacks::status.eq(status.as_str()),
                            execution_stacks::finished_at.eq(now),
                            execution_stacks::final_output.eq(final_output.map(|v| v.to_string())),
                            execution_stacks::error_message.eq(error_message),
                        ))
                        .execute(conn)?;

                    let event_type = match status {
                        StackStatus::Done => ExecutionEventType::StackCompleted,
                        StackStatus::Failed => ExecutionEventType::StackFailed,
                        StackStatus::Cancelled => ExecutionEventType::StackCancelled,
                        StackStatus::Running => unreachable!("finalize_stack requires a terminal status"),
                    };
                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::stack_event(&stack_id, event_type, None, seq))
                        .execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    /// The stack's trace, ordered by `finished_at` (nulls — i.e. never-run
    /// nodes — sort last, which cannot happen for a terminated stack).
    pub async fn trace(&self, stack_id: &str) -> EngineResult<Vec<TraceEntry>> {
        let stack_id = stack_id.to_string();
        let rows: Vec<StackNodeRow> = self
            .db
            .interact(move |conn| {
                stack_queue::table
                    .filter(stack_queue::stack_id.eq(&stack_id))
                    .order(stack_queue::finished_at.asc())
                    .load(conn)
                    .map_err(Into::into)
            })
            .await?;
        rows.iter().map(TraceEntry::try_from).collect()
    }
}
