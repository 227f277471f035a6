//! C6 — the graph-backed request queue.
//!
//! `TaskRequest`s and their `depends-on` edges are persisted as plain SQLite
//! rows; the DAG discipline (cycle rejection, dependency-done checks) is
//! enforced in memory with `petgraph` before any row is written, then the
//! atomic claim itself uses the same `exclusive_transaction` idiom as the
//! rest of the durable stores to guarantee linearizable claims (P5).

use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dal::TaskCatalogDal;
use crate::database::Database;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    ExecutionEventType, NewExecutionEvent, NewTaskRequestRow, RequestStatus, RequestSubmission,
    TaskRequestRow,
};
use crate::schema::{execution_events, request_dependencies, task_requests};

#[derive(Clone)]
pub struct RequestQueueDal {
    db: Database,
    tasks: TaskCatalogDal,
}

pub struct SubmitOutcome {
    pub request: TaskRequestRow,
    pub is_new: bool,
}

#[derive(Debug, Default, Clone)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub limit: i64,
}

fn next_sequence_num(conn: &mut SqliteConnection) -> EngineResult<i64> {
    let max: Option<i64> = execution_events::table
        .select(diesel::dsl::max(execution_events::sequence_num))
        .first(conn)?;
    Ok(max.unwrap_or(0) + 1)
}

fn fetch_by_request_id(
    conn: &mut SqliteConnection,
    request_id: &str,
) -> EngineResult<Option<TaskRequestRow>> {
    Ok(task_requests::table
        .filter(task_requests::request_id.eq(request_id))
        .first(conn)
        .optional()?)
}

fn dependencies_of(conn: &mut SqliteConnection, request_id: &str) -> EngineResult<Vec<String>> {
    Ok(request_dependencies::table
        .filter(request_dependencies::request_id.eq(request_id))
        .select(request_dependencies::depends_on_request_id)
        .load(conn)?)
}

fn all_dependencies_done(conn: &mut SqliteConnection, request_id: &str) -> EngineResult<bool> {
    let deps = dependencies_of(conn, request_id)?;
    for dep in deps {
        let status: Option<String> = task_requests::table
            .filter(task_requests::request_id.eq(&dep))
            .select(task_requests::status)
            .first(conn)
            .optional()?;
        if status.as_deref() != Some(RequestStatus::Done.as_str()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Insert-time DFS cycle check: build the full dependency graph (existing
/// edges plus the edges this submission would add) and reject if it is not
/// a DAG.
fn check_no_cycle(
    conn: &mut SqliteConnection,
    new_request_id: &str,
    depends_on: &[String],
) -> EngineResult<()> {
    let existing: Vec<(String, String)> = request_dependencies::table
        .select((
            request_dependencies::request_id,
            request_dependencies::depends_on_request_id,
        ))
        .load(conn)?;

    let mut graph = DiGraph::<String, ()>::new();
    let mut index_of: HashMap<String, NodeIndex> = HashMap::new();

    let mut node_index = |graph: &mut DiGraph<String, ()>, index_of: &mut HashMap<String, NodeIndex>, id: &str| {
        if let Some(idx) = index_of.get(id) {
            *idx
        } else {
            let idx = graph.add_node(id.to_string());
            index_of.insert(id.to_string(), idx);
            idx
        }
    };

    for (from, to) in &existing {
        let a = node_index(&mut graph, &mut index_of, from);
        let b = node_index(&mut graph, &mut index_of, to);
        graph.add_edge(a, b, ());
    }
    let new_idx = node_index(&mut graph, &mut index_of, new_request_id);
    for dep in depends_on {
        let dep_idx = node_index(&mut graph, &mut index_of, dep);
        graph.add_edge(new_idx, dep_idx, ());
    }

    if is_cyclic_directed(&graph) {
        return Err(EngineError::DependencyCycle(new_request_id.to_string()));
    }
    Ok(())
}

impl RequestQueueDal {
    pub fn new(db: Database, tasks: TaskCatalogDal) -> Self {
        Self { db, tasks }
    }

    pub async fn submit(&self, submission: RequestSubmission) -> EngineResult<SubmitOutcome> {
        if !(1..=1000).contains(&submission.priority) {
            return Err(EngineError::Validation(
                "priority must be between 1 and 1000".to_string(),
            ));
        }

        let task = self
            .tasks
            .by_task_id(&submission.task_id)
            .await?
            .ok_or_else(|| EngineError::CatalogMissing(submission.task_id.clone()))?;
        if !task.enabled {
            return Err(EngineError::TaskDisabled(submission.task_id.clone()));
        }

        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<SubmitOutcome> {
                    if let Some(existing) = fetch_by_request_id(conn, &submission.request_id)? {
                        return Ok(SubmitOutcome {
                            request: existing,
                            is_new: false,
                        });
                    }

                    for dep in &submission.depends_on {
                        if fetch_by_request_id(conn, dep)?.is_none() {
                            return Err(EngineError::Validation(format!(
                                "depends_on target '{dep}' does not exist"
                            )));
                        }
                    }
                    check_no_cycle(conn, &submission.request_id, &submission.depends_on)?;

                    let mut all_done = true;
                    for dep in &submission.depends_on {
                        let status: String = task_requests::table
                            .filter(task_requests::request_id.eq(dep))
                            .select(task_requests::status)
                            .first(conn)?;
                        if status != RequestStatus::Done.as_str() {
                            all_done = false;
                            break;
                        }
                    }
                    let initial_status = if all_done {
                        RequestStatus::Pending
                    } else {
                        RequestStatus::Blocked
                    };

                    let now = Utc::now().naive_utc();
                    diesel::insert_into(task_requests::table)
                        .values(NewTaskRequestRow {
                            request_id: submission.request_id.clone(),
                            task_id: submission.task_id,
                            parameters: submission.parameters.to_string(),
                            status: initial_status.as_str().to_string(),
                            priority: submission.priority,
                            requester: submission.requester,
                            created_at: now,
                            triggered_by_rule: submission.triggered_by_rule,
                        })
                        .execute(conn)?;

                    for dep in &submission.depends_on {
                        diesel::insert_into(request_dependencies::table)
                            .values((
                                request_dependencies::request_id.eq(&submission.request_id),
                                request_dependencies::depends_on_request_id.eq(dep),
                            ))
                            .execute(conn)?;
                    }

                    let event_type = match initial_status {
                        RequestStatus::Pending => ExecutionEventType::RequestPending,
                        _ => ExecutionEventType::RequestBlocked,
                    };
                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::request_event(
                            &submission.request_id,
                            event_type,
                            None,
                            None,
                            seq,
                        ))
                        .execute(conn)?;

                    let request = fetch_by_request_id(conn, &submission.request_id)?
                        .expect("just inserted");
                    Ok(SubmitOutcome {
                        request,
                        is_new: true,
                    })
                })
            })
            .await
    }

    /// Atomically claim the highest-priority, earliest-created `pending`
    /// request whose dependencies are all `done`. Linearizable: the
    /// `exclusive_transaction` holds SQLite's write lock for the whole
    /// select-then-update, so no two callers can observe the same row.
    pub async fn claim_next(&self, worker_id: String) -> EngineResult<Option<TaskRequestRow>> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<Option<TaskRequestRow>> {
                    let candidates: Vec<TaskRequestRow> = task_requests::table
                        .filter(task_requests::status.eq(RequestStatus::Pending.as_str()))
                        .order((
                            task_requests::priority.desc(),
                            task_requests::created_at.asc(),
                        ))
                        .load(conn)?;

                    for candidate in candidates {
                        if all_dependencies_done(conn, &candidate.request_id)? {
                            let now = Utc::now().naive_utc();
                            diesel::update(
                                task_requests::table.filter(task_requests::id.eq(candidate.id)),
                            )
                            .set((
                                task_requests::status.eq(RequestStatus::Claimed.as_str()),
                                task_requests::claimed_by.eq(&worker_id),
                                task_requests::claimed_at.eq(now),
                            ))
                            .execute(conn)?;

                            let seq = next_sequence_num(conn)?;
                            diesel::insert_into(execution_events::table)
                                .values(NewExecutionEvent::request_event(
                                    &candidate.request_id,
                                    ExecutionEventType::RequestClaimed,
                                    Some(&worker_id),
                                    None,
                                    seq,
                                ))
                                .execute(conn)?;

                            return Ok(fetch_by_request_id(conn, &candidate.request_id)?);
                        }
                    }
                    Ok(None)
                })
            })
            .await
    }

    pub async fn mark_executing(&self, request_id: String) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                diesel::update(task_requests::table.filter(task_requests::request_id.eq(&request_id)))
                    .set(task_requests::status.eq(RequestStatus::Executing.as_str()))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    pub async fn mark_done(&self, request_id: String, result_ref: String) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<()> {
                    let now = Utc::now().naive_utc();
                    diesel::update(task_requests::table.filter(task_requests::request_id.eq(&request_id)))
                        .set((
                            task_requests::status.eq(RequestStatus::Done.as_str()),
                            task_requests::finished_at.eq(now),
                            task_requests::result_ref.eq(Some(result_ref)),
                        ))
                        .execute(conn)?;
                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::request_event(
                            &request_id,
                            ExecutionEventType::RequestDone,
                            None,
                            None,
                            seq,
                        ))
                        .execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    pub async fn mark_failed(&self, request_id: String, error: String) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<()> {
                    let now = Utc::now().naive_utc();
                    diesel::update(task_requests::table.filter(task_requests::request_id.eq(&request_id)))
                        .set((
                            task_requests::status.eq(RequestStatus::Failed.as_str()),
                            task_requests::finished_at.eq(now),
                            task_requests::error.eq(Some(error)),
                        ))
                        .execute(conn)?;
                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::request_event(
                            &request_id,
                            ExecutionEventType::RequestFailed,
                            None,
                            None,
                            seq,
                        ))
                        .execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    /// Only `pending`/`blocked` requests can be cancelled; a `claimed` or
    /// later request must instead be aborted from within its running stack.
    pub async fn cancel(&self, request_id: String) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<()> {
                    let row = fetch_by_request_id(conn, &request_id)?
                        .ok_or_else(|| EngineError::RequestNotFound(request_id.clone()))?;
                    if !matches!(row.status()?, RequestStatus::Pending | RequestStatus::Blocked) {
                        return Err(EngineError::NotCancellable(request_id));
                    }
                    diesel::update(task_requests::table.filter(task_requests::id.eq(row.id)))
                        .set((
                            task_requests::status.eq(RequestStatus::Cancelled.as_str()),
                            task_requests::finished_at.eq(Utc::now().naive_utc()),
                        ))
                        .execute(conn)?;
                    let seq = next_sequence_num(conn)?;
                    diesel::insert_into(execution_events::table)
                        .values(NewExecutionEvent::request_event(
                            &request_id,
                            ExecutionEventType::RequestCancelled,
                            None,
                            None,
                            seq,
                        ))
                        .execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    pub async fn get(&self, request_id: &str) -> EngineResult<TaskRequestRow> {
        let request_id = request_id.to_string();
        self.db
            .interact(move |conn| {
                fetch_by_request_id(conn, &request_id)?
                    .ok_or_else(|| EngineError::RequestNotFound(request_id.clone()))
            })
            .await
    }

    pub async fn list(&self, filter: RequestFilter) -> EngineResult<Vec<TaskRequestRow>> {
        self.db
            .interact(move |conn| {
                let mut query = task_requests::table.into_boxed();
                if let Some(status) = filter.status {
                    query = query.filter(task_requests::status.eq(status.as_str()));
                }
                query
                    .order(task_requests::created_at.desc())
                    .limit(filter.limit)
                    .load(conn)
                    .map_err(Into::into)
            })
            .await
    }

    /// C8 policy 1: when `completed_request_id` becomes `done`, promote
    /// every `blocked` dependent whose dependencies are now all satisfied.
    pub async fn unblock_dependents(&self, completed_request_id: String) -> EngineResult<Vec<String>> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<Vec<String>> {
                    let dependents: Vec<String> = request_dependencies::table
                        .filter(request_dependencies::depends_on_request_id.eq(&completed_request_id))
                        .select(request_dependencies::request_id)
                        .load(conn)?;

                    let mut unblocked = Vec::new();
                    for dependent_id in dependents {
                        let row = match fetch_by_request_id(conn, &dependent_id)? {
                            Some(r) => r,
                            None => continue,
                        };
                        if row.status()? != RequestStatus::Blocked {
                            continue;
                        }
                        if all_dependencies_done(conn, &dependent_id)? {
                            diesel::update(task_requests::table.filter(task_requests::id.eq(row.id)))
                                .set(task_requests::status.eq(RequestStatus::Pending.as_str()))
                                .execute(conn)?;
                            let seq = next_sequence_num(conn)?;
                            diesel::insert_into(execution_events::table)
                                .values(NewExecutionEvent::request_event(
                                    &dependent_id,
                                    ExecutionEventType::DependencyUnblocked,
                                    None,
                                    None,
                                    seq,
                                ))
                                .execute(conn)?;
                            unblocked.push(dependent_id);
                        }
                    }
                    Ok(unblocked)
                })
            })
            .await
    }
}
