//! C3 — durable lease-based queue for non-stack single-task submissions.

use chrono::Utc;
use diesel::prelude::*;

use crate::database::Database;
use crate::error::EngineResult;
use crate::schema::task_queue;

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = task_queue)]
pub struct TaskQueueRow {
    pub id: i32,
    pub request_id: String,
    pub task_id: String,
    pub parameters: String,
    pub status: String,
    pub worker_id: Option<String>,
    pub lease_expires_at: Option<chrono::NaiveDateTime>,
    pub enqueued_at: chrono::NaiveDateTime,
    pub started_at: Option<chrono::NaiveDateTime>,
    pub finished_at: Option<chrono::NaiveDateTime>,
    pub output: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Clone)]
pub struct TaskQueueDal {
    db: Database,
}

impl TaskQueueDal {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Idempotent: a repeat `request_id` returns the existing row instead of
    /// inserting a duplicate.
    pub async fn enqueue(
        &self,
        request_id: String,
        task_id: String,
        parameters: serde_json::Value,
    ) -> EngineResult<TaskQueueRow> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<TaskQueueRow> {
                    if let Some(existing) = task_queue::table
                        .filter(task_queue::request_id.eq(&request_id))
                        .first::<TaskQueueRow>(conn)
                        .optional()?
                    {
                        return Ok(existing);
                    }

                    diesel::insert_into(task_queue::table)
                        .values((
                            task_queue::request_id.eq(&request_id),
                            task_queue::task_id.eq(&task_id),
                            task_queue::parameters.eq(parameters.to_string()),
                            task_queue::status.eq("queued"),
                            task_queue::enqueued_at.eq(Utc::now().naive_utc()),
                        ))
                        .execute(conn)?;

                    Ok(task_queue::table
                        .filter(task_queue::request_id.eq(&request_id))
                        .first(conn)?)
                })
            })
            .await
    }

    /// Atomically claim the oldest `queued` row, or a `running` row whose
    /// lease has expired, assigning a fresh lease to `worker_id`.
    pub async fn claim(
        &self,
        worker_id: String,
        lease: std::time::Duration,
    ) -> EngineResult<Option<TaskQueueRow>> {
        self.db
            .interact(move |conn| {
                conn.exclusive_transaction(|conn| -> EngineResult<Option<TaskQueueRow>> {
                    let now = Utc::now().naive_utc();
                    let candidate = task_queue::table
                        .filter(
                            task_queue::status
                                .eq("queued")
                                .or(task_queue::status
                                    .eq("running")
                                    .and(task_queue::lease_expires_at.lt(now))),
                        )
                        .order(task_queue::enqueued_at.asc())
                        .first::<TaskQueueRow>(conn)
                        .optional()?;

                    let Some(row) = candidate else {
                        return Ok(None);
                    };

                    let lease_expires_at =
                        now + chrono::Duration::from_std(lease).unwrap_or(chrono::Duration::seconds(300));
                    let started_at = row.started_at.unwrap_or(now);
                    diesel::update(task_queue::table.filter(task_queue::id.eq(row.id)))
                        .set((
                            task_queue::status.eq("running"),
                            task_queue::worker_id.eq(&worker_id),
                            task_queue::lease_expires_at.eq(lease_expires_at),
                            task_queue::started_at.eq(started_at),
                        ))
                        .execute(conn)?;

                    Ok(task_queue::table.find(row.id).first(conn).optional()?)
                })
            })
            .await
    }

    pub async fn renew(&self, id: i32, lease: std::time::Duration) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                let lease_expires_at = Utc::now().naive_utc()
                    + chrono::Duration::from_std(lease).unwrap_or(chrono::Duration::seconds(300));
                diesel::update(task_queue::table.filter(task_queue::id.eq(id)))
                    .set(task_queue::lease_expires_at.eq(lease_expires_at))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    pub async fn complete(
        &self,
        id: i32,
        status: &'static str,
        output: Option<serde_json::Value>,
        error_message: Option<String>,
    ) -> EngineResult<()> {
        self.db
            .interact(move |conn| {
                diesel::update(task_queue::table.filter(task_queue::id.eq(id)))
                    .set((
                        task_queue::status.eq(status),
                        task_queue::finished_at.eq(Utc::now().naive_utc()),
                        task_queue::output.eq(output.map(|v| v.to_string())),
                        task_queue::error_message.eq(error_message),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }
}
