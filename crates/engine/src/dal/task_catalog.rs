//! C1 — read-mostly lookup of task definitions.

use diesel::prelude::*;

use crate::database::Database;
use crate::error::EngineResult;
use crate::models::{TaskDefinition, TaskDefinitionRow};
use crate::schema::tasks;

#[derive(Clone)]
pub struct TaskCatalogDal {
    db: Database,
}

impl TaskCatalogDal {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, task: TaskDefinition) -> EngineResult<()> {
        let row = task.into_new_row()?;
        self.db
            .interact(move |conn| {
                diesel::insert_into(tasks::table)
                    .values(&row)
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    pub async fn by_task_id(&self, task_id: &str) -> EngineResult<Option<TaskDefinition>> {
        let task_id = task_id.to_string();
        let row: Option<TaskDefinitionRow> = self
            .db
            .interact(move |conn| {
                tasks::table
                    .filter(tasks::task_id.eq(&task_id))
                    .first(conn)
                    .optional()
                    .map_err(Into::into)
            })
            .await?;
        row.map(TaskDefinition::try_from).transpose()
    }

    pub async fn list(&self, enabled_only: bool) -> EngineResult<Vec<TaskDefinition>> {
        let rows: Vec<TaskDefinitionRow> = self
            .db
            .interact(move |conn| {
                let mut query = tasks::table.into_boxed();
                if enabled_only {
                    query = query.filter(tasks::enabled.eq(true));
                }
                query.load(conn).map_err(Into::into)
            })
            .await?;
        rows.into_iter().map(TaskDefinition::try_from).collect()
    }

    pub async fn set_enabled(&self, task_id: &str, enabled: bool) -> EngineResult<()> {
        let task_id = task_id.to_string();
        self.db
            .interact(move |conn| {
                diesel::update(tasks::table.filter(tasks::task_id.eq(&task_id)))
                    .set(tasks::enabled.eq(enabled))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }
}
