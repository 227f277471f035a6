//! Durable LIFO task-stack execution core with a graph-backed request queue.
//!
//! This crate owns the SQLite-backed stores (C1-C3, C6, C8), the subprocess
//! runner (C4), and the stack engine that drives a stack from creation to a
//! terminal status (C5). The daemon loop and CLI submission surface (C7, C9)
//! live in the `taskstackctl` binary crate, built on top of [`EngineHandle`].

pub mod context;
pub mod dal;
pub mod database;
pub mod engine;
pub mod error;
pub mod models;
pub mod runner;
pub mod schema;

pub use context::StackContext;
pub use dal::Dal;
pub use database::Database;
pub use engine::{StackEngine, StackOutcome, StepOutcome};
pub use error::{EngineError, EngineResult};

/// Every store plus the stack engine, wired to one SQLite database.
///
/// Construct with [`EngineHandle::builder`]; the builder mirrors the
/// fluent-setter-plus-`build()` shape used elsewhere in this codebase for
/// assembling a runtime from a handful of tunables.
#[derive(Clone)]
pub struct EngineHandle {
    pub dal: Dal,
    pub stack_engine: StackEngine,
}

impl EngineHandle {
    pub fn builder() -> EngineHandleBuilder {
        EngineHandleBuilder::default()
    }
}

pub struct EngineHandleBuilder {
    database_url: String,
    pool_size: usize,
    run_migrations: bool,
}

impl Default for EngineHandleBuilder {
    fn default() -> Self {
        Self {
            database_url: "sqlite://taskstack.db".to_string(),
            pool_size: 10,
            run_migrations: true,
        }
    }
}

impl EngineHandleBuilder {
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub async fn build(self) -> EngineResult<EngineHandle> {
        let db = Database::new(&self.database_url, self.pool_size)?;
        if self.run_migrations {
            db.run_migrations().await?;
        }
        let dal = Dal::new(db);
        let stack_engine = StackEngine::new(dal.stacks.clone(), dal.tasks.clone(), dal.control.clone());
        Ok(EngineHandle { dal, stack_engine })
    }
}
