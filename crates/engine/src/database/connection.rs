use deadpool_diesel::sqlite::{Manager, Pool, Runtime};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::MigrationHarness;

use crate::error::{EngineError, EngineResult};

use super::MIGRATIONS;

/// A pooled connection to the engine's SQLite store.
///
/// A single `Database` is shared by every DAL object and by the daemon; each
/// call borrows a connection from the pool for the lifetime of one
/// `interact` closure, mirroring how `deadpool-diesel` is meant to be used
/// with a blocking ORM inside an async runtime.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    pub fn new(database_url: &str, pool_size: usize) -> EngineResult<Self> {
        let manager = Manager::new(database_url, Runtime::Tokio1);
        let pool = Pool::builder(manager)
            .max_size(pool_size)
            .build()
            .map_err(|e| EngineError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Run an operation against a pooled connection on the blocking thread
    /// pool, surfacing any panic or cancellation as an `EngineError`.
    pub async fn interact<F, T>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> EngineResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.pool.get().await.map_err(EngineError::Pool)?;
        conn.interact(f)
            .await
            .map_err(|e| EngineError::Interact(e.to_string()))?
    }

    /// Apply any migrations not yet recorded in `__diesel_schema_migrations`.
    pub async fn run_migrations(&self) -> EngineResult<()> {
        self.interact(|conn| {
            conn.run_pending_migrations(MIGRATIONS)
                .map(|_| ())
                .map_err(|e| EngineError::Migration(e.to_string()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_apply_cleanly_to_an_in_memory_database() {
        let db = Database::new(":memory:", 1).expect("pool");
        db.run_migrations().await.expect("migrations");
    }
}
