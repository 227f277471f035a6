//! Crate-wide error taxonomy for the task stack engine.

use thiserror::Error;

/// Errors surfaced by the DAL, the stack engine, and the subprocess runner.
///
/// Library-facing functions return `Result<T, EngineError>` so callers can
/// match on a specific variant or let `?` bubble everything to the binary
/// boundary, where it is wrapped in `anyhow` for reporting.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("database connection failed: {0}")]
    Connection(String),

    #[error(transparent)]
    Pool(#[from] deadpool_diesel::PoolError),

    #[error(transparent)]
    Query(#[from] diesel::result::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("interact task panicked or was cancelled: {0}")]
    Interact(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("task '{0}' not found in catalog")]
    CatalogMissing(String),

    #[error("task '{0}' is disabled")]
    TaskDisabled(String),

    #[error("dependency cycle detected for request {0}")]
    DependencyCycle(String),

    #[error("request {0} not found")]
    RequestNotFound(String),

    #[error("stack {0} not found")]
    StackNotFound(String),

    #[error("request {0} cannot be cancelled from its current state")]
    NotCancellable(String),

    #[error("subprocess failed: {0}")]
    Subprocess(String),

    #[error("subprocess timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("kill switch engaged, refusing to {0}")]
    KillSwitch(&'static str),
}

pub type EngineResult<T> = Result<T, EngineError>;
