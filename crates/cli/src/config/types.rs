use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskstackConfig {
    pub database: DatabaseConfig,
    pub worker: WorkerConfig,
    pub execution: ExecutionConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// How often the processor daemon polls `claim_next` when idle.
    pub poll_interval_ms: u64,
    /// Upper bound of the exponential backoff applied between empty polls.
    pub max_backoff_ms: u64,
    /// Lease duration granted by the C3 non-stack queue.
    pub lease_duration_secs: u64,
    /// How long the daemon waits for the in-flight request to settle on shutdown.
    pub graceful_shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Used when a `TaskDefinition` is seeded without an explicit timeout.
    pub default_task_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

impl TaskstackConfig {
    pub fn with_defaults() -> Self {
        Self {
            database: DatabaseConfig::default(),
            worker: WorkerConfig::default(),
            execution: ExecutionConfig::default(),
            log: LogConfig::default(),
        }
    }
}
