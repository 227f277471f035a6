use crate::config::types::*;

impl Default for TaskstackConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            worker: WorkerConfig::default(),
            execution: ExecutionConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://taskstack.db".to_string(),
            pool_size: 10,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_backoff_ms: 30_000,
            lease_duration_secs: 300,
            graceful_shutdown_timeout_secs: 30,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_task_timeout_secs: 300,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Generate a complete default configuration as a TOML string, for `admin`
/// scaffolding or documentation.
pub fn generate_default_config_toml() -> Result<String, toml::ser::Error> {
    let config = TaskstackConfig::default();
    toml::to_string_pretty(&config)
}
