use crate::config::{types::*, ValidationError};

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for TaskstackConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = self.database.validate() {
            errors.push(e);
        }
        if let Err(e) = self.worker.validate() {
            errors.push(e);
        }
        if let Err(e) = self.execution.validate() {
            errors.push(e);
        }
        if let Err(e) = self.log.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.into_iter().next().unwrap())
        } else {
            Err(ValidationError::Multiple { errors })
        }
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.pool_size == 0 || self.pool_size > 100 {
            return Err(ValidationError::InvalidPoolSize {
                size: self.pool_size,
            });
        }
        Ok(())
    }
}

impl Validate for WorkerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidPollInterval {
                value: self.poll_interval_ms,
            });
        }
        if self.max_backoff_ms < self.poll_interval_ms {
            return Err(ValidationError::InvalidPollInterval {
                value: self.max_backoff_ms,
            });
        }
        if self.lease_duration_secs == 0 {
            return Err(ValidationError::InvalidTimeout {
                field: "lease_duration_secs",
                value: self.lease_duration_secs,
            });
        }
        if self.graceful_shutdown_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout {
                field: "graceful_shutdown_timeout_secs",
                value: self.graceful_shutdown_timeout_secs,
            });
        }
        Ok(())
    }
}

impl Validate for ExecutionConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.default_task_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout {
                field: "default_task_timeout_secs",
                value: self.default_task_timeout_secs,
            });
        }
        Ok(())
    }
}

impl Validate for LogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match self.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ValidationError::InvalidLogLevel {
                level: self.level.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TaskstackConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let mut config = DatabaseConfig::default();
        config.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut config = LogConfig::default();
        config.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn backoff_below_poll_interval_is_rejected() {
        let mut config = WorkerConfig::default();
        config.max_backoff_ms = config.poll_interval_ms - 1;
        assert!(config.validate().is_err());
    }
}
