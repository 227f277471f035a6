use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found in any search location")]
    ConfigNotFound,

    #[error("failed to read configuration file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("environment variable substitution failed: {0}")]
    EnvSubstitutionError(String),

    #[error("configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid pool size: {size} (must be between 1 and 100)")]
    InvalidPoolSize { size: u32 },

    #[error("invalid log level: {level} (must be one of: error, warn, info, debug, trace)")]
    InvalidLogLevel { level: String },

    #[error("invalid timeout value: {field} = {value} (must be positive)")]
    InvalidTimeout { field: &'static str, value: u64 },

    #[error("invalid poll interval: {value}ms (must be positive)")]
    InvalidPollInterval { value: u64 },

    #[error("multiple validation errors: {errors:?}")]
    Multiple { errors: Vec<ValidationError> },
}
