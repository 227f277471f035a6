pub mod defaults;
pub mod error;
pub mod loader;
pub mod types;
pub mod validation;

pub use error::{ConfigError, ValidationError};
pub use loader::ConfigLoader;
pub use types::{DatabaseConfig, ExecutionConfig, LogConfig, TaskstackConfig, WorkerConfig};
pub use validation::Validate;
