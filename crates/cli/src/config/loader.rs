use crate::config::{ConfigError, TaskstackConfig};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from("./taskstack.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("taskstack").join("config.toml"));
        }

        search_paths.push(PathBuf::from("/etc/taskstack/config.toml"));

        Self { search_paths }
    }

    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Load configuration from the specified file, `TASKSTACK_CONFIG`, or
    /// auto-discovery. Falls back to compiled-in defaults if no file is found.
    pub fn load_config(&self, config_file: Option<&Path>) -> Result<TaskstackConfig, ConfigError> {
        let config_path = if let Some(path) = config_file {
            Some(path.to_path_buf())
        } else if let Ok(env_config) = env::var("TASKSTACK_CONFIG") {
            Some(PathBuf::from(env_config))
        } else {
            self.find_config_file()
        };

        match config_path {
            Some(path) => self.load_config_from_file(&path),
            None => Ok(TaskstackConfig::with_defaults()),
        }
    }

    pub fn load_config_from_file(&self, path: &Path) -> Result<TaskstackConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let substituted = self.substitute_env_vars(&content)?;
        Ok(toml::from_str(&substituted)?)
    }

    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .find(|path| path.exists() && path.is_file())
            .cloned()
    }

    /// Substitute `${VAR}`, `${VAR:-default}`, and `${VAR:?error}` occurrences.
    fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static pattern");
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let full_match = &cap[0];
            let var_expr = &cap[1];
            let replacement = self.process_var_expression(var_expr)?;
            result = result.replace(full_match, &replacement);
        }

        Ok(result)
    }

    fn process_var_expression(&self, expr: &str) -> Result<String, ConfigError> {
        if let Some(default_pos) = expr.find(":-") {
            let var_name = &expr[..default_pos];
            let default_value = &expr[default_pos + 2..];
            Ok(env::var(var_name).unwrap_or_else(|_| default_value.to_string()))
        } else if let Some(error_pos) = expr.find(":?") {
            let var_name = &expr[..error_pos];
            let error_msg = &expr[error_pos + 2..];
            env::var(var_name).map_err(|_| {
                ConfigError::EnvSubstitutionError(format!(
                    "required environment variable '{var_name}' is not set: {error_msg}"
                ))
            })
        } else {
            env::var(expr).map_err(|_| {
                ConfigError::EnvSubstitutionError(format!(
                    "required environment variable '{expr}' is not set"
                ))
            })
        }
    }

    pub fn get_search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn env_substitution_with_default() {
        let loader = ConfigLoader::new();
        env::remove_var("TEST_TASKSTACK_VAR_DEFAULT");

        let content = "url = \"${TEST_TASKSTACK_VAR_DEFAULT:-sqlite:///tmp/test.db}\"";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, "url = \"sqlite:///tmp/test.db\"");
    }

    #[test]
    fn env_substitution_with_existing_var() {
        let loader = ConfigLoader::new();
        env::set_var("TEST_TASKSTACK_VAR", "custom_value");

        let content = "url = \"${TEST_TASKSTACK_VAR:-default}\"";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, "url = \"custom_value\"");

        env::remove_var("TEST_TASKSTACK_VAR");
    }

    #[test]
    fn env_substitution_required_var_missing_is_an_error() {
        let loader = ConfigLoader::new();
        env::remove_var("TEST_TASKSTACK_REQUIRED");

        let content = "url = \"${TEST_TASKSTACK_REQUIRED}\"";
        assert!(loader.substitute_env_vars(content).is_err());
    }

    #[test]
    fn env_substitution_custom_error_message_is_preserved() {
        let loader = ConfigLoader::new();
        env::remove_var("TEST_TASKSTACK_REQUIRED");

        let content = "url = \"${TEST_TASKSTACK_REQUIRED:?database url must be provided}\"";
        let err = loader.substitute_env_vars(content).unwrap_err();
        assert!(err.to_string().contains("database url must be provided"));
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let loader = ConfigLoader::with_search_paths(vec![PathBuf::from(
            "/nonexistent/taskstack-config-test.toml",
        )]);
        let config = loader.load_config(None).unwrap();
        assert_eq!(config.log.level, "info");
    }
}
