use std::io::Write as _;
use std::process::Stdio;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::context::StackContext;
use crate::error::{EngineError, EngineResult};
use crate::models::task_definition::{TaskDefinition, TaskKind};

use super::{parse_task_output, TaskResult};

/// Grace period granted after a SIGTERM-equivalent kill before the runner
/// gives up waiting for the child to exit.
const KILL_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Launches a task's code in a child process and parses its structured
/// result from standard output.
pub struct SubprocessRunner;

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SubprocessRunner {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(
        &self,
        task: &TaskDefinition,
        queue_id: i32,
        stack_id: &str,
        parameters: &Value,
        input_context: &StackContext,
    ) -> EngineResult<TaskResult> {
        let mut cmd = self.build_command(task, parameters)?;

        cmd.env("TASKSTACK_PARAMETERS", parameters.to_string())
            .env("TASKSTACK_INPUT_CONTEXT", serde_json::to_string(input_context)?)
            .env("TASKSTACK_QUEUE_ID", queue_id.to_string())
            .env("TASKSTACK_STACK_ID", stack_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (k, v) in &task.env {
            cmd.env(k, v);
        }
        if let Some(dir) = &task.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(EngineError::Io)?;
        let mut stdout_pipe = child.stdout.take().expect("stdout piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr piped");

        let stdout_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stdout_pipe.read_to_string(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr_pipe.read_to_string(&mut buf).await;
            buf
        });

        let wait_result = tokio::time::timeout(task.timeout, child.wait()).await;

        let status = match wait_result {
            Err(_elapsed) => {
                let _ = child.start_kill();
                let _ = tokio::time::timeout(KILL_GRACE_PERIOD, child.wait()).await;
                return Err(EngineError::Timeout(task.timeout));
            }
            Ok(status) => status.map_err(EngineError::Io)?,
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(EngineError::Subprocess(format!(
                "task '{}' exited with {:?}: {}",
                task.task_id,
                status.code(),
                stderr.trim()
            )));
        }

        Ok(parse_task_output(&stdout))
    }

    fn build_command(&self, task: &TaskDefinition, parameters: &Value) -> EngineResult<Command> {
        match task.kind {
            TaskKind::ShellCommand => {
                let rendered = substitute_params(&task.code, parameters)?;
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(rendered);
                Ok(cmd)
            }
            TaskKind::InlineScriptA | TaskKind::InlineScriptB => {
                let interpreter = if task.kind == TaskKind::InlineScriptB {
                    "python3"
                } else {
                    "sh"
                };
                let mut file = tempfile::NamedTempFile::new().map_err(EngineError::Io)?;
                file.write_all(task.code.as_bytes()).map_err(EngineError::Io)?;
                let (_, path) = file.keep().map_err(|e| EngineError::Io(e.error))?;
                let mut cmd = Command::new(interpreter);
                cmd.arg(path);
                Ok(cmd)
            }
            TaskKind::ScriptFileA => {
                let mut cmd = Command::new("sh");
                cmd.arg(&task.code);
                Ok(cmd)
            }
        }
    }
}

/// Replace `${name}` placeholders in a shell template with values drawn from
/// the parameters map. String values substitute raw; any other JSON value
/// substitutes as its compact JSON encoding.
fn substitute_params(template: &str, parameters: &Value) -> EngineResult<String> {
    let re = Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("static pattern");
    let params_obj = parameters.as_object();
    let mut missing = None;

    let rendered = re.replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        match params_obj.and_then(|m| m.get(name)) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                missing = Some(name.to_string());
                String::new()
            }
        }
    });

    if let Some(name) = missing {
        return Err(EngineError::Validation(format!(
            "shell template references unknown parameter '{name}'"
        )));
    }

    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_string_param_raw() {
        let params = serde_json::json!({"name": "World"});
        let rendered = substitute_params("echo hello ${name}", &params).unwrap();
        assert_eq!(rendered, "echo hello World");
    }

    #[test]
    fn substitutes_numeric_param_as_json() {
        let params = serde_json::json!({"n": 3});
        let rendered = substitute_params("echo ${n}", &params).unwrap();
        assert_eq!(rendered, "echo 3");
    }

    #[test]
    fn missing_param_is_an_error() {
        let params = serde_json::json!({});
        let err = substitute_params("echo ${missing}", &params).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
