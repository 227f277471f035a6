//! C4 — launches a task's code as a child process and parses its result.

mod subprocess;

pub use subprocess::SubprocessRunner;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed marker field a child process sets (truthy) to signal that its last
/// stdout line is a structured result rather than incidental log output.
pub const RESULT_MARKER_FIELD: &str = "taskstack_result";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushedChild {
    pub task_id: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub reason: Option<String>,
}

/// The folded contribution of a single task invocation to the stack context.
#[derive(Debug, Clone, Default)]
pub struct TaskResult {
    pub output: Value,
    pub variables: HashMap<String, Value>,
    pub decisions: Vec<String>,
    pub errors: Vec<String>,
    pub metadata: HashMap<String, Value>,
    pub pushed_children: Vec<PushedChild>,
    pub abort: bool,
}

#[derive(Debug, Deserialize, Default)]
struct RawResult {
    #[serde(default)]
    output: Value,
    #[serde(default)]
    variables: HashMap<String, Value>,
    #[serde(default)]
    decisions: Vec<String>,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
    #[serde(default)]
    pushed_children: Vec<PushedChild>,
    #[serde(default)]
    abort: bool,
}

/// Parse the last non-empty line of captured stdout. If it is a JSON object
/// with the marker field truthy, interpret it as a structured result;
/// otherwise treat the whole of stdout as a raw string output with an empty
/// context delta.
pub fn parse_task_output(stdout: &str) -> TaskResult {
    let last_line = stdout.lines().rev().find(|l| !l.trim().is_empty());

    if let Some(line) = last_line {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(line) {
            let is_marked = map
                .get(RESULT_MARKER_FIELD)
                .map(|v| v.as_bool().unwrap_or(false))
                .unwrap_or(false);
            if is_marked {
                let raw: RawResult =
                    serde_json::from_value(Value::Object(map)).unwrap_or_default();
                return TaskResult {
                    output: raw.output,
                    variables: raw.variables,
                    decisions: raw.decisions,
                    errors: raw.errors,
                    metadata: raw.metadata,
                    pushed_children: raw.pushed_children,
                    abort: raw.abort,
                };
            }
        }
    }

    TaskResult {
        output: Value::String(stdout.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_stdout_becomes_string_output() {
        let result = parse_task_output("just some log lines\nhello world\n");
        assert_eq!(result.output, Value::String("hello world".to_string()));
        assert!(result.pushed_children.is_empty());
    }

    #[test]
    fn structured_result_is_recognized() {
        let stdout = format!(
            "progress: 50%\n{{\"{}\":true,\"output\":\"done\",\"variables\":{{\"x\":1}}}}",
            RESULT_MARKER_FIELD
        );
        let result = parse_task_output(&stdout);
        assert_eq!(result.output, Value::String("done".to_string()));
        assert_eq!(result.variables.get("x"), Some(&Value::from(1)));
    }

    #[test]
    fn unmarked_json_object_is_treated_as_raw_output() {
        let stdout = "{\"foo\":\"bar\"}";
        let result = parse_task_output(stdout);
        assert_eq!(result.output, Value::String(stdout.to_string()));
    }
}
