//! The "monad": a value type plus a fold function, nothing more.
//!
//! `StackContext` accumulates across every node of a stack. Each task result
//! is folded into the running context with [`StackContext::fold`]; no
//! mutable global state is involved.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runner::TaskResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StackContext {
    pub variables: HashMap<String, Value>,
    pub outputs: Vec<Value>,
    pub decisions: Vec<String>,
    pub errors: Vec<String>,
    pub metadata: HashMap<String, Value>,
}

impl StackContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Left-fold a task result into the accumulated context, per the output
    /// rules: `variables`/`metadata` shallow-merge (result wins on key
    /// collision), `outputs`/`decisions`/`errors` are extended.
    pub fn fold(&mut self, result: &TaskResult) {
        for (k, v) in &result.variables {
            self.variables.insert(k.clone(), v.clone());
        }
        self.outputs.push(result.output.clone());
        self.decisions.extend(result.decisions.iter().cloned());
        self.errors.extend(result.errors.iter().cloned());
        for (k, v) in &result.metadata {
            self.metadata.insert(k.clone(), v.clone());
        }
    }
}
