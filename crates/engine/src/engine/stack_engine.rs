use tracing::{debug, info, warn};

use crate::context::StackContext;
use crate::dal::{ControlFlagDal, StackStoreDal, TaskCatalogDal};
use crate::error::{EngineError, EngineResult};
use crate::models::{StackStatus, TraceEntry};
use crate::runner::SubprocessRunner;

/// Outcome of a single `run_one_step` call.
pub enum StepOutcome {
    /// The stack still has queued nodes.
    More,
    /// The stack reached a terminal status.
    Terminal(StackStatus),
}

/// Final shape returned once a stack is drained.
#[derive(Debug, Clone)]
pub struct StackOutcome {
    pub status: StackStatus,
    pub final_output: Option<serde_json::Value>,
    pub context: StackContext,
    pub error_message: Option<String>,
}

/// Drives one `ExecutionStack` from creation to a terminal status.
///
/// A `StackEngine` is stateless between calls — all durable state lives in
/// [`StackStoreDal`]; this type only sequences the calls and talks to the
/// subprocess runner.
#[derive(Clone)]
pub struct StackEngine {
    stacks: StackStoreDal,
    tasks: TaskCatalogDal,
    control: ControlFlagDal,
    runner: SubprocessRunner,
}

impl StackEngine {
    pub fn new(stacks: StackStoreDal, tasks: TaskCatalogDal, control: ControlFlagDal) -> Self {
        Self {
            stacks,
            tasks,
            control,
            runner: SubprocessRunner::new(),
        }
    }

    /// Build a fresh stack with a single root node. Refuses if the kill
    /// switch is engaged or the task is unknown/disabled.
    pub async fn create(
        &self,
        request_id: String,
        task_id: String,
        parameters: serde_json::Value,
    ) -> EngineResult<String> {
        if self.control.kill_switch_engaged().await? {
            return Err(EngineError::KillSwitch("create a new stack"));
        }

        let task = self
            .tasks
            .by_task_id(&task_id)
            .await?
            .ok_or_else(|| EngineError::CatalogMissing(task_id.clone()))?;
        if !task.enabled {
            return Err(EngineError::TaskDisabled(task_id));
        }

        let stack_id = uuid::Uuid::new_v4().to_string();
        self.stacks
            .create_stack(stack_id.clone(), request_id, task_id, parameters)
            .await?;
        info!(stack_id = %stack_id, "stack created");
        Ok(stack_id)
    }

    /// Run a single node to completion, folding its result into the stack's
    /// context. Returns `StepOutcome::Terminal` once the stack is drained,
    /// fails, or is aborted.
    pub async fn run_one_step(&self, stack_id: &str) -> EngineResult<StepOutcome> {
        let stack_row = self.stacks.get_stack(stack_id).await?;
        if stack_row.status()?.is_terminal() {
            return Ok(StepOutcome::Terminal(stack_row.status()?));
        }

        let Some(node) = self.stacks.next_runnable_node(stack_id).await? else {
            let context = stack_row.context()?;
            let final_output = context.outputs.last().cloned();
            self.stacks
                .finalize_stack(stack_id.to_string(), StackStatus::Done, final_output, None)
                .await?;
            info!(stack_id, "stack drained, marking done");
            return Ok(StepOutcome::Terminal(StackStatus::Done));
        };

        self.stacks.mark_node_running(node.queue_id(), "stack-engine").await?;

        let task = match self.tasks.by_task_id(&node.task_id).await? {
            Some(t) => t,
            None => {
                let message = format!("task '{}' not found in catalog", node.task_id);
                self.stacks.mark_node_failed(node.queue_id(), message.clone()).await?;
                return self.fail_stack(stack_id, message).await;
            }
        };

        let parameters: serde_json::Value = serde_json::from_str(&node.parameters)?;
        let input_context: StackContext = serde_json::from_str(&node.input_context)?;

        let run_result = self
            .runner
            .run(&task, node.queue_id(), stack_id, &parameters, &input_context)
            .await;

        let task_result = match run_result {
            Ok(r) => r,
            Err(err) => {
                warn!(stack_id, queue_id = node.queue_id(), error = %err, "node failed");
                self.stacks
                    .mark_node_failed(node.queue_id(), err.to_string())
                    .await?;
                return self.fail_stack(stack_id, err.to_string()).await;
            }
        };

        let mut context = input_context;
        context.fold(&task_result);

        self.stacks
            .mark_node_done(
                node.queue_id(),
                task_result.output.clone(),
                &context,
                &task_result.pushed_children,
            )
            .await?;
        self.stacks
            .update_stack_context(stack_id.to_string(), &context)
            .await?;

        if !task_result.pushed_children.is_empty() {
            debug!(
                stack_id,
                queue_id = node.queue_id(),
                n = task_result.pushed_children.len(),
                "enqueuing pushed children"
            );
            self.stacks
                .enqueue_children(
                    stack_id.to_string(),
                    node.queue_id(),
                    node.depth,
                    node.request_id.clone(),
                    &context,
                    task_result.pushed_children.clone(),
                )
                .await?;
        }

        if task_result.abort {
            self.stacks
                .cancel_remaining_queued(stack_id.to_string(), "aborted by task".to_string())
                .await?;
            let final_output = context.outputs.last().cloned();
            self.stacks
                .finalize_stack(stack_id.to_string(), StackStatus::Cancelled, final_output, None)
                .await?;
            info!(stack_id, "stack cancelled by task abort");
            return Ok(StepOutcome::Terminal(StackStatus::Cancelled));
        }

        Ok(StepOutcome::More)
    }

    async fn fail_stack(&self, stack_id: &str, error_message: String) -> EngineResult<StepOutcome> {
        self.stacks
            .cancel_remaining_queued(stack_id.to_string(), "parent stack failed".to_string())
            .await?;
        self.stacks
            .finalize_stack(
                stack_id.to_string(),
                StackStatus::Failed,
                None,
                Some(error_message),
            )
            .await?;
        Ok(StepOutcome::Terminal(StackStatus::Failed))
    }

    pub async fn run_to_completion(&self, stack_id: &str) -> EngineResult<StackOutcome> {
        loop {
            match self.run_one_step(stack_id).await? {
                StepOutcome::More => continue,
                StepOutcome::Terminal(status) => {
                    let row = self.stacks.get_stack(stack_id).await?;
                    return Ok(StackOutcome {
                        status,
                        final_output: row
                            .final_output
                            .as_ref()
                            .map(|s| serde_json::from_str(s))
                            .transpose()?,
                        context: row.context()?,
                        error_message: row.error_message.clone(),
                    });
                }
            }
        }
    }

    pub async fn trace(&self, stack_id: &str) -> EngineResult<Vec<TraceEntry>> {
        self.stacks.trace(stack_id).await
    }
}
