pub mod cascade_rule;
pub mod execution_event;
pub mod execution_stack;
pub mod stack_node;
pub mod task_definition;
pub mod task_request;

pub use cascade_rule::{CascadeRuleRow, NewCascadeRuleRow, SourceArtifact};
pub use execution_event::{ExecutionEvent, ExecutionEventType, NewExecutionEvent};
pub use execution_stack::{ExecutionStackRow, NewExecutionStackRow, StackStatus};
pub use stack_node::{NewStackNodeRow, NodeStatus, StackNodeRow, TraceEntry};
pub use task_definition::{NewTaskDefinitionRow, TaskDefinition, TaskDefinitionRow, TaskKind};
pub use task_request::{
    NewTaskRequestRow, RequestStatus, RequestSubmission, TaskRequestRow,
};
