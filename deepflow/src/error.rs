//! Node execution error types.
//!
//! Returned by `Node::run` and `CompiledStateGraph::invoke`. Pipeline-level errors
//! (`PipelineError`, `ConfigError`, `StageError`, `ToolError`) live in [`crate::pipeline`];
//! this type is what flows through the graph run loop.

use thiserror::Error;

use crate::pipeline::StageError;

/// Error from one node step or from the graph run loop.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (e.g. LLM call failed, invalid loop transition).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A pipeline stage failed; carries the stage name and cause.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// The run's cancellation token fired before or during this step.
    #[error("run cancelled")]
    Cancelled,
}
