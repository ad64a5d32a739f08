//! Error taxonomy for a pipeline run.
//!
//! - [`ToolError`]: one tool call failed; recoverable at the stage's discretion.
//! - [`StageError`]: a stage's external call or output parsing failed; fatal.
//! - [`ConfigError`]: invalid configuration; raised before any external call.
//! - [`PipelineError`]: what `Orchestrator::run` returns to the caller.

use std::time::Duration;

use thiserror::Error;

use crate::error::AgentError;
use crate::graph::CompilationError;
use crate::pipeline::context::Draft;
use crate::tool_source::ToolSourceError;

/// Why a tool call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolErrorCause {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("tool not found")]
    NotFound,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("cancelled")]
    Cancelled,
}

/// A single tool invocation failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("tool `{tool_name}` failed: {cause}")]
pub struct ToolError {
    pub tool_name: String,
    pub cause: ToolErrorCause,
}

impl ToolError {
    pub fn new(tool_name: impl Into<String>, cause: ToolErrorCause) -> Self {
        Self {
            tool_name: tool_name.into(),
            cause,
        }
    }

    /// Maps a tool-source failure, keeping its category.
    pub fn from_source(tool_name: impl Into<String>, err: ToolSourceError) -> Self {
        let cause = match err {
            ToolSourceError::NotFound(_) => ToolErrorCause::NotFound,
            ToolSourceError::InvalidInput(m) => ToolErrorCause::InvalidInput(m),
            ToolSourceError::Transport(m) => ToolErrorCause::Transport(m),
        };
        Self::new(tool_name, cause)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cause == ToolErrorCause::Cancelled
    }
}

/// Why a stage failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StageErrorCause {
    /// The model call itself failed.
    #[error("model call failed: {0}")]
    Llm(String),
    /// The model answered but the text did not match the expected schema.
    #[error("could not parse model output: {0}")]
    Parse(String),
    #[error("planner returned an empty plan")]
    EmptyPlan,
    /// A stage returned output for a different stage kind.
    #[error("schema mismatch: expected {expected} output, got {got}")]
    SchemaMismatch {
        expected: &'static str,
        got: &'static str,
    },
    /// A tool call the stage could not recover from.
    #[error(transparent)]
    Tool(ToolError),
    /// Every sub-task of the plan failed; there is nothing to write from.
    #[error("all {count} sub-tasks failed; first: {first}")]
    AllSubTasksFailed { count: usize, first: ToolError },
    #[error("delivery failed: {0}")]
    Delivery(ToolError),
    /// The run was cancelled while the stage was working.
    #[error("cancelled")]
    Cancelled,
    /// The run loop reached a state it cannot continue from.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A stage failed; fatal for the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("stage `{stage}` failed: {cause}")]
pub struct StageError {
    pub stage: String,
    pub cause: StageErrorCause,
}

impl StageError {
    pub fn new(stage: impl Into<String>, cause: StageErrorCause) -> Self {
        Self {
            stage: stage.into(),
            cause,
        }
    }

    /// Wraps a failed model call.
    pub fn llm(stage: impl Into<String>, err: AgentError) -> Self {
        Self::new(stage, StageErrorCause::Llm(err.to_string()))
    }
}

/// Invalid configuration, detected before any external call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("num_subtasks must be at least 1")]
    ZeroSubtasks,
    #[error("concurrency_limit must be at least 1")]
    ZeroConcurrency,
    #[error("tool_timeout must be greater than zero")]
    ZeroTimeout,
    #[error("{field} must not be negative (got {value})")]
    NegativeValue { field: &'static str, value: i64 },
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required stage: {0}")]
    MissingStage(&'static str),
    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("pipeline graph: {0}")]
    Graph(#[from] CompilationError),
}

/// Error returned by a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Stage(#[from] StageError),
    /// The evaluator rejected every draft and the exhausted policy is `Fail`.
    /// Carries all feedback (last one last) and the final draft.
    #[error("evaluator rejected all {attempts} drafts; last feedback: {}", .feedback.last().map(String::as_str).unwrap_or(""))]
    Exhausted {
        attempts: u32,
        feedback: Vec<String>,
        draft: Box<Draft>,
    },
    #[error("pipeline run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Last evaluator feedback, when the run was exhausted.
    pub fn last_feedback(&self) -> Option<&str> {
        match self {
            PipelineError::Exhausted { feedback, .. } => feedback.last().map(String::as_str),
            _ => None,
        }
    }
}

impl From<AgentError> for PipelineError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Stage(e) if e.cause == StageErrorCause::Cancelled => PipelineError::Cancelled,
            AgentError::Stage(e) => PipelineError::Stage(e),
            AgentError::Cancelled => PipelineError::Cancelled,
            AgentError::ExecutionFailed(m) => {
                PipelineError::Stage(StageError::new("orchestrator", StageErrorCause::Internal(m)))
            }
        }
    }
}
