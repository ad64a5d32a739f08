//! The research pipeline: clarify → plan → execute → write → (evaluate ↺ write) → publish.
//!
//! [`Orchestrator`] compiles the stages into a graph; each run threads one
//! [`PipelineContext`] through it. Stages implement [`Stage`], tool calls go
//! through [`ToolInvoker`], delivery through a [`Publisher`].

mod config;
mod context;
mod error;
mod feedback;
pub mod format;
mod invoker;
mod nodes;
mod orchestrator;
pub mod prompts;
mod publish;
mod stage;
pub mod stages;

pub use config::PipelineConfig;
pub use context::{
    Clarification, Draft, Evaluation, PipelineContext, Plan, Query, QuestionAnswer, RunStatus,
    SubTask, SubTaskOutcome, SubTaskResult, Verdict,
};
pub use error::{
    ConfigError, PipelineError, StageError, StageErrorCause, ToolError, ToolErrorCause,
};
pub use feedback::{ExhaustedPolicy, FeedbackLoop, InvalidTransition, LoopState};
pub use invoker::ToolInvoker;
pub use orchestrator::{
    run_pipeline, Orchestrator, OrchestratorBuilder, PipelineOutcome, PipelineStages,
};
pub use publish::{DeliveryReceipt, Destination, FilePublisher, Publisher, ToolPublisher};
pub use stage::{Stage, StageDescriptor, StageKind, StageOutput};
