//! The uniform stage contract.
//!
//! Every stage (clarifier, planner, executor, writer, evaluator) implements
//! [`Stage`]: read the run's [`PipelineContext`], return one [`StageOutput`]
//! variant. The orchestrator wraps each stage in a graph node that checks the
//! variant and folds it into the context.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmClient, LlmRegistry};

use super::context::{Clarification, Draft, Evaluation, PipelineContext, Plan, SubTaskResult};
use super::error::{ConfigError, StageError};

/// Which pipeline step a stage implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Clarifier,
    Planner,
    Executor,
    Writer,
    Evaluator,
}

impl StageKind {
    /// Stable name used in errors, logs and events.
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Clarifier => "clarifier",
            StageKind::Planner => "planner",
            StageKind::Executor => "executor",
            StageKind::Writer => "writer",
            StageKind::Evaluator => "evaluator",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of one stage; exactly one variant per [`StageKind`].
#[derive(Debug, Clone)]
pub enum StageOutput {
    Clarification(Clarification),
    Plan(Plan),
    Results(Vec<SubTaskResult>),
    Draft(Draft),
    Evaluation(Evaluation),
}

impl StageOutput {
    /// The stage kind this variant belongs to.
    pub fn kind(&self) -> StageKind {
        match self {
            StageOutput::Clarification(_) => StageKind::Clarifier,
            StageOutput::Plan(_) => StageKind::Planner,
            StageOutput::Results(_) => StageKind::Executor,
            StageOutput::Draft(_) => StageKind::Writer,
            StageOutput::Evaluation(_) => StageKind::Evaluator,
        }
    }
}

/// One pipeline step.
///
/// Implementations must not mutate shared state: one `Arc<dyn Stage>` may serve
/// many concurrent runs. `cancel` fires when the run is cancelled; long-running
/// stages should observe it at every external call.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Name for logs and errors; defaults to the kind's name.
    fn name(&self) -> &str {
        self.kind().name()
    }

    async fn produce(
        &self,
        ctx: &PipelineContext,
        cancel: &CancellationToken,
    ) -> Result<StageOutput, StageError>;
}

/// Configuration bundle for an LLM-backed stage: a name, the provider to call
/// and the instructions steering it.
///
/// Resolved against an [`LlmRegistry`] when the stage is built, so an unknown
/// provider fails at construction rather than mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub name: String,
    pub provider: String,
    pub instructions: String,
}

impl StageDescriptor {
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            instructions: instructions.into(),
        }
    }

    pub fn resolve(&self, registry: &LlmRegistry) -> Result<Arc<dyn LlmClient>, ConfigError> {
        registry.resolve(&self.provider)
    }
}
