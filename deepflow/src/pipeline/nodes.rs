//! Graph nodes wrapping stages and the publisher.
//!
//! Stages only read the context; these nodes are the single place where stage
//! output is folded into [`PipelineContext`] and the feedback loop advances.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::{Next, Node, RunContext};
use crate::stream::PipelineEvent;

use super::context::PipelineContext;
use super::error::{StageError, StageErrorCause};
use super::feedback::{InvalidTransition, LoopState};
use super::publish::{Destination, Publisher};
use super::stage::{Stage, StageKind, StageOutput};

pub(crate) const NODE_CLARIFY: &str = "clarify";
pub(crate) const NODE_PLAN: &str = "plan";
pub(crate) const NODE_EXECUTE: &str = "execute";
pub(crate) const NODE_WRITE: &str = "write";
pub(crate) const NODE_EVALUATE: &str = "evaluate";
pub(crate) const NODE_PUBLISH: &str = "publish";

const PUBLISHER_STAGE: &str = "publisher";

fn loop_error(stage: &str, err: InvalidTransition) -> StageError {
    StageError::new(stage, StageErrorCause::Internal(err.to_string()))
}

fn into_agent_error(err: StageError) -> AgentError {
    if err.cause == StageErrorCause::Cancelled {
        AgentError::Cancelled
    } else {
        AgentError::Stage(err)
    }
}

/// Runs one stage in a fixed slot and applies its output.
pub(crate) struct StageNode {
    id: &'static str,
    slot: StageKind,
    stage: Arc<dyn Stage>,
}

impl StageNode {
    pub(crate) fn new(id: &'static str, slot: StageKind, stage: Arc<dyn Stage>) -> Self {
        Self { id, slot, stage }
    }

    fn apply(
        &self,
        mut state: PipelineContext,
        output: StageOutput,
        ctx: &RunContext,
    ) -> Result<PipelineContext, StageError> {
        let stage = self.stage.name();
        if output.kind() != self.slot {
            return Err(StageError::new(
                stage,
                StageErrorCause::SchemaMismatch {
                    expected: self.slot.name(),
                    got: output.kind().name(),
                },
            ));
        }
        match output {
            StageOutput::Clarification(c) => state.clarification = Some(c),
            StageOutput::Plan(plan) => state.plan = Some(plan),
            StageOutput::Results(results) => {
                for r in &results {
                    ctx.emit(PipelineEvent::SubTaskFinished {
                        index: r.index,
                        ok: r.is_ok(),
                    });
                }
                state.results = results;
            }
            StageOutput::Draft(mut draft) => {
                state.feedback.on_draft().map_err(|e| loop_error(stage, e))?;
                draft.revision = state.writer_calls;
                state.writer_calls += 1;
                tracing::debug!(revision = draft.revision, "draft written");
                state.draft = Some(draft);
            }
            StageOutput::Evaluation(evaluation) => {
                let next = state
                    .feedback
                    .on_evaluation(&evaluation)
                    .map_err(|e| loop_error(stage, e))?;
                let attempt = state.writer_calls;
                tracing::info!(attempt, verdict = ?evaluation.verdict, state = ?next, "draft evaluated");
                ctx.emit(PipelineEvent::Evaluated {
                    attempt,
                    verdict: evaluation.verdict,
                });
                if next == LoopState::Revising {
                    state.feedback.revise().map_err(|e| loop_error(stage, e))?;
                }
                state.evaluation = Some(evaluation);
            }
        }
        Ok(state)
    }
}

#[async_trait]
impl Node<PipelineContext> for StageNode {
    fn id(&self) -> &str {
        self.id
    }

    async fn run(&self, state: PipelineContext) -> Result<(PipelineContext, Next), AgentError> {
        self.run_with_context(state, &RunContext::default()).await
    }

    async fn run_with_context(
        &self,
        state: PipelineContext,
        ctx: &RunContext,
    ) -> Result<(PipelineContext, Next), AgentError> {
        let name = self.stage.name().to_string();
        ctx.emit(PipelineEvent::StageStart {
            stage: name.clone(),
        });
        let produced = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(StageError::new(name.as_str(), StageErrorCause::Cancelled)),
            r = self.stage.produce(&state, &ctx.cancel) => r,
        };
        let result = produced.and_then(|output| self.apply(state, output, ctx));
        ctx.emit(PipelineEvent::StageEnd {
            stage: name,
            ok: result.is_ok(),
        });
        result.map(|s| (s, Next::Continue)).map_err(into_agent_error)
    }
}

/// Delivers the final draft. Never publishes once the run is cancelled.
pub(crate) struct PublishNode {
    publisher: Arc<dyn Publisher>,
    destination: Destination,
}

impl PublishNode {
    pub(crate) fn new(publisher: Arc<dyn Publisher>, destination: Destination) -> Self {
        Self {
            publisher,
            destination,
        }
    }
}

#[async_trait]
impl Node<PipelineContext> for PublishNode {
    fn id(&self) -> &str {
        NODE_PUBLISH
    }

    async fn run(&self, state: PipelineContext) -> Result<(PipelineContext, Next), AgentError> {
        self.run_with_context(state, &RunContext::default()).await
    }

    async fn run_with_context(
        &self,
        mut state: PipelineContext,
        ctx: &RunContext,
    ) -> Result<(PipelineContext, Next), AgentError> {
        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        let draft = state.draft.as_ref().ok_or_else(|| {
            StageError::new(
                PUBLISHER_STAGE,
                StageErrorCause::Internal("nothing to publish".into()),
            )
        })?;
        ctx.emit(PipelineEvent::StageStart {
            stage: PUBLISHER_STAGE.to_string(),
        });
        let delivered = self
            .publisher
            .publish(draft, &self.destination, &ctx.cancel)
            .await;
        ctx.emit(PipelineEvent::StageEnd {
            stage: PUBLISHER_STAGE.to_string(),
            ok: delivered.is_ok(),
        });
        match delivered {
            Ok(receipt) => {
                tracing::debug!(publisher = self.publisher.name(), location = %receipt.location, "delivery receipt");
                ctx.emit(PipelineEvent::Delivered {
                    location: receipt.location.clone(),
                });
                state.delivery = Some(receipt);
                Ok((state, Next::Continue))
            }
            Err(e) if e.is_cancelled() => Err(AgentError::Cancelled),
            Err(e) => Err(StageError::new(PUBLISHER_STAGE, StageErrorCause::Delivery(e)).into()),
        }
    }
}
