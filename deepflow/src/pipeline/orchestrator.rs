//! Orchestrator: wires the stages into a [`StateGraph`] and runs it.
//!
//! ```text
//! START → clarify → plan → execute → write ─┬─→ (publish) → END        no evaluator
//!                                  ▲        └─→ evaluate ─┬─ Drafting → write
//!                                  └──────────────────────┘  Accepted → (publish) → END
//!                                                             Exhausted → (publish if policy = accept) → END
//! ```
//!
//! The orchestrator performs no I/O itself. A run owns its [`PipelineContext`];
//! runs share only the immutable stage objects, so one [`Orchestrator`] can
//! serve many runs concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::graph::{CompiledStateGraph, LoggingNodeMiddleware, RunContext, StateGraph, END, START};
use crate::stream::PipelineEvent;

use super::config::PipelineConfig;
use super::context::{Draft, Evaluation, PipelineContext, Query, RunStatus, SubTaskResult};
use super::error::{ConfigError, PipelineError, StageError, StageErrorCause};
use super::feedback::{ExhaustedPolicy, LoopState};
use super::nodes::{
    PublishNode, StageNode, NODE_CLARIFY, NODE_EVALUATE, NODE_EXECUTE, NODE_PLAN, NODE_PUBLISH,
    NODE_WRITE,
};
use super::publish::{DeliveryReceipt, Destination, Publisher};
use super::stage::{Stage, StageKind};

const ROUTE_REVISE: &str = "revise";
const ROUTE_DONE: &str = "done";
const ROUTE_STOP: &str = "stop";

/// The stage set of one pipeline.
#[derive(Clone)]
pub struct PipelineStages {
    pub clarifier: Arc<dyn Stage>,
    pub planner: Arc<dyn Stage>,
    pub executor: Arc<dyn Stage>,
    pub writer: Arc<dyn Stage>,
    pub evaluator: Option<Arc<dyn Stage>>,
    pub publisher: Option<(Arc<dyn Publisher>, Destination)>,
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub draft: Draft,
    pub status: RunStatus,
    /// Writer invocations (1 ..= max_retries + 1).
    pub attempts: u32,
    /// Last evaluation, when an evaluator is configured.
    pub evaluation: Option<Evaluation>,
    /// Sub-task results in plan order.
    pub results: Vec<SubTaskResult>,
    pub delivery: Option<DeliveryReceipt>,
}

/// Where to go after an evaluation.
fn route_after_evaluation(state: LoopState, policy: ExhaustedPolicy) -> &'static str {
    match state {
        LoopState::Drafting => ROUTE_REVISE,
        LoopState::Accepted => ROUTE_DONE,
        LoopState::Exhausted if policy == ExhaustedPolicy::Accept => ROUTE_DONE,
        _ => ROUTE_STOP,
    }
}

#[derive(Default)]
pub struct OrchestratorBuilder {
    clarifier: Option<Arc<dyn Stage>>,
    planner: Option<Arc<dyn Stage>>,
    executor: Option<Arc<dyn Stage>>,
    writer: Option<Arc<dyn Stage>>,
    evaluator: Option<Arc<dyn Stage>>,
    publisher: Option<(Arc<dyn Publisher>, Destination)>,
    config: PipelineConfig,
    events: Option<mpsc::Sender<PipelineEvent>>,
    verbose: bool,
}

impl OrchestratorBuilder {
    pub fn clarifier(mut self, stage: Arc<dyn Stage>) -> Self {
        self.clarifier = Some(stage);
        self
    }

    pub fn planner(mut self, stage: Arc<dyn Stage>) -> Self {
        self.planner = Some(stage);
        self
    }

    pub fn executor(mut self, stage: Arc<dyn Stage>) -> Self {
        self.executor = Some(stage);
        self
    }

    pub fn writer(mut self, stage: Arc<dyn Stage>) -> Self {
        self.writer = Some(stage);
        self
    }

    /// Without an evaluator the first draft is final (`RunStatus::Unevaluated`).
    pub fn evaluator(mut self, stage: Arc<dyn Stage>) -> Self {
        self.evaluator = Some(stage);
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn Publisher>, destination: Destination) -> Self {
        self.publisher = Some((publisher, destination));
        self
    }

    /// Sets every stage at once.
    pub fn stages(mut self, stages: PipelineStages) -> Self {
        self.clarifier = Some(stages.clarifier);
        self.planner = Some(stages.planner);
        self.executor = Some(stages.executor);
        self.writer = Some(stages.writer);
        self.evaluator = stages.evaluator;
        self.publisher = stages.publisher;
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Progress events for every run of the built orchestrator.
    pub fn events(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Logs enter/exit of every node at info level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validates the configuration and compiles the graph; makes no external call.
    pub fn build(self) -> Result<Orchestrator, ConfigError> {
        self.config.validate()?;
        let clarifier = self.clarifier.ok_or(ConfigError::MissingStage("clarifier"))?;
        let planner = self.planner.ok_or(ConfigError::MissingStage("planner"))?;
        let executor = self.executor.ok_or(ConfigError::MissingStage("executor"))?;
        let writer = self.writer.ok_or(ConfigError::MissingStage("writer"))?;

        let mut graph = StateGraph::<PipelineContext>::new();
        if self.verbose {
            graph = graph.with_middleware(Arc::new(LoggingNodeMiddleware::default()));
        }
        graph
            .add_node(NODE_CLARIFY, Arc::new(StageNode::new(NODE_CLARIFY, StageKind::Clarifier, clarifier)))
            .add_node(NODE_PLAN, Arc::new(StageNode::new(NODE_PLAN, StageKind::Planner, planner)))
            .add_node(NODE_EXECUTE, Arc::new(StageNode::new(NODE_EXECUTE, StageKind::Executor, executor)))
            .add_node(NODE_WRITE, Arc::new(StageNode::new(NODE_WRITE, StageKind::Writer, writer)))
            .add_edge(START, NODE_CLARIFY)
            .add_edge(NODE_CLARIFY, NODE_PLAN)
            .add_edge(NODE_PLAN, NODE_EXECUTE)
            .add_edge(NODE_EXECUTE, NODE_WRITE);

        let after_write = match self.publisher {
            Some((publisher, destination)) => {
                graph
                    .add_node(NODE_PUBLISH, Arc::new(PublishNode::new(publisher, destination)))
                    .add_edge(NODE_PUBLISH, END);
                NODE_PUBLISH
            }
            None => END,
        };

        let has_evaluator = self.evaluator.is_some();
        match self.evaluator {
            Some(evaluator) => {
                let policy = self.config.on_exhausted;
                let path_map: HashMap<String, String> = [
                    (ROUTE_REVISE, NODE_WRITE),
                    (ROUTE_DONE, after_write),
                    (ROUTE_STOP, END),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
                graph
                    .add_node(
                        NODE_EVALUATE,
                        Arc::new(StageNode::new(NODE_EVALUATE, StageKind::Evaluator, evaluator)),
                    )
                    .add_edge(NODE_WRITE, NODE_EVALUATE)
                    .add_conditional_edges(
                        NODE_EVALUATE,
                        Arc::new(move |ctx: &PipelineContext| {
                            route_after_evaluation(ctx.loop_state(), policy).to_string()
                        }),
                        Some(path_map),
                    );
            }
            None => {
                graph.add_edge(NODE_WRITE, after_write);
            }
        }

        Ok(Orchestrator {
            graph: graph.compile()?,
            config: self.config,
            has_evaluator,
            events: self.events,
        })
    }
}

/// A compiled, reusable pipeline.
#[derive(Clone)]
pub struct Orchestrator {
    graph: CompiledStateGraph<PipelineContext>,
    config: PipelineConfig,
    has_evaluator: bool,
    events: Option<mpsc::Sender<PipelineEvent>>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, query: &str) -> Result<PipelineOutcome, PipelineError> {
        self.run_with_cancel(query, CancellationToken::new()).await
    }

    /// Runs one pipeline. Cancelling `cancel` stops the run at the next
    /// checkpoint with `PipelineError::Cancelled`; nothing is published after that.
    pub async fn run_with_cancel(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let query = Query::new(query)?;
        let mut run = RunContext::new(cancel);
        if let Some(tx) = &self.events {
            run = run.with_events(tx.clone());
        }
        tracing::info!(run_id = %run.run_id, query = %query, "pipeline run started");
        let state = PipelineContext::new(query, self.config.clone());
        let state = self.graph.invoke(state, &run).await?;
        let outcome = self.outcome(run.run_id, state)?;
        tracing::info!(
            run_id = %outcome.run_id,
            status = ?outcome.status,
            attempts = outcome.attempts,
            "pipeline run finished"
        );
        Ok(outcome)
    }

    fn outcome(&self, run_id: String, state: PipelineContext) -> Result<PipelineOutcome, PipelineError> {
        let internal = |msg: String| {
            PipelineError::Stage(StageError::new("orchestrator", StageErrorCause::Internal(msg)))
        };
        let draft = state
            .draft
            .clone()
            .ok_or_else(|| internal("run finished without a draft".into()))?;
        let attempts = state.writer_calls;
        let status = if !self.has_evaluator {
            RunStatus::Unevaluated
        } else {
            match state.loop_state() {
                LoopState::Accepted => RunStatus::Accepted,
                LoopState::Exhausted => {
                    let mut feedback = state.feedback_history().to_vec();
                    if let Some(e) = &state.evaluation {
                        feedback.push(e.feedback.clone());
                    }
                    match self.config.on_exhausted {
                        ExhaustedPolicy::Accept => {
                            tracing::warn!(
                                run_id = %run_id,
                                attempts,
                                last_feedback = feedback.last().map(String::as_str).unwrap_or(""),
                                "retries exhausted; returning last draft"
                            );
                            RunStatus::Exhausted
                        }
                        ExhaustedPolicy::Fail => {
                            return Err(PipelineError::Exhausted {
                                attempts,
                                feedback,
                                draft: Box::new(draft),
                            })
                        }
                    }
                }
                other => return Err(internal(format!("run ended in loop state {other:?}"))),
            }
        };
        Ok(PipelineOutcome {
            run_id,
            draft,
            status,
            attempts,
            evaluation: state.evaluation,
            results: state.results,
            delivery: state.delivery,
        })
    }
}

/// Builds an orchestrator for `stages` and runs `query` once, returning the
/// final draft.
pub async fn run_pipeline(
    query: &str,
    config: PipelineConfig,
    stages: PipelineStages,
) -> Result<Draft, PipelineError> {
    let orchestrator = Orchestrator::builder().config(config).stages(stages).build()?;
    orchestrator.run(query).await.map(|outcome| outcome.draft)
}
