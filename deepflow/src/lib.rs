//! # deepflow
//!
//! A reusable "deep research" pipeline on a small state graph:
//! **clarify → plan → execute → write → (evaluate ↺ write) → publish**.
//!
//! ## Design principles
//!
//! - **One context per run**: a [`PipelineContext`] is created when a run starts, threaded
//!   through every node, and dropped when it ends. Concurrent runs share only immutable stages.
//! - **Uniform stages**: every step implements [`Stage`] and returns one [`StageOutput`]
//!   variant; a wrong variant is a schema-mismatch [`StageError`].
//! - **Bounded revision loop**: the evaluator → writer edge is driven by [`FeedbackLoop`];
//!   at most `max_retries + 1` drafts are ever written.
//! - **Cancellable everywhere**: one `CancellationToken` is checked before every node,
//!   raced against every model and tool call, and checked right before publishing.
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`Next`], [`RunContext`].
//! - [`pipeline`]: [`Orchestrator`], [`run_pipeline`], stages, feedback loop, tool invoker, publishers.
//! - [`llm`]: [`LlmClient`] trait, [`MockLlm`], [`ChatOpenAI`], [`LlmRegistry`].
//! - [`tool_source`] / [`tools`]: [`ToolSource`], [`ToolRegistry`], web search and web fetcher tools.
//! - [`stream`]: [`PipelineEvent`] progress events.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use deepflow::pipeline::stages::{LlmEvaluator, LlmPlanner, LlmWriter, SkipClarification, ToolExecutor};
//! use deepflow::{ChatOpenAI, ExaWebsearchTool, Orchestrator, PipelineConfig, ToolRegistry};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = Arc::new(ChatOpenAI::new("gpt-4o-mini"));
//! let mut tools = ToolRegistry::new();
//! tools.register(Box::new(ExaWebsearchTool::new(std::env::var("EXA_API_KEY")?)));
//!
//! let orchestrator = Orchestrator::builder()
//!     .clarifier(Arc::new(SkipClarification))
//!     .planner(Arc::new(LlmPlanner::new(llm.clone())))
//!     .executor(Arc::new(ToolExecutor::new(Arc::new(tools)).with_summarizer(llm.clone())))
//!     .writer(Arc::new(LlmWriter::new(llm.clone())))
//!     .evaluator(Arc::new(LlmEvaluator::new(llm)))
//!     .config(PipelineConfig::default())
//!     .build()?;
//! let outcome = orchestrator.run("How does remote work affect urban housing?").await?;
//! println!("{}", outcome.draft.to_markdown());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod graph;
pub mod llm;
pub mod message;
pub mod pipeline;
pub mod stream;
pub mod tool_source;
pub mod tools;

pub use error::AgentError;
pub use graph::{CompilationError, CompiledStateGraph, Next, Node, RunContext, StateGraph, END, START};
pub use llm::{ChatOpenAI, LlmClient, LlmRegistry, LlmResponse, MockLlm};
pub use message::Message;
pub use pipeline::{
    run_pipeline, ConfigError, DeliveryReceipt, Destination, Draft, Evaluation, ExhaustedPolicy, FeedbackLoop,
    FilePublisher, LoopState, Orchestrator, OrchestratorBuilder, PipelineConfig, PipelineContext,
    PipelineError, PipelineOutcome, PipelineStages, Publisher, Query, RunStatus, Stage,
    StageError, StageKind, StageOutput, ToolError, ToolInvoker, ToolPublisher, Verdict,
};
pub use stream::PipelineEvent;
pub use tool_source::{MockToolSource, ToolCallContent, ToolSource, ToolSourceError, ToolSpec};
pub use tools::{ExaWebsearchTool, Tool, ToolRegistry, WebFetcherTool};

/// When running `cargo test -p deepflow`, initializes tracing from `RUST_LOG` so
/// that unit tests can print logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
