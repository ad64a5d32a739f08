//! Builds the pipeline configuration and orchestrator from flags and environment.

use std::sync::Arc;

use deepflow::pipeline::prompts;
use deepflow::pipeline::stages::{
    ClarificationResponder, LlmClarifier, LlmEvaluator, LlmPlanner, LlmWriter, SkipClarification,
    StaticAnswers, ToolExecutor,
};
use deepflow::pipeline::StageDescriptor;
use deepflow::{
    ChatOpenAI, Destination, ExaWebsearchTool, FilePublisher, LlmRegistry, Orchestrator,
    PipelineConfig, PipelineEvent, ToolInvoker, ToolPublisher, ToolRegistry, WebFetcherTool,
};
use tokio::sync::mpsc;

use crate::responder::StdinResponder;
use crate::Args;

pub const APP_NAME: &str = "deepflow";
const PROVIDER: &str = "openai";

/// XDG `[pipeline]` table, then `DEEPFLOW_*` env, then flags.
pub fn pipeline_config(args: &Args) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let file_and_env = config::load_pipeline_section(APP_NAME)?;
    let flags = config::PipelineSection {
        num_subtasks: args.subtasks,
        max_retries: args.max_retries,
        tool_timeout_secs: args.timeout_secs,
        concurrency: args.concurrency,
        on_exhausted: args.on_exhausted.clone(),
    };
    Ok(PipelineConfig::try_from(file_and_env.overlay(flags))?)
}

fn tool_registry() -> Result<ToolRegistry, Box<dyn std::error::Error>> {
    let api_key = std::env::var("EXA_API_KEY")
        .map_err(|_| "EXA_API_KEY is not set (needed for web search)")?;
    let mut search = ExaWebsearchTool::new(api_key);
    if let Ok(endpoint) = std::env::var("EXA_SEARCH_URL") {
        search = search.with_endpoint(endpoint);
    }
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(search));
    registry.register(Box::new(WebFetcherTool::new()));
    Ok(registry)
}

pub fn build_orchestrator(
    args: &Args,
    config: PipelineConfig,
    events: mpsc::Sender<PipelineEvent>,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let llm = Arc::new(ChatOpenAI::new(args.model.clone()));
    let registry = LlmRegistry::new().with(PROVIDER, llm.clone());
    let descriptor = |name: &str, instructions: &str| StageDescriptor::new(name, PROVIDER, instructions);
    let tools = Arc::new(tool_registry()?);

    let mut builder = Orchestrator::builder()
        .config(config.clone())
        .verbose(args.verbose)
        .events(events)
        .planner(Arc::new(LlmPlanner::from_descriptor(
            &descriptor("planner", prompts::PLANNER),
            &registry,
        )?))
        .executor(Arc::new(ToolExecutor::new(tools.clone()).with_summarizer(llm)))
        .writer(Arc::new(LlmWriter::from_descriptor(
            &descriptor("writer", prompts::WRITER),
            &registry,
        )?));

    builder = if args.no_clarify {
        builder.clarifier(Arc::new(SkipClarification))
    } else {
        let responder: Arc<dyn ClarificationResponder> = if args.answer.is_empty() {
            Arc::new(StdinResponder)
        } else {
            Arc::new(StaticAnswers(args.answer.clone()))
        };
        builder.clarifier(Arc::new(LlmClarifier::from_descriptor(
            &descriptor("clarifier", prompts::CLARIFIER),
            &registry,
            responder,
        )?))
    };

    if !args.no_evaluate {
        builder = builder.evaluator(Arc::new(LlmEvaluator::from_descriptor(
            &descriptor("evaluator", prompts::EVALUATOR),
            &registry,
        )?));
    }

    if let Some(dir) = &args.out_dir {
        builder = builder.publisher(
            Arc::new(FilePublisher::new()),
            Destination::Directory(dir.clone()),
        );
    } else if let Some(url) = &args.webhook {
        let invoker = ToolInvoker::new(tools, config.tool_timeout);
        builder = builder.publisher(
            Arc::new(ToolPublisher::webhook(invoker)),
            Destination::Webhook(url.clone()),
        );
    }

    Ok(builder.build()?)
}
