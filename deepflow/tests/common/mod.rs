//! Shared doubles for the pipeline integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use deepflow::pipeline::stages::{LlmEvaluator, LlmPlanner, LlmWriter, SkipClarification, ToolExecutor};
use deepflow::tools::TOOL_WEB_SEARCH;
use deepflow::{
    DeliveryReceipt, Destination, Draft, MockLlm, MockToolSource, Orchestrator, OrchestratorBuilder,
    PipelineConfig, Publisher, ToolError,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

pub fn plan_reply(queries: &[&str]) -> String {
    let searches: Vec<_> = queries
        .iter()
        .map(|q| json!({ "reason": format!("covers {q}"), "query": q }))
        .collect();
    json!({ "searches": searches }).to_string()
}

pub fn draft_reply(title: &str, follow_ups: &[&str]) -> String {
    json!({
        "short_summary": format!("Summary of {title}."),
        "markdown_report": format!("# {title}\n\nFindings drawn from the research notes."),
        "follow_up_questions": follow_ups,
    })
    .to_string()
}

pub fn verdict_reply(accept: bool, feedback: &str) -> String {
    json!({ "is_acceptable": accept, "feedback": feedback }).to_string()
}

/// Search tool answering `results for <query>` with one source URL.
pub fn search_source() -> MockToolSource {
    MockToolSource::new().with_handler(TOOL_WEB_SEARCH, |args| {
        let q = args["query"].as_str().unwrap_or_default();
        Ok(format!(
            "[1] {q}\nURL: https://example.org/{}\n- key facts about {q}",
            q.replace(' ', "-")
        ))
    })
}

/// Publisher counting its calls.
#[derive(Default)]
pub struct CountingPublisher {
    calls: AtomicUsize,
}

impl CountingPublisher {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Publisher for CountingPublisher {
    fn name(&self) -> &str {
        "counting"
    }

    async fn publish(
        &self,
        _draft: &Draft,
        destination: &Destination,
        _cancel: &CancellationToken,
    ) -> Result<DeliveryReceipt, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(DeliveryReceipt {
            location: destination.to_string(),
            detail: None,
        })
    }
}

/// Handles on the doubles behind a built pipeline.
pub struct Doubles {
    pub planner: Arc<MockLlm>,
    pub writer: Arc<MockLlm>,
    pub evaluator: Arc<MockLlm>,
    pub tools: MockToolSource,
    pub publisher: Arc<CountingPublisher>,
}

impl Doubles {
    pub fn new(plan: &[&str], evaluator: MockLlm) -> Self {
        Self {
            planner: Arc::new(MockLlm::new(plan_reply(plan))),
            writer: Arc::new(MockLlm::new(draft_reply(
                "Remote work and urban housing",
                &["How do suburban rents compare?"],
            ))),
            evaluator: Arc::new(evaluator),
            tools: search_source(),
            publisher: Arc::new(CountingPublisher::default()),
        }
    }

    pub fn with_tools(mut self, tools: MockToolSource) -> Self {
        self.tools = tools;
        self
    }

    /// Builder with every stage and the counting publisher wired in.
    pub fn builder(&self, config: PipelineConfig) -> OrchestratorBuilder {
        Orchestrator::builder()
            .config(config)
            .clarifier(Arc::new(SkipClarification))
            .planner(Arc::new(LlmPlanner::new(self.planner.clone())))
            .executor(Arc::new(ToolExecutor::new(Arc::new(self.tools.clone()))))
            .writer(Arc::new(LlmWriter::new(self.writer.clone())))
            .evaluator(Arc::new(LlmEvaluator::new(self.evaluator.clone())))
            .publisher(
                self.publisher.clone(),
                Destination::Webhook("https://hooks.example.org/reports".into()),
            )
    }
}
