//! Executor: runs every sub-task of the plan through the tool adapter.
//!
//! Sub-tasks are dispatched concurrently (bounded by `concurrency_limit`) and
//! reassembled in plan order. A failed tool call becomes a
//! [`SubTaskOutcome::Failed`] gap; only a plan where every sub-task failed, a
//! failed summary, or cancellation fails the stage.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::llm::LlmClient;
use crate::pipeline::context::{PipelineContext, SubTask, SubTaskOutcome, SubTaskResult};
use crate::pipeline::error::{StageError, StageErrorCause, ToolError, ToolErrorCause};
use crate::pipeline::invoker::ToolInvoker;
use crate::pipeline::prompts;
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::tool_source::ToolSource;
use crate::tools::TOOL_WEB_SEARCH;

use super::ask;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s<>"'\)\]]+"#).expect("valid url pattern")
});

/// URLs mentioned in tool output, first occurrence order, without duplicates.
pub fn extract_sources(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in URL_RE.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':']);
        if !out.iter().any(|u| u == url) {
            out.push(url.to_string());
        }
    }
    out
}

struct Summarizer {
    llm: Arc<dyn LlmClient>,
    instructions: String,
}

pub struct ToolExecutor {
    source: Arc<dyn ToolSource>,
    tool: String,
    summarizer: Option<Summarizer>,
}

impl ToolExecutor {
    /// Executor calling `web_search` with `{"query": directive}`.
    pub fn new(source: Arc<dyn ToolSource>) -> Self {
        Self {
            source,
            tool: TOOL_WEB_SEARCH.to_string(),
            summarizer: None,
        }
    }

    /// Calls `tool` instead of `web_search`; it must accept `{"query": ...}`.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Summarizes every tool output with `llm` before handing it to the writer.
    pub fn with_summarizer(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.summarizer = Some(Summarizer {
            llm,
            instructions: prompts::SUMMARIZER.to_string(),
        });
        self
    }

    async fn run_one(
        &self,
        invoker: &ToolInvoker,
        index: usize,
        task: &SubTask,
        cancel: &CancellationToken,
    ) -> Result<SubTaskResult, StageError> {
        let outcome = match invoker
            .invoke(&self.tool, json!({ "query": task.directive }), cancel)
            .await
        {
            Ok(content) => {
                let sources = extract_sources(&content.text);
                let summary = match &self.summarizer {
                    Some(s) => {
                        let input = format!(
                            "Search term: {}\nReason for searching: {}\n\nSearch results:\n{}",
                            task.directive, task.rationale, content.text
                        );
                        ask(s.llm.as_ref(), self.name(), &s.instructions, input, cancel).await?
                    }
                    None => content.text,
                };
                SubTaskOutcome::Completed { summary, sources }
            }
            Err(e) if e.is_cancelled() => {
                return Err(StageError::new(self.name(), StageErrorCause::Cancelled))
            }
            // Missing tool is a wiring error; every other sub-task would fail the same way.
            Err(e) if e.cause == ToolErrorCause::NotFound => {
                return Err(StageError::new(self.name(), StageErrorCause::Tool(e)))
            }
            Err(error) => {
                tracing::warn!(index, directive = %task.directive, error = %error, "sub-task failed; recorded as gap");
                SubTaskOutcome::Failed { error }
            }
        };
        Ok(SubTaskResult {
            index,
            directive: task.directive.clone(),
            outcome,
        })
    }
}

#[async_trait]
impl Stage for ToolExecutor {
    fn kind(&self) -> StageKind {
        StageKind::Executor
    }

    async fn produce(
        &self,
        ctx: &PipelineContext,
        cancel: &CancellationToken,
    ) -> Result<StageOutput, StageError> {
        let plan = ctx.plan.as_ref().ok_or_else(|| {
            StageError::new(self.name(), StageErrorCause::Internal("executor ran without a plan".into()))
        })?;
        let invoker = ToolInvoker::new(self.source.clone(), ctx.config.tool_timeout);
        let limit = ctx.config.concurrency_limit.max(1);

        let outcomes: Vec<Result<SubTaskResult, StageError>> =
            stream::iter(plan.items().iter().cloned().enumerate())
                .map(|(index, task)| {
                    let invoker = &invoker;
                    async move {
                        if cancel.is_cancelled() {
                            return Err(StageError::new(self.name(), StageErrorCause::Cancelled));
                        }
                        self.run_one(invoker, index, &task, cancel).await
                    }
                })
                .buffer_unordered(limit)
                .collect()
                .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            results.push(outcome?);
        }
        if cancel.is_cancelled() {
            return Err(StageError::new(self.name(), StageErrorCause::Cancelled));
        }
        results.sort_by_key(|r| r.index);

        if results.iter().all(|r| !r.is_ok()) {
            let first: Option<ToolError> = results.iter().find_map(|r| match &r.outcome {
                SubTaskOutcome::Failed { error } => Some(error.clone()),
                SubTaskOutcome::Completed { .. } => None,
            });
            if let Some(first) = first {
                return Err(StageError::new(
                    self.name(),
                    StageErrorCause::AllSubTasksFailed {
                        count: results.len(),
                        first,
                    },
                ));
            }
        }
        let failed = results.iter().filter(|r| !r.is_ok()).count();
        tracing::info!(subtasks = results.len(), failed, "execution finished");
        Ok(StageOutput::Results(results))
    }
}
