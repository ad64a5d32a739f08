//! Evaluators: judge the current draft as accept or reject-with-feedback.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmClient, LlmRegistry};
use crate::pipeline::context::{Evaluation, PipelineContext};
use crate::pipeline::error::{ConfigError, StageError, StageErrorCause};
use crate::pipeline::format::{render_draft, render_research_notes};
use crate::pipeline::prompts;
use crate::pipeline::stage::{Stage, StageDescriptor, StageKind, StageOutput};

use super::{ask, parse_json};

fn missing_draft(stage: &str) -> StageError {
    StageError::new(stage, StageErrorCause::Internal("evaluator ran without a draft".into()))
}

#[derive(Deserialize)]
struct EvaluatorReply {
    is_acceptable: bool,
    #[serde(default)]
    feedback: String,
}

/// Model-judged review.
pub struct LlmEvaluator {
    name: String,
    llm: Arc<dyn LlmClient>,
    instructions: String,
}

impl LlmEvaluator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: StageKind::Evaluator.name().to_string(),
            llm,
            instructions: prompts::EVALUATOR.to_string(),
        }
    }

    pub fn from_descriptor(
        descriptor: &StageDescriptor,
        registry: &LlmRegistry,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            name: descriptor.name.clone(),
            llm: descriptor.resolve(registry)?,
            instructions: descriptor.instructions.clone(),
        })
    }
}

#[async_trait]
impl Stage for LlmEvaluator {
    fn kind(&self) -> StageKind {
        StageKind::Evaluator
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(
        &self,
        ctx: &PipelineContext,
        cancel: &CancellationToken,
    ) -> Result<StageOutput, StageError> {
        let draft = ctx.draft.as_ref().ok_or_else(|| missing_draft(&self.name))?;
        let input = format!(
            "Research query: {}\n\nResearch notes:\n{}\nReport under review:\n{}",
            ctx.query,
            render_research_notes(&ctx.results),
            render_draft(draft)
        );
        let raw = ask(self.llm.as_ref(), &self.name, &self.instructions, input, cancel).await?;
        let reply: EvaluatorReply = parse_json(&self.name, &raw)?;
        let evaluation = if reply.is_acceptable {
            Evaluation::accept(reply.feedback)
        } else if reply.feedback.trim().is_empty() {
            Evaluation::reject("The reviewer rejected the report without details; improve coverage and sourcing.")
        } else {
            Evaluation::reject(reply.feedback)
        };
        Ok(StageOutput::Evaluation(evaluation))
    }
}

/// Deterministic review without a model: a minimum report length in words,
/// optionally at least one follow-up question and at least one cited source
/// URL from the research notes.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    pub min_words: usize,
    pub require_follow_ups: bool,
    pub require_citation: bool,
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self {
            min_words: 200,
            require_follow_ups: true,
            require_citation: false,
        }
    }
}

#[async_trait]
impl Stage for RuleEvaluator {
    fn kind(&self) -> StageKind {
        StageKind::Evaluator
    }

    async fn produce(
        &self,
        ctx: &PipelineContext,
        _cancel: &CancellationToken,
    ) -> Result<StageOutput, StageError> {
        let draft = ctx.draft.as_ref().ok_or_else(|| missing_draft(self.name()))?;
        let mut problems = Vec::new();
        let words = draft.markdown_report.split_whitespace().count();
        if words < self.min_words {
            problems.push(format!(
                "The report has {} words; expand it to at least {}.",
                words, self.min_words
            ));
        }
        if self.require_follow_ups && draft.follow_up_questions.is_empty() {
            problems.push("Add at least one follow-up question.".to_string());
        }
        if self.require_citation {
            let cited = ctx
                .results
                .iter()
                .flat_map(|r| r.sources())
                .any(|s| draft.markdown_report.contains(s.as_str()));
            if !cited {
                problems.push("Cite at least one source URL from the research notes.".to_string());
            }
        }
        let evaluation = if problems.is_empty() {
            Evaluation::accept("meets all review rules")
        } else {
            Evaluation::reject(problems.join(" "))
        };
        Ok(StageOutput::Evaluation(evaluation))
    }
}
