//! Writer: synthesizes the research notes into a [`Draft`]; on revisions the
//! previous draft and all evaluator feedback so far are part of the prompt.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmClient, LlmRegistry};
use crate::pipeline::context::{Draft, PipelineContext};
use crate::pipeline::error::{ConfigError, StageError, StageErrorCause};
use crate::pipeline::format::{
    render_clarification, render_draft, render_feedback, render_plan, render_research_notes,
};
use crate::pipeline::prompts;
use crate::pipeline::stage::{Stage, StageDescriptor, StageKind, StageOutput};

use super::{ask, parse_json};

#[derive(Deserialize)]
struct WriterReply {
    #[serde(default)]
    short_summary: String,
    markdown_report: String,
    #[serde(default)]
    follow_up_questions: Vec<String>,
}

pub struct LlmWriter {
    name: String,
    llm: Arc<dyn LlmClient>,
    instructions: String,
}

impl LlmWriter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: StageKind::Writer.name().to_string(),
            llm,
            instructions: prompts::WRITER.to_string(),
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

    fn render_input(ctx: &PipelineContext) -> String {
        let mut input = format!(
            "Research query: {}\n\nClarifications:\n{}\n",
            ctx.query,
            render_clarification(ctx.clarification.as_ref())
        );
        if let Some(plan) = &ctx.plan {
            input.push_str(&format!("\nPlanned searches:\n{}\n", render_plan(plan)));
        }
        input.push_str(&format!(
            "\nResearch notes:\n{}",
            render_research_notes(&ctx.results)
        ));
        if let Some(feedback) = render_feedback(ctx.feedback_history(), ctx.evaluation.as_ref()) {
            if let Some(previous) = &ctx.draft {
                input.push_str(&format!("\nPrevious draft:\n{}\n", render_draft(previous)));
            }
            input.push_str(&format!(
                "\nReviewer feedback to address in this revision:\n{}\n",
                feedback
            ));
        }
        input
    }
}

#[async_trait]
impl Stage for LlmWriter {
    fn kind(&self) -> StageKind {
        StageKind::Writer
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(
        &self,
        ctx: &PipelineContext,
        cancel: &CancellationToken,
    ) -> Result<StageOutput, StageError> {
        let raw = ask(
            self.llm.as_ref(),
            &self.name,
            &self.instructions,
            Self::render_input(ctx),
            cancel,
        )
        .await?;
        let reply: WriterReply = parse_json(&self.name, &raw)?;
        if reply.markdown_report.trim().is_empty() {
            return Err(StageError::new(
                self.name.as_str(),
                StageErrorCause::Parse("markdown_report is empty".into()),
            ));
        }
        Ok(StageOutput::Draft(Draft {
            short_summary: reply.short_summary.trim().to_string(),
            markdown_report: reply.markdown_report,
            follow_up_questions: reply
                .follow_up_questions
                .into_iter()
                .filter(|q| !q.trim().is_empty())
                .collect(),
            revision: 0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::pipeline::config::PipelineConfig;
    use crate::pipeline::context::{Evaluation, Query};

    const REPLY: &str = r##"{"short_summary": "s", "markdown_report": "# R\n\nbody", "follow_up_questions": ["next?", " "]}"##;

    fn ctx() -> PipelineContext {
        PipelineContext::new(Query::new("remote work").unwrap(), PipelineConfig::default())
    }

    #[tokio::test]
    async fn first_draft_has_no_feedback_section() {
        let llm = Arc::new(MockLlm::new(REPLY));
        let out = LlmWriter::new(llm.clone())
            .produce(&ctx(), &CancellationToken::new())
            .await
            .unwrap();
        let StageOutput::Draft(draft) = out else {
            panic!("expected draft");
        };
        assert_eq!(draft.follow_up_questions, ["next?"]);
        let prompt = llm.recorded()[0][1].content().to_string();
        assert!(!prompt.contains("Reviewer feedback"));
    }

    #[tokio::test]
    async fn revision_prompt_carries_feedback_and_previous_draft() {
        let mut ctx = ctx();
        ctx.feedback.on_draft().unwrap();
        ctx.feedback
            .on_evaluation(&Evaluation::reject("cite rent data"))
            .unwrap();
        ctx.feedback.revise().unwrap();
        ctx.draft = Some(Draft {
            markdown_report: "# Old report".into(),
            ..Draft::default()
        });
        let llm = Arc::new(MockLlm::new(REPLY));
        LlmWriter::new(llm.clone())
            .produce(&ctx, &CancellationToken::new())
            .await
            .unwrap();
        let prompt = llm.recorded()[0][1].content().to_string();
        assert!(prompt.contains("Round 1: cite rent data"), "{}", prompt);
        assert!(prompt.contains("# Old report"), "{}", prompt);
    }

    #[tokio::test]
    async fn blank_report_is_rejected() {
        let llm = Arc::new(MockLlm::new(r#"{"short_summary": "s", "markdown_report": ""}"#));
        let err = LlmWriter::new(llm)
            .produce(&ctx(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err.cause, StageErrorCause::Parse(_)));
    }
}
