//! Clarifier: asks the model which questions would sharpen the query, then
//! collects answers from a [`ClarificationResponder`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmClient, LlmRegistry};
use crate::pipeline::context::{Clarification, PipelineContext, Query, QuestionAnswer};
use crate::pipeline::error::{ConfigError, StageError};
use crate::pipeline::prompts;
use crate::pipeline::stage::{Stage, StageDescriptor, StageKind, StageOutput};

use super::{ask, parse_json};

const DEFAULT_ANSWER: &str = "No preference.";

/// Supplies answers to clarifying questions (a person, a fixed list, ...).
#[async_trait]
pub trait ClarificationResponder: Send + Sync {
    /// Returns one answer per question, in order. Missing answers are filled
    /// with a neutral default.
    async fn answer(&self, query: &Query, questions: &[String]) -> Result<Vec<String>, StageError>;
}

/// Answers taken from a fixed list, matched to questions by position.
#[derive(Debug, Clone, Default)]
pub struct StaticAnswers(pub Vec<String>);

#[async_trait]
impl ClarificationResponder for StaticAnswers {
    async fn answer(&self, _query: &Query, questions: &[String]) -> Result<Vec<String>, StageError> {
        Ok(questions
            .iter()
            .enumerate()
            .map(|(i, _)| self.0.get(i).cloned().unwrap_or_else(|| DEFAULT_ANSWER.to_string()))
            .collect())
    }
}

/// Clarifier stage that asks nothing and returns an empty clarification.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipClarification;

#[async_trait]
impl Stage for SkipClarification {
    fn kind(&self) -> StageKind {
        StageKind::Clarifier
    }

    async fn produce(
        &self,
        _ctx: &PipelineContext,
        _cancel: &CancellationToken,
    ) -> Result<StageOutput, StageError> {
        Ok(StageOutput::Clarification(Clarification::skipped()))
    }
}

#[derive(Deserialize)]
struct ClarifierReply {
    #[serde(default)]
    questions: Vec<String>,
}

pub struct LlmClarifier {
    name: String,
    llm: Arc<dyn LlmClient>,
    instructions: String,
    responder: Arc<dyn ClarificationResponder>,
    max_questions: usize,
}

impl LlmClarifier {
    pub fn new(llm: Arc<dyn LlmClient>, responder: Arc<dyn ClarificationResponder>) -> Self {
        Self {
            name: StageKind::Clarifier.name().to_string(),
            llm,
            instructions: prompts::CLARIFIER.to_string(),
            responder,
            max_questions: 3,
        }
    }

    pub fn from_descriptor(
        descriptor: &StageDescriptor,
        registry: &LlmRegistry,
        responder: Arc<dyn ClarificationResponder>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            name: descriptor.name.clone(),
            instructions: descriptor.instructions.clone(),
            ..Self::new(descriptor.resolve(registry)?, responder)
        })
    }

    pub fn with_max_questions(mut self, n: usize) -> Self {
        self.max_questions = n;
        self
    }
}

#[async_trait]
impl Stage for LlmClarifier {
    fn kind(&self) -> StageKind {
        StageKind::Clarifier
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(
        &self,
        ctx: &PipelineContext,
        cancel: &CancellationToken,
    ) -> Result<StageOutput, StageError> {
        let input = format!("Research query: {}", ctx.query);
        let raw = ask(self.llm.as_ref(), &self.name, &self.instructions, input, cancel).await?;
        let reply: ClarifierReply = parse_json(&self.name, &raw)?;
        let questions: Vec<String> = reply
            .questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(self.max_questions)
            .collect();
        if questions.is_empty() {
            return Ok(StageOutput::Clarification(Clarification::skipped()));
        }
        let answers = self.responder.answer(&ctx.query, &questions).await?;
        let items = questions
            .into_iter()
            .zip(answers.into_iter().chain(std::iter::repeat(DEFAULT_ANSWER.to_string())))
            .map(|(question, answer)| QuestionAnswer { question, answer })
            .collect();
        Ok(StageOutput::Clarification(Clarification { items }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::pipeline::config::PipelineConfig;

    fn ctx() -> PipelineContext {
        PipelineContext::new(
            Query::new("How does remote work affect urban housing?").unwrap(),
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn questions_are_paired_with_answers() {
        let llm = Arc::new(MockLlm::new(
            r#"{"questions": ["Which countries?", "Which years?"]}"#,
        ));
        let stage = LlmClarifier::new(llm, Arc::new(StaticAnswers(vec!["US".into()])));
        let out = stage.produce(&ctx(), &CancellationToken::new()).await.unwrap();
        let StageOutput::Clarification(c) = out else {
            panic!("expected clarification");
        };
        assert_eq!(c.items.len(), 2);
        assert_eq!(c.items[0].answer, "US");
        assert_eq!(c.items[1].answer, DEFAULT_ANSWER);
    }

    #[tokio::test]
    async fn no_questions_skips_the_responder() {
        let llm = Arc::new(MockLlm::new(r#"{"questions": []}"#));
        let stage = LlmClarifier::new(llm, Arc::new(StaticAnswers::default()));
        let out = stage.produce(&ctx(), &CancellationToken::new()).await.unwrap();
        assert!(matches!(out, StageOutput::Clarification(c) if c.is_empty()));
    }

    #[tokio::test]
    async fn skip_clarification_makes_no_model_call() {
        let out = SkipClarification
            .produce(&ctx(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.kind(), StageKind::Clarifier);
    }
}
