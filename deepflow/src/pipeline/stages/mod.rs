//! Concrete stages.
//!
//! The LLM-backed stages share two helpers: [`ask`] sends instructions plus the
//! rendered context and races the call against cancellation, and [`parse_json`]
//! reads the reply as one JSON object, tolerating a markdown code fence.

mod clarifier;
mod evaluator;
mod executor;
mod planner;
mod writer;

pub use clarifier::{ClarificationResponder, LlmClarifier, SkipClarification, StaticAnswers};
pub use evaluator::{LlmEvaluator, RuleEvaluator};
pub use executor::{extract_sources, ToolExecutor};
pub use planner::LlmPlanner;
pub use writer::LlmWriter;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::llm::LlmClient;
use crate::message::Message;

use super::error::{StageError, StageErrorCause};

pub(crate) async fn ask(
    llm: &dyn LlmClient,
    stage: &str,
    instructions: &str,
    input: String,
    cancel: &CancellationToken,
) -> Result<String, StageError> {
    let messages = [Message::system(instructions), Message::user(input)];
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StageError::new(stage, StageErrorCause::Cancelled)),
        r = llm.invoke(&messages) => r
            .map(|resp| resp.content)
            .map_err(|e| StageError::llm(stage, e)),
    }
}

/// Strips one surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

pub(crate) fn parse_json<T: DeserializeOwned>(stage: &str, text: &str) -> Result<T, StageError> {
    serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        tracing::debug!(stage, error = %e, raw = text, "unparsable model output");
        StageError::new(stage, StageErrorCause::Parse(e.to_string()))
    })
}
