//! LLM client abstraction used by the model-backed stages.
//!
//! Clarifier, planner, writer, evaluator (and optionally the executor's
//! summarizer) each hold an `Arc<dyn LlmClient>`. Clients are resolved by
//! provider name through [`LlmRegistry`].

mod mock;
mod openai;
mod registry;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;
pub use registry::LlmRegistry;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::message::Message;

/// Token usage for one LLM call (prompt + completion).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from an LLM completion: assistant message text.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    /// Assistant message content (plain text; stages expect JSON).
    pub content: String,
    /// Token usage for this call, when the provider reports it.
    pub usage: Option<LlmUsage>,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }
}

/// LLM client: given messages, returns assistant text.
///
/// Implementations: `MockLlm` (scripted responses), `ChatOpenAI` (real API).
/// Failures are reported as `AgentError::ExecutionFailed`; stages wrap them into
/// `StageErrorCause::Llm`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Invoke one turn: read messages, return assistant content.
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubLlm {
        content: String,
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn invoke(&self, _messages: &[Message]) -> Result<LlmResponse, AgentError> {
            Ok(LlmResponse::text(self.content.clone()))
        }
    }

    #[tokio::test]
    async fn trait_object_invoke_returns_content() {
        let llm: std::sync::Arc<dyn LlmClient> = std::sync::Arc::new(StubLlm {
            content: "hello".to_string(),
        });
        let resp = llm.invoke(&[Message::user("hi")]).await.unwrap();
        assert_eq!(resp.content, "hello");
        assert!(resp.usage.is_none());
    }
}
