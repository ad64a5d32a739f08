//! Mock LLM for tests and offline runs.
//!
//! Returns scripted responses in order (repeating the last one once the script
//! is exhausted), counts calls, and records every prompt it was given. Can be
//! made to fail or to sleep before answering.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Message;

/// Scripted mock LLM.
///
/// **Interaction**: Implements `LlmClient`; used by stage and pipeline tests.
pub struct MockLlm {
    script: Vec<String>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    recorded: Mutex<Vec<Vec<Message>>>,
}

impl MockLlm {
    /// Creates a mock that always answers `content`.
    pub fn new(content: impl Into<String>) -> Self {
        Self::scripted(vec![content.into()])
    }

    /// Creates a mock that answers each entry of `responses` in turn; after the
    /// last entry it keeps repeating it.
    pub fn scripted<I, T>(responses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            script: responses.into_iter().map(Into::into).collect(),
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::scripted(Vec::<String>::new())
        }
    }

    /// Sleep for `delay` before answering (builder).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `invoke` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages passed to each call, in call order.
    pub fn recorded(&self) -> Vec<Vec<Message>> {
        self.recorded
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.push(messages.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(AgentError::ExecutionFailed(message.clone()));
        }
        let content = self
            .script
            .get(n)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_default();
        Ok(LlmResponse::text(content))
    }
}
