//! Tool invocation adapter.
//!
//! Every tool call made by a stage or publisher goes through [`ToolInvoker`],
//! which bounds it by a timeout, races it against the run's cancellation token,
//! and turns every failure into a categorised [`ToolError`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::tool_source::{ToolCallContent, ToolSource};

use super::error::{ToolError, ToolErrorCause};

/// Uniform `invoke(tool_name, args)` over a [`ToolSource`].
#[derive(Clone)]
pub struct ToolInvoker {
    source: Arc<dyn ToolSource>,
    default_timeout: Duration,
    timeouts: HashMap<String, Duration>,
}

impl ToolInvoker {
    pub fn new(source: Arc<dyn ToolSource>, default_timeout: Duration) -> Self {
        Self {
            source,
            default_timeout,
            timeouts: HashMap::new(),
        }
    }

    /// Overrides the timeout for one tool (builder).
    pub fn with_timeout_for(mut self, tool_name: impl Into<String>, timeout: Duration) -> Self {
        self.timeouts.insert(tool_name.into(), timeout);
        self
    }

    pub fn timeout_for(&self, tool_name: &str) -> Duration {
        self.timeouts
            .get(tool_name)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    pub fn source(&self) -> &Arc<dyn ToolSource> {
        &self.source
    }

    /// Calls `tool_name` with `args`.
    ///
    /// Returns `ToolErrorCause::Cancelled` without calling the tool when `cancel`
    /// has already fired, and abandons an in-flight call as soon as it fires.
    pub async fn invoke(
        &self,
        tool_name: &str,
        args: Value,
        cancel: &CancellationToken,
    ) -> Result<ToolCallContent, ToolError> {
        if cancel.is_cancelled() {
            return Err(ToolError::new(tool_name, ToolErrorCause::Cancelled));
        }
        let timeout = self.timeout_for(tool_name);
        let started = Instant::now();
        tracing::debug!(tool = tool_name, ?timeout, "tool call");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ToolError::new(tool_name, ToolErrorCause::Cancelled)),
            r = tokio::time::timeout(timeout, self.source.call_tool(tool_name, args)) => match r {
                Ok(Ok(content)) => Ok(content),
                Ok(Err(e)) => Err(ToolError::from_source(tool_name, e)),
                Err(_) => Err(ToolError::new(tool_name, ToolErrorCause::Timeout(timeout))),
            },
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(content) => {
                tracing::debug!(tool = tool_name, elapsed_ms, bytes = content.text.len(), "tool call ok")
            }
            Err(e) => tracing::debug!(tool = tool_name, elapsed_ms, error = %e, "tool call failed"),
        }
        result
    }
}
