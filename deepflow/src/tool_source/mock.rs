//! In-memory tool source for tests.
//!
//! Each tool name maps to a handler `(args) -> Result<text, ToolSourceError>`.
//! Optional per-call latency lets tests shuffle completion order; every call is
//! recorded so tests can assert what was (or was not) invoked.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

type Handler = Arc<dyn Fn(&Value) -> Result<String, ToolSourceError> + Send + Sync>;
type LatencyFn = Arc<dyn Fn(&str, &Value) -> Duration + Send + Sync>;

/// Mock tool source with per-tool canned behaviour.
#[derive(Clone, Default)]
pub struct MockToolSource {
    handlers: HashMap<String, Handler>,
    latency: Option<LatencyFn>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockToolSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// `name` always returns `text`.
    pub fn with_result(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        self.with_handler(name, move |_| Ok(text.clone()))
    }

    /// `name` always fails with `error`.
    pub fn with_failure(self, name: impl Into<String>, error: ToolSourceError) -> Self {
        self.with_handler(name, move |_| Err(error.clone()))
    }

    /// `name` computes its answer from the arguments.
    pub fn with_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<String, ToolSourceError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Every call sleeps for `latency(name, args)` before answering.
    pub fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&str, &Value) -> Duration + Send + Sync + 'static,
    {
        self.latency = Some(Arc::new(latency));
        self
    }

    /// All calls so far as `(tool name, arguments)`, in arrival order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|(n, _)| n == name).count()
    }
}

#[async_trait]
impl ToolSource for MockToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| ToolSpec {
                name: name.clone(),
                description: Some("mock tool".to_string()),
                input_schema: json!({ "type": "object" }),
            })
            .collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((name.to_string(), arguments.clone()));
        }
        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(name, &arguments)).await;
        }
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ToolSourceError::NotFound(name.to_string()))?;
        handler(&arguments).map(|text| ToolCallContent { text })
    }
}
