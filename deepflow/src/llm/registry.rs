//! Explicit provider-name → client map.
//!
//! Stage descriptors name a provider (`"openai"`, `"mock"`, ...); the registry
//! turns that name into a client. Built by the caller and passed in, never global.

use std::collections::HashMap;
use std::sync::Arc;

use crate::llm::LlmClient;
use crate::pipeline::ConfigError;

#[derive(Clone, Default)]
pub struct LlmRegistry {
    clients: HashMap<String, Arc<dyn LlmClient>>,
}

impl LlmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `client` under `provider`, replacing any previous entry (builder).
    pub fn with(mut self, provider: impl Into<String>, client: Arc<dyn LlmClient>) -> Self {
        self.register(provider, client);
        self
    }

    pub fn register(&mut self, provider: impl Into<String>, client: Arc<dyn LlmClient>) {
        self.clients.insert(provider.into(), client);
    }

    /// Looks up a provider; unknown names are a configuration error.
    pub fn resolve(&self, provider: &str) -> Result<Arc<dyn LlmClient>, ConfigError> {
        self.clients
            .get(provider)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProvider(provider.to_string()))
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for LlmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
