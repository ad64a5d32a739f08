use async_trait::async_trait;

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};

/// A single callable tool: name, argument schema and call logic.
///
/// # Interaction
///
/// - **ToolRegistry**: stores tools by name and implements `ToolSource` over them
/// - **ToolInvoker**: calls through the registry with timeout and cancellation
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name within a registry; used to route calls.
    fn name(&self) -> &str;

    /// Description and JSON schema for the arguments.
    fn spec(&self) -> ToolSpec;

    /// Executes the tool with JSON arguments.
    async fn call(&self, args: serde_json::Value) -> Result<ToolCallContent, ToolSourceError>;
}
