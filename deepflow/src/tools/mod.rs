//! Concrete tools and the registry that exposes them as a [`ToolSource`](crate::tool_source::ToolSource).

mod exa;
mod registry;
mod r#trait;
mod web;

pub use exa::{ExaWebsearchTool, TOOL_WEB_SEARCH};
pub use r#trait::Tool;
pub use registry::ToolRegistry;
pub use web::{WebFetcherTool, TOOL_WEB_FETCHER};
