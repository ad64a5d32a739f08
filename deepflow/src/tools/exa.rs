//! Web search via the Exa API, exposed as the `web_search` tool.

use async_trait::async_trait;
use serde_json::json;

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

/// Tool name the executor calls by default.
pub const TOOL_WEB_SEARCH: &str = "web_search";

const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";
const NUM_RESULTS_MAX: u64 = 25;
const DEFAULT_NUM_RESULTS: u64 = 5;
const TEXT_MAX_CHARS: usize = 1500;

/// Web search via Exa (real-time web search).
///
/// Output lists one block per hit with its title, `URL:` line and an excerpt;
/// the executor extracts the URLs as provenance.
pub struct ExaWebsearchTool {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl ExaWebsearchTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: EXA_SEARCH_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the search endpoint (proxies, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn search(&self, body: serde_json::Value) -> Result<serde_json::Value, ToolSourceError> {
        let res = self
            .client
            .post(self.endpoint.as_str())
            .header("x-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let err_body = res.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!(
                "Exa API error {}: {}",
                status, err_body
            )));
        }
        res.json()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.trim().replace('\n', " ");
    if flat.chars().count() > max_chars {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

pub(crate) fn format_results(value: &serde_json::Value) -> String {
    let results: &[serde_json::Value] = value
        .get("results")
        .and_then(|r| r.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[]);
    let mut s = String::new();
    for (i, r) in results.iter().enumerate() {
        let title = r.get("title").and_then(|t| t.as_str()).unwrap_or("(no title)");
        let url = r.get("url").and_then(|u| u.as_str()).unwrap_or("");
        s.push_str(&format!("[{}] {}\n  URL: {}\n", i + 1, title, url));

        let highlights: Vec<&str> = r
            .get("highlights")
            .and_then(|h| h.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if !highlights.is_empty() {
            for line in highlights {
                if !line.trim().is_empty() {
                    s.push_str(&format!("  - {}\n", excerpt(line, TEXT_MAX_CHARS)));
                }
            }
        } else if let Some(text) = r.get("text").and_then(|t| t.as_str()) {
            if !text.trim().is_empty() {
                s.push_str(&format!("  {}\n", excerpt(text, TEXT_MAX_CHARS)));
            }
        }
        s.push('\n');
    }
    if s.is_empty() {
        s = "No results.".to_string();
    }
    s
}

#[async_trait]
impl Tool for ExaWebsearchTool {
    fn name(&self) -> &str {
        TOOL_WEB_SEARCH
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_WEB_SEARCH.to_string(),
            description: Some(
                "Search the web using Exa. Returns titles, URLs and excerpts for the top hits."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query." },
                    "numResults": { "type": "integer", "description": "Max results (1-25, default 5).", "default": 5 }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<ToolCallContent, ToolSourceError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing query".to_string()))?;
        let num_results = args
            .get("numResults")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_NUM_RESULTS)
            .clamp(1, NUM_RESULTS_MAX);
        let body = json!({
            "query": query,
            "numResults": num_results,
            "type": "auto",
            "contents": {
                "text": { "maxCharacters": TEXT_MAX_CHARS * 2 },
                "highlights": { "maxCharacters": TEXT_MAX_CHARS }
            }
        });
        tracing::debug!(query, num_results, "exa search");
        let out = self.search(body).await?;
        Ok(ToolCallContent {
            text: format_results(&out),
        })
    }
}
