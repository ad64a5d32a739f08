//! Plain HTTP fetch and POST, exposed as the `web_fetcher` tool.

use async_trait::async_trait;
use serde_json::json;

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

/// Tool name for the web fetcher operation.
pub const TOOL_WEB_FETCHER: &str = "web_fetcher";

/// HTTP GET or POST to a URL.
///
/// [`ToolPublisher::webhook`](crate::pipeline::ToolPublisher::webhook) POSTs
/// finished reports through it.
///
/// Arguments: required `url`; optional `method` (GET|POST), `body` (string or
/// JSON), `headers` (object of strings).
pub struct WebFetcherTool {
    client: reqwest::Client,
}

impl Default for WebFetcherTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebFetcherTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Uses a preconfigured client (proxies, default headers).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebFetcherTool {
    fn name(&self) -> &str {
        TOOL_WEB_FETCHER
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_WEB_FETCHER.to_string(),
            description: Some(
                "Fetch or send content to a URL (GET by default, POST with a body). \
                 Returns the response body as text."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "HTTP/HTTPS URL." },
                    "method": { "type": "string", "enum": ["GET", "POST"] },
                    "body": { "description": "String (text/plain) or JSON object (application/json)." },
                    "headers": { "type": "object", "additionalProperties": { "type": "string" } }
                },
                "required": ["url"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<ToolCallContent, ToolSourceError> {
        let url = args
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing url".to_string()))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ToolSourceError::InvalidInput(format!(
                "not an http(s) url: {}",
                url
            )));
        }

        let method = args
            .get("method")
            .and_then(|v| v.as_str())
            .unwrap_or("GET")
            .to_uppercase();
        let mut request = match method.as_str() {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            other => {
                return Err(ToolSourceError::InvalidInput(format!(
                    "unsupported method: {} (use GET or POST)",
                    other
                )))
            }
        };

        if let Some(h) = args.get("headers").and_then(|v| v.as_object()) {
            for (k, v) in h {
                if let Some(v_str) = v.as_str() {
                    request = request.header(k.as_str(), v_str);
                }
            }
        }

        if method == "POST" {
            match args.get("body") {
                Some(serde_json::Value::String(s)) => {
                    request = request
                        .body(s.clone())
                        .header("Content-Type", "text/plain; charset=utf-8");
                }
                Some(serde_json::Value::Null) | None => {}
                Some(body) => request = request.json(body),
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(ToolSourceError::Transport(format!(
                "request failed with status: {}",
                response.status()
            )));
        }
        let text = response
            .text()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("failed to read response: {}", e)))?;
        Ok(ToolCallContent { text })
    }
}
