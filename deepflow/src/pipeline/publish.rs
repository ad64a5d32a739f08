//! Delivery of the final draft to an external sink.
//!
//! The orchestrator calls a [`Publisher`] at most once per run, only when the
//! acceptance rule allows it and never after cancellation.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::tools::TOOL_WEB_FETCHER;

use super::context::Draft;
use super::error::{ToolError, ToolErrorCause};
use super::invoker::ToolInvoker;

/// Where a report goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Destination {
    /// A directory; the report is written as `<dir>/<timestamp>-<slug>.md`.
    Directory(PathBuf),
    /// An HTTP endpoint receiving the draft as JSON.
    Webhook(String),
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Directory(p) => write!(f, "{}", p.display()),
            Destination::Webhook(url) => f.write_str(url),
        }
    }
}

/// Confirmation of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    /// File path or URL the report was delivered to.
    pub location: String,
    /// Sink-specific detail (response body, bytes written).
    pub detail: Option<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Name used for the tool-error attribution and logs.
    fn name(&self) -> &str;

    async fn publish(
        &self,
        draft: &Draft,
        destination: &Destination,
        cancel: &CancellationToken,
    ) -> Result<DeliveryReceipt, ToolError>;
}

fn wrong_destination(publisher: &str, destination: &Destination) -> ToolError {
    ToolError::new(
        publisher,
        ToolErrorCause::InvalidInput(format!("unsupported destination: {destination}")),
    )
}

/// Writes the report as markdown into a directory.
#[derive(Debug, Default, Clone)]
pub struct FilePublisher;

impl FilePublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Publisher for FilePublisher {
    fn name(&self) -> &str {
        "file"
    }

    async fn publish(
        &self,
        draft: &Draft,
        destination: &Destination,
        cancel: &CancellationToken,
    ) -> Result<DeliveryReceipt, ToolError> {
        let Destination::Directory(dir) = destination else {
            return Err(wrong_destination(self.name(), destination));
        };
        if cancel.is_cancelled() {
            return Err(ToolError::new(self.name(), ToolErrorCause::Cancelled));
        }
        let io_err = |e: std::io::Error| {
            ToolError::new("file", ToolErrorCause::Transport(format!("{}: {}", dir.display(), e)))
        };
        tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("{}-{}.md", stamp, draft.slug()));
        let body = draft.to_markdown();
        tokio::fs::write(&path, &body).await.map_err(io_err)?;
        tracing::info!(path = %path.display(), bytes = body.len(), "report written");
        Ok(DeliveryReceipt {
            location: path.display().to_string(),
            detail: Some(format!("{} bytes", body.len())),
        })
    }
}

/// Delivers through a named tool via [`ToolInvoker`], so the call gets the same
/// timeout, cancellation and error mapping as every other tool call.
pub struct ToolPublisher {
    invoker: ToolInvoker,
    tool_name: String,
}

impl ToolPublisher {
    pub fn new(invoker: ToolInvoker, tool_name: impl Into<String>) -> Self {
        Self {
            invoker,
            tool_name: tool_name.into(),
        }
    }

    /// POSTs the draft as JSON through the `web_fetcher` tool.
    pub fn webhook(invoker: ToolInvoker) -> Self {
        Self::new(invoker, TOOL_WEB_FETCHER)
    }

    fn arguments(draft: &Draft, url: &str) -> serde_json::Value {
        json!({
            "url": url,
            "method": "POST",
            "body": {
                "short_summary": draft.short_summary,
                "markdown_report": draft.markdown_report,
                "follow_up_questions": draft.follow_up_questions,
                "revision": draft.revision,
            }
        })
    }
}

#[async_trait]
impl Publisher for ToolPublisher {
    fn name(&self) -> &str {
        &self.tool_name
    }

    async fn publish(
        &self,
        draft: &Draft,
        destination: &Destination,
        cancel: &CancellationToken,
    ) -> Result<DeliveryReceipt, ToolError> {
        let Destination::Webhook(url) = destination else {
            return Err(wrong_destination(self.name(), destination));
        };
        let content = self
            .invoker
            .invoke(&self.tool_name, Self::arguments(draft, url), cancel)
            .await?;
        tracing::info!(url = %url, "report delivered");
        Ok(DeliveryReceipt {
            location: url.clone(),
            detail: (!content.text.is_empty()).then_some(content.text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_source::{MockToolSource, ToolSourceError};
    use std::sync::Arc;
    use std::time::Duration;

    fn draft() -> Draft {
        Draft {
            short_summary: "Remote work shifted demand".into(),
            markdown_report: "# Remote work and housing\n\nBody.".into(),
            follow_up_questions: vec!["What about rents?".into()],
            revision: 1,
        }
    }

    #[tokio::test]
    async fn file_publisher_writes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let receipt = FilePublisher::new()
            .publish(&draft(), &Destination::Directory(out.clone()), &CancellationToken::new())
            .await
            .unwrap();
        assert!(receipt.location.ends_with("-remote-work-and-housing.md"), "{}", receipt.location);
        let written = std::fs::read_to_string(&receipt.location).unwrap();
        assert!(written.contains("# Remote work and housing"));
        assert!(written.contains("- What about rents?"));
        assert_eq!(std::fs::read_dir(out).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn file_publisher_rejects_webhook_and_cancelled_runs() {
        let publisher = FilePublisher::new();
        let err = publisher
            .publish(&draft(), &Destination::Webhook("https://x".into()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err.cause, ToolErrorCause::InvalidInput(_)));

        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = publisher
            .publish(&draft(), &Destination::Directory(dir.path().to_path_buf()), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn tool_publisher_posts_draft_json() {
        let source = MockToolSource::new().with_result(TOOL_WEB_FETCHER, "accepted");
        let invoker = ToolInvoker::new(Arc::new(source.clone()), Duration::from_secs(1));
        let receipt = ToolPublisher::webhook(invoker)
            .publish(
                &draft(),
                &Destination::Webhook("https://hooks.example/r".into()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(receipt.location, "https://hooks.example/r");
        assert_eq!(receipt.detail.as_deref(), Some("accepted"));

        let calls = source.calls();
        assert_eq!(calls.len(), 1);
        let (name, args) = &calls[0];
        assert_eq!(name, TOOL_WEB_FETCHER);
        assert_eq!(args["method"], "POST");
        assert_eq!(args["body"]["revision"], 1);
        assert_eq!(args["body"]["follow_up_questions"][0], "What about rents?");
    }

    #[tokio::test]
    async fn tool_publisher_surfaces_transport_failure() {
        let source = MockToolSource::new()
            .with_failure(TOOL_WEB_FETCHER, ToolSourceError::Transport("status 500".into()));
        let invoker = ToolInvoker::new(Arc::new(source), Duration::from_secs(1));
        let err = ToolPublisher::webhook(invoker)
            .publish(
                &draft(),
                &Destination::Webhook("https://hooks.example/r".into()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.tool_name, TOOL_WEB_FETCHER);
        assert!(matches!(err.cause, ToolErrorCause::Transport(_)));
    }
}
