//! Run context passed into nodes: run id, cancellation token, and an optional
//! progress-event sender.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::stream::PipelineEvent;

/// Per-run context handed to `Node::run_with_context`.
///
/// Cloning is cheap; the token and sender are shared handles.
#[derive(Clone, Debug)]
pub struct RunContext {
    /// Unique id for log correlation.
    pub run_id: String,
    /// Fired by the caller to abort the run.
    pub cancel: CancellationToken,
    /// Optional sender for progress events.
    pub events: Option<mpsc::Sender<PipelineEvent>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl RunContext {
    /// Creates a context with a fresh run id.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            cancel,
            events: None,
        }
    }

    pub fn with_events(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sends a progress event. A closed or full channel is ignored so that a
    /// slow or dropped receiver never fails the run.
    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            if let Err(e) = tx.try_send(event) {
                tracing::trace!(error = %e, "progress event dropped");
            }
        }
    }
}
