//! Progress events emitted while a pipeline runs.
//!
//! Attach a sender with `OrchestratorBuilder::events`; the CLI prints these to
//! stderr. Sending never blocks and never fails a run (see `RunContext::emit`).

use serde::Serialize;

use crate::pipeline::Verdict;

/// One progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A stage node started.
    StageStart { stage: String },
    /// A stage node finished; `ok` is false when it returned an error.
    StageEnd { stage: String, ok: bool },
    /// One executor sub-task finished; sent in plan order once the executor returns.
    SubTaskFinished { index: usize, ok: bool },
    /// The evaluator judged draft number `attempt` (1-based).
    Evaluated { attempt: u32, verdict: Verdict },
    /// The publisher delivered the report.
    Delivered { location: String },
}
