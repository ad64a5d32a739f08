//! Data carried through one pipeline run.
//!
//! [`PipelineContext`] is created by the orchestrator at run start, threaded
//! through every stage node, and dropped when the run ends. Stages read it;
//! only the orchestrator's nodes write to it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::PipelineConfig;
use super::error::{ConfigError, StageErrorCause, ToolError};
use super::feedback::{FeedbackLoop, LoopState};
use super::publish::DeliveryReceipt;

/// The user's research question. Trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query(String);

impl Query {
    pub fn new(text: impl AsRef<str>) -> Result<Self, ConfigError> {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyQuery);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

/// Answers to the clarifier's questions; empty when clarification was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clarification {
    pub items: Vec<QuestionAnswer>,
}

impl Clarification {
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One unit of planned work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    /// Why this sub-task helps answer the query.
    pub rationale: String,
    /// What to execute (a search term for the default executor).
    pub directive: String,
}

/// Ordered, non-empty list of sub-tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    items: Vec<SubTask>,
}

impl Plan {
    /// Builds a plan; an empty list is rejected.
    pub fn new(items: Vec<SubTask>) -> Result<Self, StageErrorCause> {
        if items.is_empty() {
            return Err(StageErrorCause::EmptyPlan);
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[SubTask] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a constructed plan.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubTaskOutcome {
    Completed {
        summary: String,
        /// Source references (URLs) backing the summary.
        sources: Vec<String>,
    },
    /// The tool call failed; kept so the writer can annotate the gap.
    Failed {
        #[serde(serialize_with = "serialize_display")]
        error: ToolError,
    },
}

fn serialize_display<S: serde::Serializer>(err: &ToolError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Result of one sub-task, tagged with its position in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubTaskResult {
    pub index: usize,
    pub directive: String,
    pub outcome: SubTaskOutcome,
}

impl SubTaskResult {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, SubTaskOutcome::Completed { .. })
    }

    pub fn sources(&self) -> &[String] {
        match &self.outcome {
            SubTaskOutcome::Completed { sources, .. } => sources,
            SubTaskOutcome::Failed { .. } => &[],
        }
    }
}

/// The writer's report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub short_summary: String,
    pub markdown_report: String,
    pub follow_up_questions: Vec<String>,
    /// Loop index that produced this draft (0 = first attempt).
    #[serde(default)]
    pub revision: u32,
}

impl Draft {
    /// Full report as one markdown document.
    pub fn to_markdown(&self) -> String {
        let mut out = self.markdown_report.trim_end().to_string();
        if !self.follow_up_questions.is_empty() {
            out.push_str("\n\n## Follow-up questions\n\n");
            for q in &self.follow_up_questions {
                out.push_str(&format!("- {}\n", q));
            }
        } else {
            out.push('\n');
        }
        out
    }

    /// File-name friendly title: first markdown heading, else the summary.
    pub fn slug(&self) -> String {
        let title = self
            .markdown_report
            .lines()
            .find_map(|l| l.trim().strip_prefix('#'))
            .map(|l| l.trim_start_matches('#').trim())
            .filter(|t| !t.is_empty())
            .unwrap_or(self.short_summary.as_str());
        let mut slug = String::new();
        for c in title.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_alphanumeric() {
                slug.push(c);
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
            if slug.len() >= 60 {
                break;
            }
        }
        let slug = slug.trim_end_matches('-').to_string();
        if slug.is_empty() {
            "report".to_string()
        } else {
            slug
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accept,
    Reject,
}

/// The evaluator's judgement of the current draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub feedback: String,
}

impl Evaluation {
    pub fn accept(feedback: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Accept,
            feedback: feedback.into(),
        }
    }

    pub fn reject(feedback: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Reject,
            feedback: feedback.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accept
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The evaluator accepted the final draft.
    Accepted,
    /// No evaluator was configured.
    Unevaluated,
    /// Retries ran out while still rejected; returned under `ExhaustedPolicy::Accept`.
    Exhausted,
}

/// Accumulating state of one run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub query: Query,
    pub config: PipelineConfig,
    pub clarification: Option<Clarification>,
    pub plan: Option<Plan>,
    /// Sub-task results in plan order.
    pub results: Vec<SubTaskResult>,
    pub draft: Option<Draft>,
    /// Latest evaluation; replaced on every evaluator call.
    pub evaluation: Option<Evaluation>,
    /// Evaluator loop state, retry counter and feedback history.
    pub feedback: FeedbackLoop,
    /// Number of writer invocations so far.
    pub writer_calls: u32,
    pub delivery: Option<DeliveryReceipt>,
}

impl PipelineContext {
    pub fn new(query: Query, config: PipelineConfig) -> Self {
        let feedback = FeedbackLoop::new(config.max_retries);
        Self {
            query,
            config,
            clarification: None,
            plan: None,
            results: Vec::new(),
            draft: None,
            evaluation: None,
            feedback,
            writer_calls: 0,
            delivery: None,
        }
    }

    pub fn loop_state(&self) -> LoopState {
        self.feedback.state()
    }

    /// Feedback from earlier rejections, oldest first.
    pub fn feedback_history(&self) -> &[String] {
        self.feedback.history()
    }
}
