//! Planner: turns the query and clarification into an ordered list of searches.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmClient, LlmRegistry};
use crate::pipeline::context::{PipelineContext, Plan, SubTask};
use crate::pipeline::error::{ConfigError, StageError};
use crate::pipeline::format::render_clarification;
use crate::pipeline::prompts;
use crate::pipeline::stage::{Stage, StageDescriptor, StageKind, StageOutput};

use super::{ask, parse_json};

#[derive(Deserialize)]
struct PlannedSearch {
    #[serde(default)]
    reason: String,
    query: String,
}

#[derive(Deserialize)]
struct PlannerReply {
    searches: Vec<PlannedSearch>,
}

/// Asks for exactly `num_subtasks` searches; extras are dropped, and an empty
/// list fails the stage with `EmptyPlan`.
pub struct LlmPlanner {
    name: String,
    llm: Arc<dyn LlmClient>,
    instructions: String,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: StageKind::Planner.name().to_string(),
            llm,
            instructions: prompts::PLANNER.to_string(),
        }
    }

    pub fn from_descriptor(
        descriptor: &StageDescriptor,
        registry: &LlmRegistry,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            name: descriptor.name.clone(),
            llm: descriptor.resolve(registry)?,
            instructions: descriptor.instructions.clone(),
        })
    }
}

#[async_trait]
impl Stage for LlmPlanner {
    fn kind(&self) -> StageKind {
        StageKind::Planner
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(
        &self,
        ctx: &PipelineContext,
        cancel: &CancellationToken,
    ) -> Result<StageOutput, StageError> {
        let n = ctx.config.num_subtasks;
        let input = format!(
            "Research query: {}\n\nClarifications:\n{}\n\nProduce exactly {} searches.",
            ctx.query,
            render_clarification(ctx.clarification.as_ref()),
            n
        );
        let raw = ask(self.llm.as_ref(), &self.name, &self.instructions, input, cancel).await?;
        let reply: PlannerReply = parse_json(&self.name, &raw)?;
        let returned = reply.searches.len();
        let items: Vec<SubTask> = reply
            .searches
            .into_iter()
            .filter(|s| !s.query.trim().is_empty())
            .take(n)
            .map(|s| SubTask {
                rationale: s.reason.trim().to_string(),
                directive: s.query.trim().to_string(),
            })
            .collect();
        if returned > n {
            tracing::debug!(stage = %self.name, returned, kept = n, "plan truncated");
        }
        let plan = Plan::new(items).map_err(|cause| StageError::new(self.name.as_str(), cause))?;
        tracing::info!(stage = %self.name, subtasks = plan.len(), "plan ready");
        Ok(StageOutput::Plan(plan))
    }
}
