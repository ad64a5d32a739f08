//! Compiled state graph: immutable, supports invoke only.
//!
//! Built by `StateGraph::compile`. Holds nodes, the routing table derived from
//! explicit and conditional edges, and optional node middleware.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AgentError;

use super::logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
    log_node_state, log_routing,
};
use super::node_middleware::NodeMiddleware;
use super::state_graph::END;
use super::{Next, NextEntry, Node, RunContext};

/// Compiled graph: immutable structure, supports invoke only.
///
/// Runs from the START node; after each node, uses the conditional router (when
/// present) or the node's returned `Next` to choose the next node.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) first_node_id: String,
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) middleware: Option<Arc<dyn NodeMiddleware<S>>>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    async fn execute_node(
        &self,
        node: Arc<dyn Node<S>>,
        state: S,
        ctx: &RunContext,
    ) -> Result<(S, Next), AgentError> {
        match &self.middleware {
            Some(middleware) => {
                let node_id = node.id().to_string();
                let ctx = ctx.clone();
                middleware
                    .around_run(
                        &node_id,
                        state,
                        Box::new(move |s| {
                            Box::pin(async move { node.run_with_context(s, &ctx).await })
                        }),
                    )
                    .await
            }
            None => node.run_with_context(state, ctx).await,
        }
    }

    fn resolve_next(&self, current_id: &str, state: &S, next: Next) -> Option<String> {
        match self.next_map.get(current_id) {
            Some(NextEntry::Conditional(router)) => {
                let target = router.resolve_next(state);
                log_routing(current_id, &target);
                Some(target)
            }
            Some(NextEntry::Unconditional(to)) => match next {
                Next::End => None,
                Next::Node(id) => Some(id),
                Next::Continue => Some(to.clone()),
            },
            None => match next {
                Next::Node(id) => Some(id),
                Next::End | Next::Continue => None,
            },
        }
    }

    /// Runs the graph with the given state and context.
    ///
    /// The context's cancellation token is checked before every node; a fired
    /// token ends the run with `AgentError::Cancelled` without running the next node.
    pub async fn invoke(&self, state: S, ctx: &RunContext) -> Result<S, AgentError> {
        log_graph_start(&ctx.run_id);
        let mut state = state;
        let mut current_id = self.first_node_id.clone();

        loop {
            if ctx.is_cancelled() {
                let err = AgentError::Cancelled;
                log_graph_error(&ctx.run_id, &err);
                return Err(err);
            }
            let node = self.nodes.get(&current_id).cloned().ok_or_else(|| {
                AgentError::ExecutionFailed(format!("routed to unknown node: {current_id}"))
            })?;

            log_node_start(&current_id);
            log_node_state(&current_id, &state);

            let (new_state, next) = match self.execute_node(node, state, ctx).await {
                Ok(output) => output,
                Err(e) => {
                    log_graph_error(&ctx.run_id, &e);
                    return Err(e);
                }
            };
            log_node_complete(&current_id, &next);
            state = new_state;

            match self.resolve_next(&current_id, &state, next) {
                Some(id) if id != END => current_id = id,
                _ => {
                    log_graph_complete(&ctx.run_id);
                    return Ok(state);
                }
            }
        }
    }
}
