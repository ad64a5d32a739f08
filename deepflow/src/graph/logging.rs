//! Structured logging for graph execution: node start/complete, routing, graph
//! start/complete/error.

use std::fmt::Debug;

pub fn log_node_start(node_id: &str) {
    tracing::debug!(node_id = node_id, "Starting node execution");
}

/// Logs the input state of a node at trace level (contexts can be large).
pub fn log_node_state<S: Debug>(node_id: &str, state: &S) {
    tracing::trace!(node_id = node_id, state = ?state, "Node execution: state");
}

pub fn log_node_complete(node_id: &str, next: &crate::graph::Next) {
    tracing::debug!(node_id = node_id, ?next, "Node execution complete");
}

pub fn log_routing(from: &str, to: &str) {
    tracing::debug!(from = from, to = to, "conditional routing");
}

pub fn log_graph_start(run_id: &str) {
    tracing::info!(run_id = run_id, "Starting graph execution");
}

pub fn log_graph_complete(run_id: &str) {
    tracing::info!(run_id = run_id, "Graph execution complete");
}

pub fn log_graph_error(run_id: &str, error: &crate::error::AgentError) {
    tracing::error!(run_id = run_id, %error, "Graph execution error");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_functions() {
        log_node_start("test_node");
        log_node_state("test_node", &());
        log_node_complete("test_node", &crate::graph::Next::End);
        log_routing("a", "b");
        log_graph_start("run");
        log_graph_complete("run");
        log_graph_error(
            "run",
            &crate::error::AgentError::ExecutionFailed("test".to_string()),
        );
    }
}
