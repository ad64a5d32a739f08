//! Minimal state-graph engine: nodes, explicit and conditional edges, a run loop
//! with cancellation and middleware.
//!
//! Build a [`StateGraph`], then [`StateGraph::compile`] into a
//! [`CompiledStateGraph`] and call [`CompiledStateGraph::invoke`].

mod compile_error;
mod compiled;
mod conditional;
mod logging;
mod logging_middleware;
mod next;
mod node;
mod node_middleware;
mod run_context;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
pub use logging_middleware::LoggingNodeMiddleware;
pub use next::Next;
pub use node::Node;
pub use node_middleware::{NodeInner, NodeMiddleware};
pub use run_context::RunContext;
pub use state_graph::{StateGraph, END, START};
