//! The built-in chat turn graph.
//!
//! One turn walks SELECT → CONTEXT → SOLVE and lands on one of WRITE, PATCH,
//! or ANSWER depending on what the solve stage put into the Context. Stage
//! bindings are supplied by the embedding application; only the condition
//! predicates are defined here, keyed to the turn's well-known Context keys.

use super::context::Context;
use super::model::{Edge, Node, WorkflowGraph};
use super::registry::Registry;

/// Name of the built-in chat graph.
pub const CHAT_DEFAULT: &str = "chat_default";

/// Build the default chat turn graph.
///
/// SELECT picks relevant files (or asks for clarification), CONTEXT gathers
/// their content, SOLVE produces one of three turn shapes, and the matching
/// terminal node consumes it.
pub fn chat_default() -> WorkflowGraph {
    let nodes = vec![
        Node::with_stage("SELECT", "select"),
        Node::with_stage("CONTEXT", "context"),
        Node::with_stage("SOLVE", "solve"),
        Node::with_stage("WRITE", "write"),
        Node::with_stage("PATCH", "patch"),
        Node::with_stage("ANSWER", "answer"),
    ];
    let edges = vec![
        Edge::when("SELECT", "CONTEXT", "select"),
        // Clarification turn: nothing selected, answer directly.
        Edge::new("SELECT", "ANSWER"),
        Edge::new("CONTEXT", "SOLVE"),
        Edge::when("SOLVE", "WRITE", "write"),
        Edge::when("SOLVE", "PATCH", "patch"),
        Edge::new("SOLVE", "ANSWER"),
    ];
    WorkflowGraph::new(CHAT_DEFAULT, nodes, edges, "SELECT")
        .expect("built-in graph is a valid DAG")
}

/// Register the chat graph's named edge predicates: each checks for the
/// Context key the corresponding turn shape carries.
pub fn register_conditions(registry: &mut Registry) {
    registry.register_condition("select", |ctx: &Context| ctx.contains("paths"));
    registry.register_condition("write", |ctx: &Context| ctx.contains("writes"));
    registry.register_condition("patch", |ctx: &Context| ctx.contains("patches"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::cycle::detect_cycle;
    use crate::graph::executor::{GraphExecutor, StepOutcome};
    use serde_json::json;

    fn noop_stages(registry: &mut Registry) {
        for name in ["select", "context", "solve", "write", "patch", "answer"] {
            registry.register_stage(name, Ok);
        }
    }

    #[test]
    fn chat_default_is_a_dag() {
        let graph = chat_default();
        assert!(!detect_cycle(&graph));
        assert_eq!(graph.start(), "SELECT");
        assert_eq!(graph.node_count(), 6);
    }

    #[test]
    fn select_condition_routes_into_context() {
        let mut registry = Registry::new();
        register_conditions(&mut registry);
        noop_stages(&mut registry);

        let graph = chat_default();
        let mut ctx = Context::new();
        ctx.set("paths", json!(["src/lib.rs"]));
        let mut exec = GraphExecutor::new(&graph, registry, ctx);

        assert_eq!(
            exec.step().unwrap(),
            StepOutcome::Advanced {
                from: "SELECT".into(),
                to: "CONTEXT".into()
            }
        );
    }

    #[test]
    fn patch_turns_terminate_at_patch_without_revisits() {
        let mut registry = Registry::new();
        register_conditions(&mut registry);
        noop_stages(&mut registry);
        // The solve stage hands back patches, steering the turn to PATCH.
        registry.register_stage("solve", |mut ctx: Context| {
            ctx.set("patches", json!([]));
            Ok(ctx)
        });

        let graph = chat_default();
        let mut ctx = Context::new();
        ctx.set("paths", json!(["a.txt"]));
        let mut exec = GraphExecutor::new(&graph, registry, ctx);
        exec.run().unwrap();

        let history = &exec.state().history;
        assert_eq!(history, &vec!["SELECT", "CONTEXT", "SOLVE", "PATCH"]);
        let mut unique = history.clone();
        unique.dedup();
        assert_eq!(&unique, history, "no node is ever revisited");
    }

    #[test]
    fn clarification_turns_fall_back_to_answer() {
        let mut registry = Registry::new();
        register_conditions(&mut registry);
        noop_stages(&mut registry);

        let graph = chat_default();
        let mut exec = GraphExecutor::new(&graph, registry, Context::new());
        exec.run().unwrap();
        assert_eq!(exec.state().current, "ANSWER");
    }
}
