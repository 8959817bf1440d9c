//! End-to-end workflow test
//!
//! Drives a whole turn through the built-in chat graph: the solve stage
//! hands back patches, the PATCH node applies them to a real tree, and the
//! graph exchange format round-trips the wiring.

use std::fs;

use driftpatch::graph::{builtin, exchange, stages};
use driftpatch::{
    ApplyConfig, ApplyMode, Context, Edge, GraphExecutor, Node, Registry, WorkflowGraph,
};
use serde_json::json;
use tempfile::TempDir;

fn turn_registry(tree: &TempDir, mode: ApplyMode) -> Registry {
    let mut registry = Registry::new();
    builtin::register_conditions(&mut registry);

    registry.register_stage("select", |mut ctx: Context| {
        ctx.set("paths", json!(["src/a.txt"]));
        Ok(ctx)
    });
    registry.register_stage("context", |mut ctx: Context| {
        ctx.set("context_ready", true);
        Ok(ctx)
    });
    registry.register_stage("solve", |mut ctx: Context| {
        ctx.set(
            "patches",
            json!([{
                "path": "src/a.txt",
                "unified_diff": "@@ -1,2 +1,2 @@\n-one\n+ONE\n two\n",
            }]),
        );
        Ok(ctx)
    });
    registry.register_stage(
        "patch",
        stages::patch_apply_stage(tree.path(), mode, ApplyConfig::default()),
    );
    registry.register_stage("write", Ok);
    registry.register_stage("answer", Ok);
    registry
}

#[test]
fn chat_turn_applies_patches_through_the_graph() {
    let tree = TempDir::new().unwrap();
    fs::create_dir_all(tree.path().join("src")).unwrap();
    fs::write(tree.path().join("src/a.txt"), "one\ntwo\n").unwrap();

    let graph = builtin::chat_default();
    let registry = turn_registry(&tree, ApplyMode::Real);
    let mut exec = GraphExecutor::new(&graph, registry, Context::new());
    exec.run().unwrap();

    assert_eq!(
        exec.state().history,
        vec!["SELECT", "CONTEXT", "SOLVE", "PATCH"]
    );
    assert_eq!(
        fs::read_to_string(tree.path().join("src/a.txt")).unwrap(),
        "ONE\ntwo\n"
    );
    let summary = exec.context().get("patch_summary").unwrap();
    assert_eq!(summary["applied"], json!(1));
    assert_eq!(summary["clean"], json!(true));
}

#[test]
fn dry_run_turn_reports_without_mutating() {
    let tree = TempDir::new().unwrap();
    fs::create_dir_all(tree.path().join("src")).unwrap();
    fs::write(tree.path().join("src/a.txt"), "one\ntwo\n").unwrap();

    let graph = builtin::chat_default();
    let registry = turn_registry(&tree, ApplyMode::DryRun);
    let mut exec = GraphExecutor::new(&graph, registry, Context::new());
    exec.run().unwrap();

    assert_eq!(
        exec.context().get("patch_summary").unwrap()["applied"],
        json!(1)
    );
    assert_eq!(
        fs::read_to_string(tree.path().join("src/a.txt")).unwrap(),
        "one\ntwo\n"
    );
}

#[test]
fn exported_graphs_round_trip_and_still_execute() {
    let tree = TempDir::new().unwrap();
    fs::create_dir_all(tree.path().join("src")).unwrap();
    fs::write(tree.path().join("src/a.txt"), "one\ntwo\n").unwrap();

    let graph = builtin::chat_default();
    let registry = turn_registry(&tree, ApplyMode::Real);

    // Round trip through JSON, then run the imported copy.
    let json = exchange::to_json(&graph).unwrap();
    let imported = exchange::from_json(&json, &registry).unwrap();
    assert_eq!(imported, graph);

    let mut exec = GraphExecutor::new(&imported, registry, Context::new());
    exec.run().unwrap();
    assert_eq!(
        fs::read_to_string(tree.path().join("src/a.txt")).unwrap(),
        "ONE\ntwo\n"
    );
}

#[test]
fn imported_graph_preserves_metadata_and_conditions() {
    let graph = WorkflowGraph::new(
        "annotated",
        vec![
            Node::with_stage("start", "noop").meta("retries", json!(2)),
            Node::new("done"),
        ],
        vec![Edge::when("start", "done", "ready")],
        "start",
    )
    .unwrap();

    let mut registry = Registry::new();
    registry.register_condition("ready", |ctx: &Context| ctx.contains("ready"));

    let record = exchange::export(&graph);
    let imported = exchange::import(record, &registry).unwrap();
    assert_eq!(imported, graph);
    assert_eq!(
        imported.node("start").unwrap().metadata["retries"],
        json!(2)
    );
    assert_eq!(
        imported.edges()[0].condition.as_deref(),
        Some("ready")
    );
}

#[test]
fn stage_failure_surfaces_the_node_and_keeps_the_context() {
    let tree = TempDir::new().unwrap();
    // No file on disk and no `patches` entry: the patch stage must fail.
    let graph = WorkflowGraph::new(
        "patch_only",
        vec![Node::with_stage("PATCH", "patch")],
        vec![],
        "PATCH",
    )
    .unwrap();

    let mut registry = Registry::new();
    registry.register_stage(
        "patch",
        stages::patch_apply_stage(tree.path(), ApplyMode::Real, ApplyConfig::default()),
    );

    let mut seed = Context::new();
    seed.set("turn", 7);
    let mut exec = GraphExecutor::new(&graph, registry, seed.clone());

    let err = exec.run().unwrap_err();
    assert!(err.to_string().contains("PATCH"));
    assert_eq!(exec.context(), &seed);
}
