//! Graph export/import.
//!
//! The exchange record is pure data: node ids, stage and condition *names*,
//! metadata, edge order, start node. Nothing executable is serialized;
//! bindings are re-resolved against a [`Registry`] at import time, with the
//! same `CyclicGraph`/`UnknownNode` errors as direct construction.

use serde::{Deserialize, Serialize};

use super::errors::GraphError;
use super::model::{Edge, Node, WorkflowGraph};
use super::registry::Registry;

/// Serializable form of a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub name: String,
    pub start: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Export a graph to its exchange record.
pub fn export(graph: &WorkflowGraph) -> GraphRecord {
    GraphRecord {
        name: graph.name().to_string(),
        start: graph.start().to_string(),
        nodes: graph.nodes().cloned().collect(),
        edges: graph.edges().to_vec(),
    }
}

/// Import a graph from its exchange record, re-resolving condition names
/// against `registry`. Stage names are resolved lazily at execution so a
/// graph can be imported for inspection without its stage bindings present.
pub fn import(record: GraphRecord, registry: &Registry) -> Result<WorkflowGraph, GraphError> {
    for edge in &record.edges {
        if let Some(name) = &edge.condition {
            if !registry.has_condition(name) {
                return Err(GraphError::UnknownCondition { name: name.clone() });
            }
        }
    }
    WorkflowGraph::new(record.name, record.nodes, record.edges, record.start)
}

/// Serialize a graph to pretty JSON.
pub fn to_json(graph: &WorkflowGraph) -> Result<String, GraphError> {
    Ok(serde_json::to_string_pretty(&export(graph))?)
}

/// Deserialize and import a graph from JSON.
pub fn from_json(json: &str, registry: &Registry) -> Result<WorkflowGraph, GraphError> {
    let record: GraphRecord = serde_json::from_str(json)?;
    import(record, registry)
}
