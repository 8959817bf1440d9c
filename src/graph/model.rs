//! The workflow graph: data only.
//!
//! Nodes carry a stage *name* and open-ended metadata; edges carry a
//! condition *name*. Acyclicity is enforced at construction and re-checked
//! on every `add_edge`; a mutation that would close a cycle is rolled back
//! before the error is returned, leaving the graph exactly as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::cycle::detect_cycle;
use super::errors::GraphError;

/// One workflow node. The stage binding is resolved by name at execution
/// time; metadata is free-form and round-trips through export unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stage: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_stage(id: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stage: Some(stage.into()),
            metadata: BTreeMap::new(),
        }
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A directed edge. `condition` names a registry predicate; a `None`
/// condition is an unconditional fallback, taken only when reached in
/// declared order with nothing before it matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub src: String,
    pub dst: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Edge {
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            condition: None,
        }
    }

    pub fn when(
        src: impl Into<String>,
        dst: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            condition: Some(condition.into()),
        }
    }
}

/// A named DAG of stages. Immutable during execution; mutable only through
/// the validating `add_node`/`add_edge` before a session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowGraph {
    name: String,
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
    start: String,
}

impl WorkflowGraph {
    /// Construct and validate a graph. Fails without producing a graph when
    /// a node id repeats, an edge or the start references an unknown node,
    /// or the edges form a cycle.
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        start: impl Into<String>,
    ) -> Result<Self, GraphError> {
        let name = name.into();
        let start = start.into();

        let mut node_map = BTreeMap::new();
        for node in nodes {
            if node_map.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode { id: node.id });
            }
            node_map.insert(node.id.clone(), node);
        }
        if !node_map.contains_key(&start) {
            return Err(GraphError::UnknownNode { id: start });
        }
        for edge in &edges {
            for endpoint in [&edge.src, &edge.dst] {
                if !node_map.contains_key(endpoint) {
                    return Err(GraphError::UnknownNode {
                        id: endpoint.clone(),
                    });
                }
            }
        }

        let graph = Self {
            name,
            nodes: node_map,
            edges,
            start,
        };
        if detect_cycle(&graph) {
            return Err(GraphError::CyclicGraph { graph: graph.name });
        }
        Ok(graph)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Outgoing edges of `id` in their declared order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.src == id)
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode { id: node.id });
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Build a graph without validation (for exercising the detector).
    #[cfg(test)]
    pub(crate) fn unchecked(
        name: &str,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        start: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            edges,
            start: start.to_string(),
        }
    }

    /// Add an edge, re-running cycle detection. On rejection the edge is
    /// rolled back and the graph is left exactly as it was.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        for endpoint in [&edge.src, &edge.dst] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::UnknownNode {
                    id: endpoint.clone(),
                });
            }
        }
        self.edges.push(edge);
        if detect_cycle(self) {
            self.edges.pop();
            return Err(GraphError::CyclicGraph {
                graph: self.name.clone(),
            });
        }
        Ok(())
    }
}
