//! Named graph store.
//!
//! Holds the graphs a session can execute, keyed by name. Construction goes
//! through [`WorkflowGraph::new`], so everything stored here has already
//! passed endpoint and cycle validation. Retiring a graph just discards it;
//! running executors hold their own reference and are unaffected.

use std::collections::HashMap;

use super::errors::GraphError;
use super::exchange::{import, GraphRecord};
use super::model::{Edge, Node, WorkflowGraph};
use super::registry::Registry;

#[derive(Debug, Default)]
pub struct GraphManager {
    graphs: HashMap<String, WorkflowGraph>,
}

impl GraphManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct, validate, and store a graph under its name.
    pub fn create_graph(
        &mut self,
        name: impl Into<String>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        start: impl Into<String>,
    ) -> Result<&WorkflowGraph, GraphError> {
        let graph = WorkflowGraph::new(name, nodes, edges, start)?;
        Ok(self.store(graph))
    }

    /// Import an exchange record and store the resulting graph.
    pub fn import_graph(
        &mut self,
        record: GraphRecord,
        registry: &Registry,
    ) -> Result<&WorkflowGraph, GraphError> {
        let graph = import(record, registry)?;
        Ok(self.store(graph))
    }

    /// Insert a validated graph, replacing any prior graph of the same name.
    fn store(&mut self, graph: WorkflowGraph) -> &WorkflowGraph {
        let name = graph.name().to_string();
        self.graphs.insert(name.clone(), graph);
        self.graphs.get(&name).expect("just inserted")
    }

    pub fn get(&self, name: &str) -> Option<&WorkflowGraph> {
        self.graphs.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut WorkflowGraph> {
        self.graphs.get_mut(name)
    }

    /// Discard a graph, returning it if it was stored.
    pub fn retire_graph(&mut self, name: &str) -> Option<WorkflowGraph> {
        self.graphs.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}
