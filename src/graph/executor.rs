//! Single-session graph execution.
//!
//! One executor owns one [`Context`] for the session's lifetime. Each step
//! is atomic: the stage runs against a clone of the Context, so a failing
//! stage leaves the session state untouched and the executor parked at the
//! failing node.

use tracing::{debug, warn};

use super::context::Context;
use super::errors::GraphError;
use super::model::WorkflowGraph;
use super::registry::Registry;

/// Where a session is and where it has been. History is diagnostic; the
/// graph is a DAG, so no id repeats in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionState {
    pub current: String,
    pub history: Vec<String>,
    pub halted: bool,
}

/// Result of one executor step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The stage ran and an edge was taken.
    Advanced { from: String, to: String },
    /// The stage ran and no outgoing edge matched; execution is over.
    Halted { at: String },
}

/// Drives one session of one graph.
pub struct GraphExecutor<'g> {
    graph: &'g WorkflowGraph,
    registry: Registry,
    context: Context,
    state: ExecutionState,
}

impl<'g> GraphExecutor<'g> {
    pub fn new(graph: &'g WorkflowGraph, registry: Registry, context: Context) -> Self {
        let start = graph.start().to_string();
        Self {
            graph,
            registry,
            context,
            state: ExecutionState {
                current: start.clone(),
                history: vec![start],
                halted: false,
            },
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state.halted
    }

    /// Consume the executor, handing the Context back to the caller.
    pub fn into_context(self) -> Context {
        self.context
    }

    /// Run one step: invoke the current node's stage, then evaluate its
    /// outgoing edges in declared order against the updated Context. The
    /// first edge whose named condition holds is taken; a condition-less
    /// edge is a fallback. Zero matches halts the session at this node.
    pub fn step(&mut self) -> Result<StepOutcome, GraphError> {
        if self.state.halted {
            return Ok(StepOutcome::Halted {
                at: self.state.current.clone(),
            });
        }

        let current = self.state.current.clone();
        let node = self
            .graph
            .node(&current)
            .ok_or_else(|| GraphError::UnknownNode { id: current.clone() })?;

        if let Some(stage_name) = &node.stage {
            let stage =
                self.registry
                    .stage(stage_name)
                    .ok_or_else(|| GraphError::UnknownStage {
                        name: stage_name.clone(),
                    })?;
            // Atomic step: the stage consumes a clone; the session Context
            // is only replaced on success.
            match stage(self.context.clone()) {
                Ok(updated) => self.context = updated,
                Err(source) => {
                    warn!(node = %current, error = %source, "stage failed");
                    return Err(GraphError::StageFailure {
                        node: current,
                        source,
                    });
                }
            }
        }

        let mut next: Option<String> = None;
        for edge in self.graph.outgoing(&current) {
            let taken = match &edge.condition {
                Some(name) => {
                    let condition =
                        self.registry
                            .condition(name)
                            .ok_or_else(|| GraphError::UnknownCondition {
                                name: name.clone(),
                            })?;
                    condition(&self.context)
                }
                None => true,
            };
            if taken {
                next = Some(edge.dst.clone());
                break;
            }
        }

        match next {
            Some(to) => {
                debug!(from = %current, to = %to, "advanced");
                self.state.current = to.clone();
                self.state.history.push(to.clone());
                Ok(StepOutcome::Advanced { from: current, to })
            }
            None => {
                debug!(at = %current, "halted");
                self.state.halted = true;
                Ok(StepOutcome::Halted { at: current })
            }
        }
    }

    /// Step until the session halts. Bounded by the node count: a DAG path
    /// cannot revisit a node, so more steps than nodes cannot occur.
    pub fn run(&mut self) -> Result<&Context, GraphError> {
        for _ in 0..=self.graph.node_count() {
            if let StepOutcome::Halted { .. } = self.step()? {
                return Ok(&self.context);
            }
        }
        self.state.halted = true;
        Ok(&self.context)
    }
}
