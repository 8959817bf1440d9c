//! Cycle detection over workflow graphs.

use std::collections::HashMap;

use super::model::WorkflowGraph;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color depth-first cycle check. Pure: the graph is not touched.
///
/// Every node is used as a DFS root, so cycles in components unreachable
/// from the start node are still found.
pub fn detect_cycle(graph: &WorkflowGraph) -> bool {
    let mut colors: HashMap<&str, Color> =
        graph.node_ids().map(|id| (id, Color::White)).collect();

    for id in graph.node_ids() {
        if colors[id] == Color::White && visit(graph, id, &mut colors) {
            return true;
        }
    }
    false
}

fn visit<'g>(graph: &'g WorkflowGraph, id: &'g str, colors: &mut HashMap<&'g str, Color>) -> bool {
    colors.insert(id, Color::Gray);
    for edge in graph.outgoing(id) {
        match colors.get(edge.dst.as_str()) {
            // Back-edge to a node still on the stack: cycle.
            Some(Color::Gray) => return true,
            Some(Color::White) => {
                if visit(graph, edge.dst.as_str(), colors) {
                    return true;
                }
            }
            Some(Color::Black) | None => {}
        }
    }
    colors.insert(id, Color::Black);
    false
}
