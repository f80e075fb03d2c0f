// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dependency-cycle detection over an explicit graph of string-addressable
//! nodes (spec §4.10, C10): DFS with an explicit recursion stack so a
//! detected back-edge can be rendered as an ordered chain.

use nomos_error::{CodedError, ErrorCode};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::BTreeMap;
use thiserror::Error;

/// A dependency cycle was found among the graph's nodes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("dependency cycle detected: {}", chain.join(" → "))]
pub struct CycleError {
    /// The ordered chain of node ids forming the cycle, repeating the
    /// first node at the end to make the loop visible.
    pub chain: Vec<String>,
}

impl CodedError for CycleError {
    fn code(&self) -> ErrorCode {
        ErrorCode::ValidationDependencyCycle
    }
}

/// A directed graph of string-addressable nodes, used to represent
/// dependencies between source files or declarations.
#[derive(Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    index_of: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `id` has a node, returning its index.
    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index_of.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.index_of.insert(id.to_string(), idx);
        idx
    }

    /// Record that `from` depends on `to`.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        self.graph.add_edge(from_idx, to_idx, ());
    }

    /// Run DFS with an explicit recursion stack over every node,
    /// returning the first cycle found (in insertion order of nodes),
    /// or `None` if the graph is acyclic.
    #[must_use]
    pub fn detect_cycle(&self) -> Option<CycleError> {
        let mut visited = vec![false; self.graph.node_count()];
        let mut on_stack = vec![false; self.graph.node_count()];
        let mut stack: Vec<NodeIndex> = Vec::new();

        for &start in self.index_of.values() {
            if visited[start.index()] {
                continue;
            }
            if let Some(cycle) =
                self.dfs(start, &mut visited, &mut on_stack, &mut stack)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs(
        &self,
        node: NodeIndex,
        visited: &mut [bool],
        on_stack: &mut [bool],
        stack: &mut Vec<NodeIndex>,
    ) -> Option<CycleError> {
        visited[node.index()] = true;
        on_stack[node.index()] = true;
        stack.push(node);

        for neighbor in self.graph.neighbors(node) {
            if on_stack[neighbor.index()] {
                let start = stack.iter().position(|&n| n == neighbor).unwrap();
                let mut chain: Vec<String> = stack[start..]
                    .iter()
                    .map(|&n| self.graph[n].clone())
                    .collect();
                chain.push(self.graph[neighbor].clone());
                return Some(CycleError { chain });
            }
            if !visited[neighbor.index()] {
                if let Some(cycle) = self.dfs(neighbor, visited, on_stack, stack) {
                    return Some(cycle);
                }
            }
        }

        stack.pop();
        on_stack[node.index()] = false;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acyclic_graph_has_no_cycle() {
        let mut g = DependencyGraph::new();
        g.add_edge("a", "b");
        g.add_edge("b", "c");
        assert!(g.detect_cycle().is_none());
    }

    #[test]
    fn direct_cycle_is_detected() {
        let mut g = DependencyGraph::new();
        g.add_edge("a", "b");
        g.add_edge("b", "a");
        let cycle = g.detect_cycle().unwrap();
        assert_eq!(cycle.chain, vec!["a".to_string(), "b".to_string(), "a".to_string()]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut g = DependencyGraph::new();
        g.add_edge("a", "a");
        let cycle = g.detect_cycle().unwrap();
        assert_eq!(cycle.chain, vec!["a".to_string(), "a".to_string()]);
    }

    #[test]
    fn indirect_cycle_through_three_nodes_is_detected() {
        let mut g = DependencyGraph::new();
        g.add_edge("a", "b");
        g.add_edge("b", "c");
        g.add_edge("c", "a");
        let cycle = g.detect_cycle().unwrap();
        assert_eq!(cycle.chain.first(), cycle.chain.last());
        assert_eq!(cycle.chain.len(), 4);
    }
}
