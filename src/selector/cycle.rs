//! Override cycle detection.
//!
//! Every selection `role#a = b` is an edge `role#a → role#b` in an override
//! graph. A cycle in that graph means every component in it is overridden by
//! another one, so none can be selected and alias bindings would chase each
//! other forever. The container refuses to start when one is found.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use super::ComponentSelector;
use crate::core::{ComponentKey, EmbError, Result};

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is on the current DFS path.
    Gray,
    /// Node and all its successors are done.
    Black,
}

/// Directed graph of configured overrides.
#[derive(Debug, Default)]
pub struct OverrideGraph {
    graph: DiGraph<ComponentKey, ()>,
    node_map: HashMap<ComponentKey, NodeIndex>,
}

impl OverrideGraph {
    /// Build the graph from a selector's override edges.
    pub fn from_selector(selector: &ComponentSelector) -> Self {
        let mut graph = Self::default();
        for (from, to) in selector.override_edges() {
            graph.add_override(from, to);
        }
        graph
    }

    fn ensure_node(&mut self, key: ComponentKey) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&key) {
            index
        } else {
            let index = self.graph.add_node(key.clone());
            self.node_map.insert(key, index);
            index
        }
    }

    /// Record that `from` is replaced by `to`.
    pub fn add_override(&mut self, from: ComponentKey, to: ComponentKey) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Return the first cycle found as a closed path (`a → b → a`).
    pub fn find_cycle(&self) -> Option<Vec<ComponentKey>> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|n| (n, Color::White)).collect();
        let mut path = Vec::new();

        for node in self.graph.node_indices() {
            if matches!(colors.get(&node), Some(Color::White))
                && let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<ComponentKey>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.graph.neighbors(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle: Vec<ComponentKey> =
                        path[start..].iter().map(|n| self.graph[*n].clone()).collect();
                    cycle.push(self.graph[neighbor].clone());
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }
}

/// Fail with [`EmbError::OverrideCycle`] if the selector's overrides form a cycle.
pub fn detect_override_cycles(selector: &ComponentSelector) -> Result<()> {
    match OverrideGraph::from_selector(selector).find_cycle() {
        Some(cycle) => {
            let chain = cycle.iter().map(ComponentKey::key).collect::<Vec<_>>().join(" → ");
            Err(EmbError::OverrideCycle {
                chain,
            })
        }
        None => Ok(()),
    }
}
