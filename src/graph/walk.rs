//! Depth-first traversal of a frozen [`DependencyGraph`].

use std::collections::{HashMap, HashSet};

use super::{DependencyGraph, NodeIndex};

/// Callbacks for [`walk_depth_first`]. Every method has a no-op default.
pub trait GraphVisitor {
    /// Called when a vertex is first reached. Returning `false` stops the
    /// walk from descending into it.
    fn start_vertex_visit(&mut self, _graph: &DependencyGraph, _node: NodeIndex) -> bool {
        true
    }

    fn finish_vertex_visit(&mut self, _graph: &DependencyGraph, _node: NodeIndex) {}

    /// Called when a vertex is reached again.
    fn skipped_vertex_visit(&mut self, _graph: &DependencyGraph, _node: NodeIndex) {}

    /// Called before following an edge. Returning `false` skips it.
    fn traverse_edge(&mut self, _graph: &DependencyGraph, _from: NodeIndex, _to: NodeIndex) -> bool {
        true
    }

    fn skipped_edge_traversal(&mut self, _graph: &DependencyGraph, _from: NodeIndex, _to: NodeIndex) {}
}

/// Walk the graph depth-first from `start`, visiting each vertex once.
///
/// Returns the vertices in the order they were first encountered.
pub fn walk_depth_first<V: GraphVisitor + ?Sized>(
    graph: &DependencyGraph,
    start: NodeIndex,
    visitor: &mut V,
) -> Vec<NodeIndex> {
    let mut progress = HashSet::new();
    let mut encounters = Vec::new();
    walk(graph, start, visitor, &mut progress, &mut encounters);
    encounters
}

/// Walk from every root in order. A vertex reached from an earlier root is
/// reported as skipped when a later root reaches it again.
pub fn walk_from_roots<V: GraphVisitor + ?Sized>(graph: &DependencyGraph, visitor: &mut V) -> Vec<NodeIndex> {
    let mut progress = HashSet::new();
    let mut encounters = Vec::new();
    for &root in graph.root_indices() {
        if progress.insert(root) {
            walk(graph, root, visitor, &mut progress, &mut encounters);
        } else {
            visitor.skipped_vertex_visit(graph, root);
        }
    }
    encounters
}

fn walk<V: GraphVisitor + ?Sized>(
    graph: &DependencyGraph,
    start: NodeIndex,
    visitor: &mut V,
    progress: &mut HashSet<NodeIndex>,
    encounters: &mut Vec<NodeIndex>,
) {
    // (vertex, its children, next child to consider)
    let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
    if let Some(frame) = enter(graph, start, visitor, progress, encounters) {
        stack.push(frame);
    }

    while let Some((from, children, next)) = stack.last_mut() {
        let from = *from;
        let Some(&to) = children.get(*next) else {
            stack.pop();
            visitor.finish_vertex_visit(graph, from);
            continue;
        };
        *next += 1;

        if to == from {
            continue;
        }
        if !visitor.traverse_edge(graph, from, to) {
            visitor.skipped_edge_traversal(graph, from, to);
            continue;
        }
        if progress.contains(&to) {
            visitor.skipped_vertex_visit(graph, to);
        } else if let Some(frame) = enter(graph, to, visitor, progress, encounters) {
            stack.push(frame);
        }
    }
}

/// Record `node` as reached. Returns its frame when the visitor descends into it.
fn enter<V: GraphVisitor + ?Sized>(
    graph: &DependencyGraph,
    node: NodeIndex,
    visitor: &mut V,
    progress: &mut HashSet<NodeIndex>,
    encounters: &mut Vec<NodeIndex>,
) -> Option<(NodeIndex, Vec<NodeIndex>, usize)> {
    progress.insert(node);
    encounters.push(node);
    if !visitor.start_vertex_visit(graph, node) {
        return None;
    }
    Some((node, graph.children(node), 0))
}

/// Renders the graph as a numbered tree.
///
/// ```text
/// 1:  >0 org.example:app:1.0
/// 2:  >1   org.example:core:1.0
/// 3:  >2     org.example:util:1.0
/// 4:  >1   org.example:util:1.0 -DUPLICATE- (see line: 3)
/// ```
#[derive(Debug)]
pub struct TreePrinter {
    indent: String,
    depth: usize,
    lines: Vec<String>,
    first_line: HashMap<NodeIndex, usize>,
}

impl Default for TreePrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl TreePrinter {
    pub fn new() -> Self {
        Self::with_indent("  ")
    }

    pub fn with_indent(indent: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
            depth: 0,
            lines: Vec::new(),
            first_line: HashMap::new(),
        }
    }

    /// Print every root of `graph`.
    pub fn print(mut self, graph: &DependencyGraph) -> String {
        walk_from_roots(graph, &mut self);
        self.lines.join("\n")
    }

    /// Print the subtree under `start`.
    pub fn print_from(mut self, graph: &DependencyGraph, start: NodeIndex) -> String {
        walk_depth_first(graph, start, &mut self);
        self.lines.join("\n")
    }

    fn label(graph: &DependencyGraph, node: NodeIndex) -> String {
        match graph.node(node) {
            Some(n) if n.is_disconnected() => format!("{} (disconnected)", n.identity()),
            Some(n) => n.identity().to_string(),
            None => format!("<missing {}>", node.index()),
        }
    }

    fn push_line(&mut self, text: &str) {
        let number = self.lines.len() + 1;
        let prefix = format!("{number}:");
        let pad = " ".repeat(4usize.saturating_sub(prefix.len()));
        let indent = self.indent.repeat(self.depth);
        self.lines.push(format!("{prefix}{pad}>{} {indent}{text}", self.depth));
    }
}

impl GraphVisitor for TreePrinter {
    fn start_vertex_visit(&mut self, graph: &DependencyGraph, node: NodeIndex) -> bool {
        let label = Self::label(graph, node);
        self.push_line(&label);
        self.first_line.insert(node, self.lines.len());
        self.depth += 1;
        true
    }

    fn finish_vertex_visit(&mut self, _graph: &DependencyGraph, _node: NodeIndex) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn skipped_vertex_visit(&mut self, graph: &DependencyGraph, node: NodeIndex) {
        let label = Self::label(graph, node);
        let text = match self.first_line.get(&node) {
            Some(line) => format!("{label} -DUPLICATE- (see line: {line})"),
            None => format!("{label} -DUPLICATE-"),
        };
        self.push_line(&text);
    }
}
