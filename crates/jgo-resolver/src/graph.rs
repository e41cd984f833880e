//! Dependency graph construction and traversal.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// A node in the resolved dependency graph.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResolvedNode {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub scope: String,
}

impl ResolvedNode {
    /// `group:artifact` identifier (without version).
    pub fn key(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }

    /// The synthetic root standing in for the endpoint itself.
    pub fn synthetic_root(label: &str) -> Self {
        Self {
            group: String::new(),
            artifact: label.to_string(),
            version: String::new(),
            scope: "compile".to_string(),
        }
    }
}

impl fmt::Display for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.artifact)
        } else {
            write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
        }
    }
}

/// Edge label in the dependency graph.
#[derive(Debug, Clone)]
pub struct DepEdge {
    pub scope: String,
}

/// A resolved dependency graph backed by petgraph.
#[derive(Default)]
pub struct DependencyGraph {
    graph: DiGraph<ResolvedNode, DepEdge>,
    /// Lookup from `group:artifact` to node index (only the resolved version).
    index: HashMap<String, NodeIndex>,
    pub root: Option<NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or retrieve a node. If the key already exists, returns the existing index.
    pub fn add_node(&mut self, node: ResolvedNode) -> NodeIndex {
        let key = node.key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    /// Set the root node of the graph (the endpoint itself).
    pub fn set_root(&mut self, idx: NodeIndex) {
        self.root = Some(idx);
    }

    /// Add a dependency edge from `from` to `to`.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: DepEdge) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    /// Look up a node by `group:artifact`.
    pub fn find(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    /// Get the node data for an index.
    pub fn node(&self, idx: NodeIndex) -> &ResolvedNode {
        &self.graph[idx]
    }

    /// All resolved nodes (excluding the synthetic root).
    pub fn all_nodes(&self) -> Vec<&ResolvedNode> {
        self.graph
            .node_indices()
            .filter(|&idx| Some(idx) != self.root)
            .map(|idx| &self.graph[idx])
            .collect()
    }

    /// Direct dependencies of a node.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect()
    }

    /// Reverse dependencies (who depends on this node).
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect()
    }

    /// Render the dependency tree with box-drawing connectors.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let root = match self.root {
            Some(r) => r,
            None => return output,
        };

        output.push_str(&format!("{}\n", self.graph[root]));

        let mut visited = HashSet::new();
        visited.insert(root);

        let deps = self.dependencies_of(root);
        let count = deps.len();
        for (i, (idx, _)) in deps.iter().enumerate() {
            self.print_subtree(
                &mut output,
                *idx,
                "",
                i == count - 1,
                1,
                max_depth,
                &mut visited,
            );
        }

        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, _)) in deps.iter().enumerate() {
            self.print_subtree(
                output,
                *child,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(group: &str, artifact: &str, version: &str) -> ResolvedNode {
        ResolvedNode {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
            scope: "compile".to_string(),
        }
    }

    #[test]
    fn add_node_deduplicates_by_key() {
        let mut g = DependencyGraph::new();
        let a = g.add_node(node("org.x", "a", "1.0"));
        let b = g.add_node(node("org.x", "a", "1.0"));
        assert_eq!(a, b);
    }

    #[test]
    fn edges_and_lookups() {
        let mut g = DependencyGraph::new();
        let root = g.add_node(ResolvedNode::synthetic_root("endpoint"));
        g.set_root(root);
        let a = g.add_node(node("org.x", "a", "1.0"));
        let b = g.add_node(node("org.x", "b", "2.0"));
        g.add_edge(root, a, DepEdge { scope: "compile".into() });
        g.add_edge(a, b, DepEdge { scope: "runtime".into() });

        assert_eq!(g.all_nodes().len(), 2);
        assert_eq!(g.dependencies_of(a).len(), 1);
        assert_eq!(g.dependents_of(b).len(), 1);
        assert_eq!(g.find("org.x:b"), Some(b));
    }

    #[test]
    fn tree_rendering_visits_each_node_once() {
        let mut g = DependencyGraph::new();
        let root = g.add_node(ResolvedNode::synthetic_root("g:a:1.0"));
        g.set_root(root);
        let a = g.add_node(node("org.x", "a", "1.0"));
        let b = g.add_node(node("org.x", "b", "2.0"));
        let c = g.add_node(node("org.x", "c", "3.0"));
        g.add_edge(root, a, DepEdge { scope: "compile".into() });
        g.add_edge(root, b, DepEdge { scope: "compile".into() });
        g.add_edge(a, c, DepEdge { scope: "compile".into() });
        g.add_edge(b, c, DepEdge { scope: "compile".into() });

        let tree = g.print_tree(None);
        assert!(tree.starts_with("g:a:1.0\n"));
        assert!(tree.contains("├── org.x:a:1.0"));
        assert!(tree.contains("└── org.x:b:2.0"));
        assert_eq!(tree.matches("org.x:c:3.0").count(), 2);
    }
}
