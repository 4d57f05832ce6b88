//! Needs graph over sections and variables.
//!
//! Every `needs` entry becomes an edge from the declaring entity to the entity it
//! references. The graph answers two questions: is there a cycle (a load-time error
//! naming every participant), and what is the stable dependencies-first order of a
//! set of entities. Ties in that order are broken by declaration order, so the same
//! declarations always produce the same order.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use crate::core::BoilerplateError;

/// A section or variable participating in the needs graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NeedsNode {
    /// Section, by key
    Section(String),
    /// Variable, by name
    Variable(String),
}

impl NeedsNode {
    /// The key or name of the entity.
    pub fn name(&self) -> &str {
        match self {
            Self::Section(name) | Self::Variable(name) => name,
        }
    }
}

impl fmt::Display for NeedsNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Directed graph where an edge `a -> b` means "a needs b".
///
/// Node indices follow insertion order, which is what makes [`stable_order`]
/// deterministic. Insert nodes in declaration order before adding edges.
///
/// [`stable_order`]: NeedsGraph::stable_order
#[derive(Debug, Default)]
pub struct NeedsGraph {
    graph: DiGraph<NeedsNode, ()>,
    node_map: HashMap<NeedsNode, NodeIndex>,
}

impl NeedsGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if it is not already present and return its index.
    pub fn ensure_node(&mut self, node: NeedsNode) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&node) {
            index
        } else {
            let index = self.graph.add_node(node.clone());
            self.node_map.insert(node, index);
            index
        }
    }

    /// Record that `from` needs `to`. Duplicate edges are ignored.
    pub fn add_dependency(&mut self, from: NeedsNode, to: NeedsNode) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Fail with [`BoilerplateError::DependencyCycle`] if any cycle exists.
    ///
    /// The reported cycle lists every entity on it and repeats the first one at the end.
    pub fn detect_cycles(&self) -> Result<(), BoilerplateError> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|n| (n, Color::White)).collect();
        let mut path: Vec<NodeIndex> = Vec::new();

        for node in self.graph.node_indices() {
            if colors.get(&node) != Some(&Color::White) {
                continue;
            }
            if let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path) {
                return Err(BoilerplateError::DependencyCycle {
                    cycle: cycle.iter().map(|&i| self.graph[i].to_string()).collect(),
                });
            }
        }

        Ok(())
    }

    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        neighbors.sort();

        for neighbor in neighbors {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|&n| n == neighbor).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(neighbor);
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

    /// Dependencies-first order, ties broken by insertion order.
    ///
    /// Kahn's algorithm with a min-heap on node index. Nodes stuck on a cycle are
    /// appended in insertion order, so callers always get every node back exactly once.
    pub fn stable_order(&self) -> Vec<NeedsNode> {
        let mut pending: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Outgoing).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = pending
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&n, _)| Reverse(n))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut emitted = vec![false; self.graph.node_count()];

        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            emitted[node.index()] = true;
            for dependent in self.graph.neighbors_directed(node, Direction::Incoming) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse(dependent));
                    }
                }
            }
        }

        for node in self.graph.node_indices() {
            if !emitted[node.index()] {
                order.push(node);
            }
        }

        order.into_iter().map(|i| self.graph[i].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str) -> NeedsNode {
        NeedsNode::Section(name.to_string())
    }

    fn variable(name: &str) -> NeedsNode {
        NeedsNode::Variable(name.to_string())
    }

    #[test]
    fn test_chain_orders_dependencies_first() {
        let mut graph = NeedsGraph::new();
        graph.ensure_node(section("a"));
        graph.ensure_node(section("b"));
        graph.ensure_node(section("c"));
        graph.add_dependency(section("a"), section("b"));
        graph.add_dependency(section("b"), section("c"));

        assert!(graph.detect_cycles().is_ok());
        assert_eq!(graph.stable_order(), vec![section("c"), section("b"), section("a")]);
    }

    #[test]
    fn test_three_way_cycle_names_all_entities() {
        let mut graph = NeedsGraph::new();
        graph.add_dependency(section("A"), section("B"));
        graph.add_dependency(section("B"), section("C"));
        graph.add_dependency(section("C"), section("A"));

        let err = graph.detect_cycles().unwrap_err();
        assert_eq!(err.to_string(), "Circular dependency detected: A → B → C → A");
    }

    #[test]
    fn test_self_need_is_a_cycle() {
        let mut graph = NeedsGraph::new();
        graph.add_dependency(variable("x"), variable("x"));
        assert!(matches!(
            graph.detect_cycles(),
            Err(BoilerplateError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut graph = NeedsGraph::new();
        graph.add_dependency(section("top"), section("left"));
        graph.add_dependency(section("top"), section("right"));
        graph.add_dependency(section("left"), section("base"));
        graph.add_dependency(section("right"), section("base"));
        assert!(graph.detect_cycles().is_ok());

        let order = graph.stable_order();
        assert_eq!(order.first(), Some(&section("base")));
        assert_eq!(order.last(), Some(&section("top")));
    }

    #[test]
    fn test_independent_nodes_keep_insertion_order() {
        let mut graph = NeedsGraph::new();
        for name in ["general", "network", "traefik", "database"] {
            graph.ensure_node(section(name));
        }
        graph.add_dependency(section("traefik"), section("network"));

        let names: Vec<String> = graph.stable_order().iter().map(ToString::to_string).collect();
        assert_eq!(names, ["general", "network", "traefik", "database"]);
    }

    #[test]
    fn test_cycle_members_are_appended_not_dropped() {
        let mut graph = NeedsGraph::new();
        graph.ensure_node(section("free"));
        graph.add_dependency(section("x"), section("y"));
        graph.add_dependency(section("y"), section("x"));

        let order = graph.stable_order();
        assert_eq!(order, vec![section("free"), section("x"), section("y")]);
    }

    #[test]
    fn test_duplicate_edges_ignored() {
        let mut graph = NeedsGraph::new();
        graph.add_dependency(variable("a"), variable("b"));
        graph.add_dependency(variable("a"), variable("b"));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.graph.edge_count(), 1);
    }
}
