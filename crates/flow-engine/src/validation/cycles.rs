//! Explicit cycle enumeration for human-readable cycle issues
//!
//! Unlike the sorter's cycle flag this walks with an explicit active path,
//! so every back edge yields the concrete loop it closes.

use std::collections::{HashMap, HashSet};

use crate::types::{NodeId, WorkflowGraph};

/// Find cycles in `graph`
///
/// Each cycle is the active path from the revisited node to the current
/// node, followed by the revisited node again (`[a, b, a]`). Exploration
/// stops along a branch once it closes a cycle, so this reports the loops
/// a depth-first walk encounters rather than every elementary cycle.
pub fn detect_cycles(graph: &WorkflowGraph) -> Vec<Vec<NodeId>> {
    let known: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        if known.contains(edge.target.as_str()) {
            adjacency
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }
    }

    let mut walker = PathWalker {
        adjacency,
        visited: HashSet::new(),
        path: Vec::new(),
        path_index: HashMap::new(),
        cycles: Vec::new(),
    };

    for node in &graph.nodes {
        if !walker.visited.contains(node.id.as_str()) {
            walker.walk(&node.id);
        }
    }

    walker.cycles
}

/// Depth-first walk whose call stack is the explicit active path
struct PathWalker<'a> {
    adjacency: HashMap<&'a str, Vec<&'a str>>,
    visited: HashSet<&'a str>,
    /// Active path: each node with the index of its next neighbor
    path: Vec<(&'a str, usize)>,
    /// Position of each active node within `path`
    path_index: HashMap<&'a str, usize>,
    cycles: Vec<Vec<NodeId>>,
}

impl<'a> PathWalker<'a> {
    fn walk(&mut self, root: &'a str) {
        self.enter(root);

        while let Some(&(node, cursor)) = self.path.last() {
            let next = self
                .adjacency
                .get(node)
                .and_then(|neighbors| neighbors.get(cursor))
                .copied();

            let Some(neighbor) = next else {
                self.path.pop();
                self.path_index.remove(node);
                continue;
            };

            if let Some(frame) = self.path.last_mut() {
                frame.1 += 1;
            }

            if let Some(&start) = self.path_index.get(neighbor) {
                let mut cycle: Vec<NodeId> =
                    self.path[start..].iter().map(|(n, _)| n.to_string()).collect();
                cycle.push(neighbor.to_string());
                self.cycles.push(cycle);
            } else if !self.visited.contains(neighbor) {
                self.enter(neighbor);
            }
        }
    }

    fn enter(&mut self, node: &'a str) {
        self.visited.insert(node);
        self.path_index.insert(node, self.path.len());
        self.path.push((node, 0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;

    #[test]
    fn test_two_node_cycle() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "start", (0.0, 0.0))
            .add_node("b", "end", (1.0, 0.0))
            .add_edge("a", "b")
            .add_edge("b", "a")
            .build();

        assert_eq!(detect_cycles(&graph), vec![vec!["a", "b", "a"]]);
    }

    #[test]
    fn test_cycle_path_excludes_lead_in() {
        let graph = WorkflowBuilder::new()
            .add_node("s", "start", (0.0, 0.0))
            .add_node("x", "prompt", (1.0, 0.0))
            .add_node("y", "prompt", (2.0, 0.0))
            .add_node("z", "prompt", (3.0, 0.0))
            .add_edge("s", "x")
            .add_edge("x", "y")
            .add_edge("y", "z")
            .add_edge("z", "x")
            .build();

        assert_eq!(detect_cycles(&graph), vec![vec!["x", "y", "z", "x"]]);
    }

    #[test]
    fn test_self_loop() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "prompt", (0.0, 0.0))
            .add_edge("a", "a")
            .build();

        assert_eq!(detect_cycles(&graph), vec![vec!["a", "a"]]);
    }

    #[test]
    fn test_diamond_has_no_cycle() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "start", (0.0, 0.0))
            .add_node("b", "prompt", (1.0, 0.0))
            .add_node("c", "prompt", (1.0, 1.0))
            .add_node("d", "end", (2.0, 0.0))
            .add_edge("a", "b")
            .add_edge("a", "c")
            .add_edge("b", "d")
            .add_edge("c", "d")
            .build();

        assert!(detect_cycles(&graph).is_empty());
    }

    #[test]
    fn test_dangling_target_ignored() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "start", (0.0, 0.0))
            .add_edge("a", "ghost")
            .build();

        assert!(detect_cycles(&graph).is_empty());
    }

    #[test]
    fn test_long_chain_with_closing_edge() {
        let count = 100_000;
        let mut builder = WorkflowBuilder::new();
        for i in 0..count {
            builder = builder.add_node(format!("n{}", i), "prompt", (i as f64, 0.0));
        }
        for i in 1..count {
            builder = builder.add_edge(format!("n{}", i - 1), format!("n{}", i));
        }
        let graph = builder.add_edge(format!("n{}", count - 1), "n0").build();

        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), count + 1);
        assert_eq!(cycles[0].first(), cycles[0].last());
    }
}
