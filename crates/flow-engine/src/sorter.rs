//! Dependency ordering and input gathering
//!
//! `sort_graph` produces a reverse-postorder of a depth-first traversal,
//! which is a valid topological order whenever the graph is acyclic. Ties
//! are broken purely by input order: entry nodes in `nodes` order,
//! neighbors in edge insertion order. The same graph always yields the
//! same order.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::types::{GraphNode, NodeId, NodeInputs, WorkflowGraph};

/// Output of [`sort_graph`]
#[derive(Debug, Clone)]
pub struct SortResult<'a> {
    /// Nodes in dependency order. Only meaningful when `has_cycle` is false.
    pub order: Vec<&'a GraphNode>,
    /// Whether a back edge was found during traversal
    pub has_cycle: bool,
    /// Endpoints of every back edge, in discovery order, deduplicated.
    /// Non-empty exactly when `has_cycle` is true.
    pub cycle_nodes: Vec<NodeId>,
}

impl<'a> SortResult<'a> {
    /// Node ids of `order`, convenient for assertions and logging
    pub fn order_ids(&self) -> Vec<&'a str> {
        self.order.iter().map(|n| n.id.as_str()).collect()
    }
}

/// Compute a dependency-respecting order of the graph's nodes.
///
/// Callers must check `has_cycle` before using `order` for execution.
pub fn sort_graph(graph: &WorkflowGraph) -> SortResult<'_> {
    let mut sorter = DepthFirstSorter::new(graph);

    let targets: HashSet<&str> = graph.edges.iter().map(|e| e.target.as_str()).collect();
    let mut entry_nodes: Vec<&str> = graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| !targets.contains(id))
        .collect();

    if entry_nodes.is_empty() {
        if let Some(first) = graph.nodes.first() {
            entry_nodes.push(first.id.as_str());
        }
    }

    for id in entry_nodes {
        if !sorter.visited.contains(id) {
            sorter.visit(id);
        }
    }

    // Disconnected components and nodes only reachable through a cycle
    for node in &graph.nodes {
        if !sorter.visited.contains(node.id.as_str()) {
            sorter.visit(&node.id);
        }
    }

    sorter.finish()
}

struct DepthFirstSorter<'a> {
    index: HashMap<&'a str, &'a GraphNode>,
    adjacency: HashMap<&'a str, Vec<&'a str>>,
    visited: HashSet<&'a str>,
    on_stack: HashSet<&'a str>,
    postorder: Vec<&'a GraphNode>,
    cycle_nodes: Vec<NodeId>,
}

impl<'a> DepthFirstSorter<'a> {
    fn new(graph: &'a WorkflowGraph) -> Self {
        let index: HashMap<&str, &GraphNode> =
            graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        // Edges pointing at unknown nodes contribute nothing
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &graph.edges {
            if index.contains_key(edge.target.as_str()) {
                adjacency
                    .entry(edge.source.as_str())
                    .or_default()
                    .push(edge.target.as_str());
            }
        }

        Self {
            index,
            adjacency,
            visited: HashSet::new(),
            on_stack: HashSet::new(),
            postorder: Vec::with_capacity(graph.nodes.len()),
            cycle_nodes: Vec::new(),
        }
    }

    /// Depth-first visit from `root` with an explicit frame stack.
    ///
    /// Each frame is a node and the index of its next neighbor, so long
    /// chains never grow the call stack.
    fn visit(&mut self, root: &'a str) {
        self.visited.insert(root);
        self.on_stack.insert(root);
        let mut frames: Vec<(&'a str, usize)> = vec![(root, 0)];

        while let Some(frame) = frames.last_mut() {
            let (id, cursor) = *frame;
            let next = self
                .adjacency
                .get(id)
                .and_then(|neighbors| neighbors.get(cursor))
                .copied();

            match next {
                Some(neighbor) => {
                    frame.1 += 1;
                    if self.on_stack.contains(neighbor) {
                        self.record_cycle_member(id);
                        self.record_cycle_member(neighbor);
                    } else if self.visited.insert(neighbor) {
                        self.on_stack.insert(neighbor);
                        frames.push((neighbor, 0));
                    }
                }
                None => {
                    frames.pop();
                    self.on_stack.remove(id);
                    if let Some(node) = self.index.get(id) {
                        self.postorder.push(node);
                    }
                }
            }
        }
    }

    fn record_cycle_member(&mut self, id: &str) {
        if !self.cycle_nodes.iter().any(|n| n == id) {
            self.cycle_nodes.push(id.to_string());
        }
    }

    fn finish(self) -> SortResult<'a> {
        let mut order = self.postorder;
        order.reverse();
        SortResult {
            order,
            has_cycle: !self.cycle_nodes.is_empty(),
            cycle_nodes: self.cycle_nodes,
        }
    }
}

/// Gather the inputs of `node_id` from previously recorded results.
///
/// Incoming edges are ordered by the `x` position of their source node
/// (stable, so ties keep edge order; unknown sources count as `x = 0`) and
/// bound to `input1`, `input2`, ... A source without a recorded result
/// yields an undefined input.
pub fn gather_node_inputs(
    graph: &WorkflowGraph,
    node_id: &str,
    results: &HashMap<NodeId, Value>,
) -> NodeInputs {
    // Non-finite positions sort as if unresolvable; `+ 0.0` folds -0 into 0
    let source_x = |source: &str| {
        graph
            .find_node(source)
            .map(|n| n.position.x)
            .filter(|x| x.is_finite())
            .unwrap_or(0.0)
            + 0.0
    };

    let mut incoming: Vec<(f64, &str)> = graph
        .incoming_edges(node_id)
        .map(|e| (source_x(&e.source), e.source.as_str()))
        .collect();
    incoming.sort_by(|a, b| a.0.total_cmp(&b.0));

    incoming
        .into_iter()
        .map(|(_, source)| results.get(source).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::types::GraphEdge;
    use serde_json::json;

    fn position_of(order: &[&str], id: &str) -> usize {
        order.iter().position(|n| *n == id).unwrap()
    }

    fn assert_topological(graph: &WorkflowGraph) {
        let sorted = sort_graph(graph);
        assert!(!sorted.has_cycle);
        let order = sorted.order_ids();
        assert_eq!(order.len(), graph.nodes.len());
        for edge in &graph.edges {
            assert!(
                position_of(&order, &edge.source) < position_of(&order, &edge.target),
                "{} should precede {} in {:?}",
                edge.source,
                edge.target,
                order
            );
        }
    }

    #[test]
    fn test_linear_order() {
        let graph = WorkflowBuilder::new()
            .add_node("c", "end", (200.0, 0.0))
            .add_node("b", "prompt", (100.0, 0.0))
            .add_node("a", "start", (0.0, 0.0))
            .add_edge("a", "b")
            .add_edge("b", "c")
            .build();

        let sorted = sort_graph(&graph);
        assert_eq!(sorted.order_ids(), vec!["a", "b", "c"]);
        assert!(sorted.cycle_nodes.is_empty());
    }

    #[test]
    fn test_diamond_and_fan_out() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "start", (0.0, 0.0))
            .add_node("b", "prompt", (100.0, 0.0))
            .add_node("c", "prompt", (100.0, 100.0))
            .add_node("d", "end", (200.0, 0.0))
            .add_node("e", "end", (200.0, 100.0))
            .add_edge("a", "b")
            .add_edge("a", "c")
            .add_edge("b", "d")
            .add_edge("c", "d")
            .add_edge("c", "e")
            .build();

        assert_topological(&graph);
    }

    #[test]
    fn test_disconnected_components_are_all_ordered() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "start", (0.0, 0.0))
            .add_node("b", "end", (100.0, 0.0))
            .add_node("x", "start", (0.0, 100.0))
            .add_node("y", "end", (100.0, 100.0))
            .add_edge("x", "y")
            .add_edge("a", "b")
            .build();

        assert_topological(&graph);
    }

    #[test]
    fn test_deterministic_tie_breaking() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "start", (0.0, 0.0))
            .add_node("b", "start", (0.0, 0.0))
            .add_node("c", "end", (0.0, 0.0))
            .add_edge("a", "c")
            .add_edge("b", "c")
            .build();

        let first = sort_graph(&graph).order_ids();
        let second = sort_graph(&graph).order_ids();
        assert_eq!(first, second);
        // Entry nodes are traversed in array order and prepended
        assert_eq!(first, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_two_node_cycle_reports_both_nodes() {
        let graph = WorkflowBuilder::new()
            .add_node("A", "prompt", (0.0, 0.0))
            .add_node("B", "prompt", (100.0, 0.0))
            .add_edge("A", "B")
            .add_edge("B", "A")
            .build();

        let sorted = sort_graph(&graph);
        assert!(sorted.has_cycle);
        assert!(sorted.cycle_nodes.contains(&"A".to_string()));
        assert!(sorted.cycle_nodes.contains(&"B".to_string()));
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "start", (0.0, 0.0))
            .add_node("b", "prompt", (100.0, 0.0))
            .add_edge("a", "b")
            .add_edge("b", "b")
            .build();

        let sorted = sort_graph(&graph);
        assert!(sorted.has_cycle);
        assert_eq!(sorted.cycle_nodes, vec!["b".to_string()]);
    }

    #[test]
    fn test_cycle_behind_entry_node() {
        let graph = WorkflowBuilder::new()
            .add_node("s", "start", (0.0, 0.0))
            .add_node("a", "prompt", (100.0, 0.0))
            .add_node("b", "prompt", (200.0, 0.0))
            .add_edge("s", "a")
            .add_edge("a", "b")
            .add_edge("b", "a")
            .build();

        assert!(sort_graph(&graph).has_cycle);
    }

    #[test]
    fn test_dangling_edges_are_ignored() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "start", (0.0, 0.0))
            .add_node("b", "end", (100.0, 0.0))
            .add_edge("a", "ghost")
            .add_edge("phantom", "b")
            .add_edge("a", "b")
            .build();

        let sorted = sort_graph(&graph);
        assert!(!sorted.has_cycle);
        assert_eq!(sorted.order_ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = WorkflowGraph::default();
        let sorted = sort_graph(&graph);
        assert!(sorted.order.is_empty());
        assert!(!sorted.has_cycle);
    }

    #[test]
    fn test_inputs_ordered_by_source_x() {
        let graph = WorkflowBuilder::new()
            .add_node("right", "start", (300.0, 0.0))
            .add_node("left", "start", (10.0, 0.0))
            .add_node("middle", "start", (150.0, 0.0))
            .add_node("target", "prompt", (500.0, 0.0))
            .add_edge("right", "target")
            .add_edge("left", "target")
            .add_edge("middle", "target")
            .build();

        let mut results = HashMap::new();
        results.insert("right".to_string(), json!("R"));
        results.insert("left".to_string(), json!("L"));
        results.insert("middle".to_string(), json!("M"));

        let inputs = gather_node_inputs(&graph, "target", &results);
        assert_eq!(inputs.get("input1"), Some(&json!("L")));
        assert_eq!(inputs.get("input2"), Some(&json!("M")));
        assert_eq!(inputs.get("input3"), Some(&json!("R")));
    }

    #[test]
    fn test_equal_x_keeps_edge_order_and_missing_results_are_undefined() {
        let graph = WorkflowBuilder::new()
            .add_node("first", "start", (0.0, 0.0))
            .add_node("second", "start", (0.0, 50.0))
            .add_node("target", "prompt", (100.0, 0.0))
            .add_edge("second", "target")
            .add_edge("first", "target")
            .add_edge("unknown", "target")
            .build();

        let mut results = HashMap::new();
        results.insert("first".to_string(), json!(1));

        let inputs = gather_node_inputs(&graph, "target", &results);
        assert_eq!(inputs.len(), 3);
        // "second" has no recorded result
        assert!(inputs.contains_key("input1"));
        assert_eq!(inputs.get("input1"), None);
        assert_eq!(inputs.get("input2"), Some(&json!(1)));
        assert_eq!(inputs.get("input3"), None);
    }

    #[test]
    fn test_non_finite_x_sorts_as_zero() {
        let mut builder = WorkflowBuilder::new().add_node("target", "end", (1000.0, 0.0));
        let mut results = HashMap::new();
        for i in 0..64 {
            let x = match i % 3 {
                0 => f64::NAN,
                1 => -(i as f64),
                _ => i as f64,
            };
            let id = format!("src{}", i);
            results.insert(id.clone(), json!(i));
            builder = builder
                .add_node(id.clone(), "start", (x, 0.0))
                .add_edge(id, "target");
        }
        let graph = builder.build();

        let inputs = gather_node_inputs(&graph, "target", &results);
        let order: Vec<i64> = inputs
            .iter()
            .map(|(_, v)| v.and_then(Value::as_i64).unwrap())
            .collect();

        let mut expected: Vec<(f64, i64)> = (0..64)
            .map(|i| match i % 3 {
                0 => (0.0, i),
                1 => (-(i as f64), i),
                _ => (i as f64, i),
            })
            .collect();
        expected.sort_by(|a, b| a.0.total_cmp(&b.0));
        let expected: Vec<i64> = expected.into_iter().map(|(_, i)| i).collect();

        assert_eq!(order, expected);
        // NaN sources tie at x = 0 and keep edge order
        let zero_x: Vec<i64> = order.iter().copied().filter(|i| i % 3 == 0).collect();
        assert_eq!(zero_x, (0..64).filter(|i| i % 3 == 0).collect::<Vec<i64>>());
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let count = 100_000;
        let nodes = (0..count)
            .map(|i| GraphNode::new(format!("n{}", i), "prompt", (i as f64, 0.0)))
            .collect();
        let edges = (1..count)
            .map(|i| GraphEdge::new(format!("e{}", i), format!("n{}", i - 1), format!("n{}", i)))
            .collect();
        let graph = WorkflowGraph::new(nodes, edges);

        let sorted = sort_graph(&graph);
        assert!(!sorted.has_cycle);
        assert_eq!(sorted.order.len(), count);
        assert_eq!(sorted.order[0].id, "n0");
        assert_eq!(sorted.order[count - 1].id, format!("n{}", count - 1));
    }
}
