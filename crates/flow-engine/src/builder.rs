//! Fluent builder for workflow graphs
//!
//! Provides a fluent API for constructing graphs programmatically.

use serde_json::Value;

use crate::types::{GraphEdge, GraphNode, WorkflowGraph};

/// Fluent builder for constructing workflow graphs
///
/// # Example
///
/// ```
/// use flow_engine::WorkflowBuilder;
///
/// let graph = WorkflowBuilder::new()
///     .add_node("start-1", "start", (0.0, 0.0))
///     .add_node("prompt-1", "prompt", (200.0, 0.0))
///     .with_data(serde_json::json!({"content": "Summarize: $input1"}))
///     .add_edge("start-1", "prompt-1")
///     .build();
///
/// assert_eq!(graph.nodes.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkflowBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    edge_counter: usize,
}

impl WorkflowBuilder {
    /// Create a new workflow builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph
    pub fn add_node(
        mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        position: (f64, f64),
    ) -> Self {
        self.nodes.push(GraphNode::new(id, node_type, position));
        self
    }

    /// Set data on the most recently added node
    ///
    /// Must be called immediately after `add_node`. Non-object values are
    /// ignored since node data is always a mapping.
    pub fn with_data(mut self, data: Value) -> Self {
        if let (Some(node), Value::Object(map)) = (self.nodes.last_mut(), data) {
            node.data = map;
        }
        self
    }

    /// Add an edge between two nodes (auto-generates edge ID)
    pub fn add_edge(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.edge_counter += 1;
        let id = format!("edge-{}", self.edge_counter);
        self.edges.push(GraphEdge::new(id, source, target));
        self
    }

    /// Add an edge with an explicit ID
    pub fn add_edge_with_id(
        mut self,
        edge_id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.edges.push(GraphEdge::new(edge_id, source, target));
        self
    }

    /// Build the graph without validation
    pub fn build(self) -> WorkflowGraph {
        WorkflowGraph::new(self.nodes, self.edges)
    }
}
