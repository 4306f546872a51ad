//! Core types for workflow graphs
//!
//! These types define the structure of workflow graphs (nodes, edges and
//! their layout), the caller-supplied execution context, and the result of
//! a run. All of them are read-only to the engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Layout position of a node in the editor
///
/// Only `x` carries meaning for the engine: it orders a node's inputs
/// left to right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A directed data dependency from `source`'s output to one of `target`'s inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node ID (need not resolve to an existing node)
    pub source: NodeId,
    /// Target node ID (need not resolve to an existing node)
    pub target: NodeId,
}

impl GraphEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Node type tag; selects validation rules and execution behavior
    #[serde(rename = "type")]
    pub node_type: String,
    /// Position in the editor
    #[serde(default)]
    pub position: Position,
    /// Custom data/configuration for this instance
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl GraphNode {
    /// Create a node with empty data
    pub fn new(
        id: impl Into<String>,
        node_type: impl Into<String>,
        position: impl Into<Position>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: position.into(),
            data: Map::new(),
        }
    }

    /// Look up a data field as a string with surrounding whitespace removed.
    ///
    /// Returns `None` when the field is absent, not a string, or blank.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A complete workflow graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraph {
    /// Nodes in the graph, in caller order
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    /// Edges connecting nodes, in insertion order
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl WorkflowGraph {
    /// Create a new graph from nodes and edges
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Get edges coming into a node
    pub fn incoming_edges<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Get edges going out of a node
    pub fn outgoing_edges<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Get the IDs of nodes that this node depends on (upstream nodes)
    pub fn get_dependencies(&self, node_id: &str) -> Vec<NodeId> {
        self.incoming_edges(node_id)
            .map(|e| e.source.clone())
            .collect()
    }

    /// Get the IDs of nodes that depend on this node (downstream nodes)
    pub fn get_dependents(&self, node_id: &str) -> Vec<NodeId> {
        self.outgoing_edges(node_id)
            .map(|e| e.target.clone())
            .collect()
    }
}

/// Caller-supplied, read-only state for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    /// Provider name -> secret
    #[serde(default)]
    pub credentials: HashMap<String, String>,
    /// Free-form variables (`initialInput` seeds `start` nodes)
    #[serde(default)]
    pub variables: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential for a provider
    pub fn with_credential(
        mut self,
        provider: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.credentials.insert(provider.into(), secret.into());
        self
    }

    /// Set a context variable
    pub fn with_variable(mut self, key: impl Into<String>, value: Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    /// The value `start` nodes fall back to when they have no input
    pub fn initial_input(&self) -> Option<&Value> {
        self.variables.get("initialInput")
    }
}

/// Positional inputs gathered for one node: `input1`, `input2`, ...
///
/// An entry whose value is `None` is bound but undefined: its source node
/// has no recorded result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInputs {
    entries: Vec<(String, Option<Value>)>,
}

impl NodeInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next positional input; its key is `input{len + 1}`
    pub fn push(&mut self, value: Option<Value>) {
        let key = format!("input{}", self.entries.len() + 1);
        self.entries.push((key, value));
    }

    /// Get a defined input value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Whether a key is bound (defined or not)
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` in positional order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

impl FromIterator<Option<Value>> for NodeInputs {
    fn from_iter<I: IntoIterator<Item = Option<Value>>>(iter: I) -> Self {
        let mut inputs = NodeInputs::new();
        for value in iter {
            inputs.push(value);
        }
        inputs
    }
}

/// Outcome of a workflow run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    /// Node id -> output; empty when the run failed
    pub results: HashMap<NodeId, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn succeeded(results: HashMap<NodeId, Value>) -> Self {
        Self {
            success: true,
            results,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            results: HashMap::new(),
            error: Some(error.into()),
        }
    }
}
