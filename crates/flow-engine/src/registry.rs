//! Node type registry for dynamic node resolution
//!
//! This module provides a registry that maps node type strings to
//! executors. Built-in behaviors are ordinary entries; downstream
//! consumers extend (or override) dispatch by registering more entries,
//! never by subclassing the engine.
//!
//! # Usage
//!
//! ```
//! use flow_engine::{NodeRegistry, Result};
//! use serde_json::json;
//!
//! let mut registry = NodeRegistry::with_core_nodes();
//! registry.register_sync("upper", |_node, inputs, _ctx| -> Result<serde_json::Value> {
//!     let text = inputs.get("input1").and_then(|v| v.as_str()).unwrap_or("");
//!     Ok(json!(text.to_uppercase()))
//! });
//! assert!(registry.has_node_type("upper"));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::types::{ExecutionContext, GraphNode, NodeInputs};

/// Per-node-type executor
///
/// A `NodeExecutor` handles exactly one node type. It receives the node
/// (for its `data`), the gathered positional inputs, and the read-only
/// run context, and produces the node's single output value.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(
        &self,
        node: &GraphNode,
        inputs: &NodeInputs,
        context: &ExecutionContext,
    ) -> Result<Value>;
}

type BoxedFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

type BoxedCallback =
    Box<dyn Fn(GraphNode, NodeInputs, ExecutionContext) -> BoxedFuture + Send + Sync>;

type SyncCallback =
    Box<dyn Fn(&GraphNode, &NodeInputs, &ExecutionContext) -> Result<Value> + Send + Sync>;

/// Async callback-based NodeExecutor
///
/// Wraps an async closure as a NodeExecutor. The closure receives owned
/// copies so the returned future can be `'static`.
pub struct CallbackNodeExecutor {
    callback: BoxedCallback,
}

#[async_trait]
impl NodeExecutor for CallbackNodeExecutor {
    async fn execute(
        &self,
        node: &GraphNode,
        inputs: &NodeInputs,
        context: &ExecutionContext,
    ) -> Result<Value> {
        (self.callback)(node.clone(), inputs.clone(), context.clone()).await
    }
}

/// Synchronous callback-based NodeExecutor
///
/// Wraps a synchronous closure for behaviors that never suspend.
pub struct SyncCallbackNodeExecutor {
    callback: SyncCallback,
}

impl SyncCallbackNodeExecutor {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&GraphNode, &NodeInputs, &ExecutionContext) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl NodeExecutor for SyncCallbackNodeExecutor {
    async fn execute(
        &self,
        node: &GraphNode,
        inputs: &NodeInputs,
        context: &ExecutionContext,
    ) -> Result<Value> {
        (self.callback)(node, inputs, context)
    }
}

/// Registry of node types and their executors
///
/// # Composability
///
/// Registries can be composed by merging:
/// ```ignore
/// let mut registry = NodeRegistry::with_core_nodes();
/// registry.merge(plugin_registry); // Plugin entries win on conflict
/// ```
#[derive(Clone)]
pub struct NodeRegistry {
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with the built-in node types
    /// (`start`, `end`, `prompt`, `javascript`, `conditional`)
    pub fn with_core_nodes() -> Self {
        let mut registry = Self::new();
        crate::core_executor::register_core_nodes(&mut registry);
        registry
    }

    /// Register an executor for a node type, replacing any previous entry
    pub fn register(&mut self, node_type: impl Into<String>, executor: Arc<dyn NodeExecutor>) {
        self.executors.insert(node_type.into(), executor);
    }

    /// Register a node type using an async callback function
    pub fn register_fn<F, Fut>(&mut self, node_type: impl Into<String>, callback: F)
    where
        F: Fn(GraphNode, NodeInputs, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let executor = CallbackNodeExecutor {
            callback: Box::new(move |node, inputs, context| {
                Box::pin(callback(node, inputs, context))
            }),
        };
        self.register(node_type, Arc::new(executor));
    }

    /// Register a node type using a synchronous callback function
    pub fn register_sync<F>(&mut self, node_type: impl Into<String>, callback: F)
    where
        F: Fn(&GraphNode, &NodeInputs, &ExecutionContext) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(node_type, Arc::new(SyncCallbackNodeExecutor::new(callback)));
    }

    /// Get the executor for a node type
    pub fn get_executor(&self, node_type: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.get(node_type).cloned()
    }

    /// Check if a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.executors.contains_key(node_type)
    }

    /// List all registered node type strings, sorted
    pub fn node_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.executors.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` if they share the same node type.
    pub fn merge(&mut self, other: NodeRegistry) {
        self.executors.extend(other.executors);
    }

    /// Dispatch a node to the executor registered for its type
    pub async fn execute(
        &self,
        node: &GraphNode,
        inputs: &NodeInputs,
        context: &ExecutionContext,
    ) -> Result<Value> {
        let executor = self
            .get_executor(&node.node_type)
            .ok_or_else(|| EngineError::UnsupportedNodeType(node.node_type.clone()))?;

        executor.execute(node, inputs, context).await
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
