//! Error types for the flow engine

use thiserror::Error;

use crate::expression::ExpressionError;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while ordering or executing a workflow
#[derive(Debug, Error)]
pub enum EngineError {
    /// The graph contains a directed cycle; nothing was executed
    #[error("Workflow contains a cycle involving nodes: {}", .nodes.join(", "))]
    CycleDetected { nodes: Vec<String> },

    /// The run was cancelled at a node boundary
    #[error("Workflow execution aborted")]
    Aborted,

    /// A node failed; the run stops at this node
    #[error("Node '{node_id}' failed: {cause}")]
    NodeFailed { node_id: String, cause: String },

    /// A node behavior raised an error
    #[error("{0}")]
    ExecutionFailed(String),

    /// No executor is registered for the node's type
    #[error("Node type '{0}' is not implemented")]
    UnsupportedNodeType(String),

    /// Restricted expression evaluation failed inside a node behavior
    #[error("{context}: {source}")]
    Expression {
        context: &'static str,
        #[source]
        source: ExpressionError,
    },

    /// A node exceeded the configured per-node timeout
    #[error("Node '{node_id}' timed out after {timeout_ms}ms")]
    Timeout { node_id: String, timeout_ms: u64 },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Create an execution failed error with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Wrap an expression error with the node behavior that raised it
    pub fn expression(context: &'static str, source: ExpressionError) -> Self {
        Self::Expression { context, source }
    }

    /// Wrap a node-level failure with the id of the node that raised it
    pub fn node_failed(node_id: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::NodeFailed {
            node_id: node_id.into(),
            cause: cause.to_string(),
        }
    }

    /// Whether this error came from cancellation rather than a failure
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<ExpressionError> for EngineError {
    fn from(source: ExpressionError) -> Self {
        Self::expression("Expression evaluation error", source)
    }
}
