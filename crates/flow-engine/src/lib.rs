//! Flow Engine - Dependency-ordered workflow execution and validation
//!
//! This crate runs directed graphs of heterogeneous nodes connected by
//! data-dependency edges. It provides:
//!
//! - Deterministic topological ordering with cycle detection
//! - Sequential execution with streaming progress and cooperative cancellation
//! - Type-keyed node dispatch that callers extend by registration
//! - Structural, configuration and SSRF validation reduced to a score and grade
//!
//! # Architecture
//!
//! - `sorter`: reverse-postorder ordering and positional input gathering
//! - `registry`: `NodeExecutor` trait and the type-keyed `NodeRegistry`
//! - `engine`: the `ExecutionEngine` run loop
//! - `validation`: issue collection, cycle enumeration, scoring
//! - `expression`: restricted evaluator backing the `javascript` and
//!   `conditional` node types (not a general scripting runtime)
//!
//! # Example
//!
//! ```
//! use flow_engine::{execute_workflow, CancellationToken, ExecutionContext, WorkflowBuilder};
//! use serde_json::json;
//!
//! let graph = WorkflowBuilder::new()
//!     .add_node("s", "start", (0.0, 0.0))
//!     .add_node("j", "javascript", (100.0, 0.0))
//!     .with_data(json!({"code": "return input1 + 1"}))
//!     .add_edge("s", "j")
//!     .build();
//!
//! let context = ExecutionContext::new().with_variable("initialInput", json!(5));
//! let cancel = CancellationToken::new();
//! let result = tokio_test::block_on(execute_workflow(&graph, &context, None, &cancel));
//!
//! assert!(result.success);
//! assert_eq!(result.results["j"], json!(6));
//! ```

pub mod builder;
pub mod config;
pub mod core_executor;
pub mod engine;
pub mod error;
pub mod events;
pub mod expression;
pub mod registry;
pub mod sorter;
pub mod types;
pub mod validation;

// Re-export key types
pub use builder::WorkflowBuilder;
pub use config::{EngineConfig, ValidationConfig};
pub use engine::{execute_workflow, ExecutionEngine};
pub use error::{EngineError, Result};
pub use events::{
    ChannelEventSink, EventError, EventSink, ExecutionUpdate, FnEventSink, NullEventSink,
    VecEventSink,
};
pub use expression::ExpressionError;
pub use registry::{NodeExecutor, NodeRegistry};
pub use sorter::{gather_node_inputs, sort_graph, SortResult};
pub use types::{
    EdgeId, ExecutionContext, ExecutionResult, GraphEdge, GraphNode, NodeId, NodeInputs, Position,
    WorkflowGraph,
};
pub use validation::{
    detect_cycles, grade, is_url_safe, score, validate, validate_credentials, Grade, Severity,
    ValidationIssue, ValidationReport,
};

// Re-export the cancellation token callers pass into `execute_workflow`
pub use tokio_util::sync::CancellationToken;
