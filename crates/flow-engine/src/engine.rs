//! Sequential workflow execution
//!
//! The engine orders the graph, then runs each node strictly one after
//! another in that order:
//!
//! ```text
//! idle -> running -> completed
//!                 -> failed   (cycle, node error, timeout)
//!                 -> aborted  (cancellation observed at a node boundary)
//! ```
//!
//! Cancellation is cooperative. The token is polled before each node
//! starts and never interrupts a node already in flight. Every failure
//! exit is converted into an unsuccessful [`ExecutionResult`] plus a
//! terminal `error` update, so `execute_workflow` itself never fails.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::{EventSink, ExecutionUpdate, NullEventSink};
use crate::registry::NodeRegistry;
use crate::sorter::{gather_node_inputs, sort_graph};
use crate::types::{
    ExecutionContext, ExecutionResult, GraphNode, NodeId, NodeInputs, WorkflowGraph,
};

/// Runs workflow graphs against a node registry
#[derive(Clone)]
pub struct ExecutionEngine {
    registry: Arc<NodeRegistry>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(registry: NodeRegistry) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: NodeRegistry, config: EngineConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute every node of `graph` in dependency order
    ///
    /// Updates are delivered to `sink` in emission order; without one they
    /// go to a [`NullEventSink`]. Cancelling `cancel` stops the run before
    /// the next node starts.
    pub async fn execute_workflow(
        &self,
        graph: &WorkflowGraph,
        context: &ExecutionContext,
        sink: Option<&dyn EventSink>,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let run = Run {
            execution_id: Uuid::new_v4().to_string(),
            sink: sink.unwrap_or(&NullEventSink),
        };

        log::info!(
            "Workflow execution {} started ({} nodes, {} edges)",
            run.execution_id,
            graph.nodes.len(),
            graph.edges.len()
        );

        match self.run_nodes(&run, graph, context, cancel).await {
            Ok(results) => {
                log::info!(
                    "Workflow execution {} completed ({} results)",
                    run.execution_id,
                    results.len()
                );
                run.emit(ExecutionUpdate::Complete);
                ExecutionResult::succeeded(results)
            }
            Err(e) => {
                let message = e.to_string();
                if e.is_abort() {
                    log::info!("Workflow execution {} aborted", run.execution_id);
                } else {
                    log::info!("Workflow execution {} failed: {}", run.execution_id, message);
                }
                run.emit(ExecutionUpdate::error(message.clone()));
                ExecutionResult::failed(message)
            }
        }
    }

    async fn run_nodes(
        &self,
        run: &Run<'_>,
        graph: &WorkflowGraph,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<HashMap<NodeId, Value>> {
        let sorted = sort_graph(graph);
        if sorted.has_cycle {
            return Err(EngineError::CycleDetected {
                nodes: sorted.cycle_nodes,
            });
        }

        let mut results: HashMap<NodeId, Value> = HashMap::with_capacity(sorted.order.len());

        for node in sorted.order {
            if cancel.is_cancelled() {
                return Err(EngineError::Aborted);
            }

            run.emit(ExecutionUpdate::node_start(&node.id));
            let inputs = gather_node_inputs(graph, &node.id, &results);

            log::debug!(
                "Execution {}: running node '{}' ({}) with {} inputs",
                run.execution_id,
                node.id,
                node.node_type,
                inputs.len()
            );

            match self.execute_node(node, &inputs, context).await {
                Ok(output) => {
                    run.emit(ExecutionUpdate::node_complete(&node.id, output.clone()));
                    results.insert(node.id.clone(), output);
                }
                Err(e) => {
                    let cause = e.to_string();
                    log::debug!(
                        "Execution {}: node '{}' failed: {}",
                        run.execution_id,
                        node.id,
                        cause
                    );
                    run.emit(ExecutionUpdate::node_error(&node.id, cause.clone()));
                    return Err(EngineError::node_failed(&node.id, cause));
                }
            }
        }

        Ok(results)
    }

    async fn execute_node(
        &self,
        node: &GraphNode,
        inputs: &NodeInputs,
        context: &ExecutionContext,
    ) -> Result<Value> {
        let pending = self.registry.execute(node, inputs, context);

        match self.config.node_timeout() {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .unwrap_or_else(|_| {
                    Err(EngineError::Timeout {
                        node_id: node.id.clone(),
                        timeout_ms: limit.as_millis() as u64,
                    })
                }),
            None => pending.await,
        }
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(NodeRegistry::with_core_nodes())
    }
}

/// Execute a workflow with only the built-in node types registered
pub async fn execute_workflow(
    graph: &WorkflowGraph,
    context: &ExecutionContext,
    sink: Option<&dyn EventSink>,
    cancel: &CancellationToken,
) -> ExecutionResult {
    ExecutionEngine::default()
        .execute_workflow(graph, context, sink, cancel)
        .await
}

/// Per-call state: the execution id used in logs and the update sink
struct Run<'s> {
    execution_id: String,
    sink: &'s dyn EventSink,
}

impl Run<'_> {
    fn emit(&self, update: ExecutionUpdate) {
        if let Err(e) = self.sink.send(update) {
            log::warn!("Execution {}: failed to deliver update: {}", self.execution_id, e);
        }
    }
}
