//! Graph validation and scoring
//!
//! Validation never fails: it collects [`ValidationIssue`]s for structural,
//! configuration and security findings and leaves the decision to the
//! caller. Issues reduce to a 0-100 score and a letter grade via
//! [`score`] and [`grade`], or all at once via [`ValidationReport`].
//!
//! ```
//! use flow_engine::validation::{self, Grade, Severity};
//! use flow_engine::WorkflowBuilder;
//!
//! let graph = WorkflowBuilder::new()
//!     .add_node("s", "start", (0.0, 0.0))
//!     .add_node("t", "textModel", (100.0, 0.0))
//!     .add_edge("s", "t")
//!     .build();
//!
//! let issues = validation::validate(&graph);
//! let errors: Vec<_> = issues.iter().filter(|i| i.severity == Severity::Error).collect();
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors[0].field.as_deref(), Some("model"));
//! assert_eq!(validation::grade(validation::score(&issues)), Grade::F);
//! ```

mod credentials;
mod cycles;
mod rules;
mod scoring;
mod security;

use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;
use crate::types::WorkflowGraph;

pub use credentials::validate_credentials;
pub use cycles::detect_cycles;
pub use scoring::{grade, score, Grade, ValidationReport};
pub use security::is_url_safe;

/// How serious a validation finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks execution
    Error,
    Warning,
    Info,
}

/// A single finding about a graph, optionally scoped to one node and field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            node_id: None,
            field: None,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Run every rule over `graph` with the default configuration
pub fn validate(graph: &WorkflowGraph) -> Vec<ValidationIssue> {
    validate_with_config(graph, &ValidationConfig::default())
}

/// Run every rule over `graph`
///
/// Rules are independent and all evaluated; issues are grouped by rule in
/// a fixed order, and by node order within a rule.
pub fn validate_with_config(
    graph: &WorkflowGraph,
    config: &ValidationConfig,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let cycles = detect_cycles(graph);
    rules::check_cycles(&cycles, &mut issues);
    rules::check_orphans(graph, &mut issues);
    rules::check_start_node(graph, &mut issues);
    rules::check_end_nodes(graph, &mut issues);
    rules::check_node_config(graph, &mut issues);
    rules::check_unused_outputs(graph, &mut issues);
    if cycles.is_empty() {
        rules::check_long_chains(graph, config.long_chain_threshold, &mut issues);
    }

    log::debug!(
        "Validated graph ({} nodes, {} edges): {} issues",
        graph.nodes.len(),
        graph.edges.len(),
        issues.len()
    );

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use serde_json::json;

    #[test]
    fn test_clean_graph_has_only_info() {
        let graph = WorkflowBuilder::new()
            .add_node("s", "start", (0.0, 0.0))
            .add_node("p", "prompt", (1.0, 0.0))
            .with_data(json!({"content": "Hi $input1"}))
            .add_node("e", "end", (2.0, 0.0))
            .add_edge("s", "p")
            .add_edge("p", "e")
            .build();

        let issues = validate(&graph);
        // The start node is never an edge target, so it is reported as unused
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
        assert_eq!(issues[0].node_id.as_deref(), Some("s"));
        assert_eq!(score(&issues), 100);
    }

    #[test]
    fn test_empty_graph_has_no_issues() {
        assert!(validate(&WorkflowGraph::default()).is_empty());
    }

    #[test]
    fn test_single_node_skips_structural_rules() {
        let graph = WorkflowBuilder::new().add_node("e", "end", (0.0, 0.0)).build();
        let issues = validate(&graph);

        // Only the missing start node; orphan/unreachable/unused rules need 2+ nodes
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].node_id, None);
    }

    #[test]
    fn test_rule_order_is_stable() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "textModel", (0.0, 0.0))
            .add_node("b", "end", (1.0, 0.0))
            .add_node("c", "httpRequest", (2.0, 0.0))
            .with_data(json!({"url": "http://localhost:8080"}))
            .add_edge("a", "c")
            .build();

        let first = validate(&graph);
        let second = validate(&graph);
        assert_eq!(first, second);

        let severities: Vec<(Severity, Option<&str>)> = first
            .iter()
            .map(|i| (i.severity, i.node_id.as_deref()))
            .collect();
        assert_eq!(
            severities,
            vec![
                (Severity::Warning, Some("b")),  // orphan
                (Severity::Warning, None),       // no start
                (Severity::Warning, Some("b")),  // unreachable end
                (Severity::Error, Some("a")),    // missing model
                (Severity::Error, Some("c")),    // unsafe url
                (Severity::Info, Some("a")),     // unused output
            ]
        );
    }

    #[test]
    fn test_cycle_disables_long_chain_rule() {
        let mut builder = WorkflowBuilder::new();
        for i in 0..11 {
            builder = builder.add_node(format!("n{}", i), "prompt", (i as f64, 0.0));
        }
        for i in 0..10 {
            builder = builder.add_edge(format!("n{}", i), format!("n{}", i + 1));
        }
        let acyclic = builder.clone().build();
        let cyclic = builder.add_edge("n10", "n0").build();

        let chain_issues = |issues: &[ValidationIssue]| {
            issues.iter().filter(|i| i.message.contains("long dependency chain")).count()
        };
        assert_eq!(chain_issues(&validate(&acyclic)), 1);
        assert_eq!(chain_issues(&validate(&cyclic)), 0);

        let config = ValidationConfig { long_chain_threshold: 3 };
        assert_eq!(chain_issues(&validate_with_config(&acyclic, &config)), 8);
    }

    #[test]
    fn test_issue_wire_format() {
        let issue = ValidationIssue::error("Missing model")
            .with_node("t")
            .with_field("model");

        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(
            value,
            json!({
                "severity": "error",
                "nodeId": "t",
                "field": "model",
                "message": "Missing model"
            })
        );
    }

    #[test]
    fn test_long_chain_graph_validates() {
        use crate::types::{GraphEdge, GraphNode};

        let count = 100_000;
        let nodes = (0..count)
            .map(|i| {
                let node_type = match i {
                    0 => "start",
                    i if i == count - 1 => "end",
                    _ => "javascript",
                };
                GraphNode::new(format!("n{}", i), node_type, (i as f64, 0.0))
            })
            .collect();
        let edges = (1..count)
            .map(|i| GraphEdge::new(format!("e{}", i), format!("n{}", i - 1), format!("n{}", i)))
            .collect();
        let graph = WorkflowGraph::new(nodes, edges);

        let report = ValidationReport::from_issues(validate(&graph));
        assert_eq!(report.error_count, 0);
        assert_eq!(report.warning_count, 0);
        // Every node past the tenth plus the unused start node
        assert_eq!(report.info_count, count - 10 + 1);
    }
}
