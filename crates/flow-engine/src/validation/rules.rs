//! Individual validation rules
//!
//! Each rule appends its findings to the shared issue list in node order.

use std::collections::{HashMap, HashSet};

use super::security::is_url_safe;
use super::ValidationIssue;
use crate::types::{GraphNode, NodeId, WorkflowGraph};

pub(super) fn check_cycles(cycles: &[Vec<NodeId>], issues: &mut Vec<ValidationIssue>) {
    for cycle in cycles {
        let mut issue = ValidationIssue::error(format!(
            "Workflow contains a cycle: {}",
            cycle.join(" -> ")
        ))
        .with_suggestion(
            "Remove one of the connections in the loop so data flows in one direction",
        );

        if let Some(first) = cycle.first() {
            issue = issue.with_node(first.clone());
        }
        issues.push(issue);
    }
}

pub(super) fn check_orphans(graph: &WorkflowGraph, issues: &mut Vec<ValidationIssue>) {
    if graph.nodes.len() <= 1 {
        return;
    }

    let connected: HashSet<&str> = graph
        .edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .collect();

    for node in &graph.nodes {
        if node.node_type != "start" && !connected.contains(node.id.as_str()) {
            issues.push(
                ValidationIssue::warning(format!("Node '{}' is not connected to anything", node.id))
                    .with_node(&node.id)
                    .with_suggestion("Connect this node to the workflow or remove it"),
            );
        }
    }
}

pub(super) fn check_start_node(graph: &WorkflowGraph, issues: &mut Vec<ValidationIssue>) {
    if graph.is_empty() || graph.nodes.iter().any(|n| n.node_type == "start") {
        return;
    }

    issues.push(
        ValidationIssue::warning("Workflow has no start node")
            .with_suggestion("Add a start node to define where the workflow begins"),
    );
}

pub(super) fn check_end_nodes(graph: &WorkflowGraph, issues: &mut Vec<ValidationIssue>) {
    if graph.nodes.len() <= 1 {
        return;
    }

    let targets = edge_targets(graph);
    for node in graph.nodes.iter().filter(|n| n.node_type == "end") {
        if !targets.contains(node.id.as_str()) {
            issues.push(
                ValidationIssue::warning(format!("End node '{}' is never reached", node.id))
                    .with_node(&node.id)
                    .with_suggestion("Connect an upstream node to this end node"),
            );
        }
    }
}

pub(super) fn check_node_config(graph: &WorkflowGraph, issues: &mut Vec<ValidationIssue>) {
    for node in &graph.nodes {
        match node.node_type.as_str() {
            "textModel" => {
                if node.data_str("model").is_none() {
                    issues.push(
                        ValidationIssue::error("Text model node has no model selected")
                            .with_node(&node.id)
                            .with_field("model")
                            .with_suggestion("Choose a model such as 'openai/gpt-4o'"),
                    );
                }
            }
            "httpRequest" => check_http_request(node, issues),
            "prompt" => {
                if node.data_str("content").is_none() && node.data_str("prompt").is_none() {
                    issues.push(
                        ValidationIssue::warning("Prompt node has an empty template")
                            .with_node(&node.id)
                            .with_field("content")
                            .with_suggestion(
                                "Write the prompt text, using $input1 for upstream values",
                            ),
                    );
                }
            }
            "conditional" => {
                if node.data_str("condition").is_none() {
                    issues.push(
                        ValidationIssue::error("Conditional node has no condition")
                            .with_node(&node.id)
                            .with_field("condition")
                            .with_suggestion("Add an expression such as 'input1.length > 0'"),
                    );
                }
            }
            _ => {}
        }
    }
}

fn check_http_request(node: &GraphNode, issues: &mut Vec<ValidationIssue>) {
    match node.data_str("url") {
        None => issues.push(
            ValidationIssue::error("HTTP request node has no URL")
                .with_node(&node.id)
                .with_field("url")
                .with_suggestion("Enter the URL to request"),
        ),
        Some(url) if !is_url_safe(url) => issues.push(
            ValidationIssue::error(format!("URL '{}' targets a blocked or internal address", url))
                .with_node(&node.id)
                .with_field("url")
                .with_suggestion("Use a public http or https URL"),
        ),
        Some(_) => {}
    }
}

/// Flags nodes that are never an edge target (other than `end` nodes).
///
/// Note this describes nodes without a consumed input, not nodes whose
/// output is unconsumed; kept as-is pending product review.
pub(super) fn check_unused_outputs(graph: &WorkflowGraph, issues: &mut Vec<ValidationIssue>) {
    if graph.nodes.len() <= 1 {
        return;
    }

    let targets = edge_targets(graph);
    for node in &graph.nodes {
        if node.node_type != "end" && !targets.contains(node.id.as_str()) {
            issues.push(
                ValidationIssue::info(format!("Output of node '{}' is not used", node.id))
                    .with_node(&node.id)
                    .with_suggestion("Connect this node to a downstream node"),
            );
        }
    }
}

pub(super) fn check_long_chains(
    graph: &WorkflowGraph,
    threshold: usize,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut chains = ChainLengths::new(graph);
    for node in &graph.nodes {
        let length = chains.length_of(&node.id);
        if length > threshold {
            issues.push(
                ValidationIssue::info(format!(
                    "Node '{}' sits at the end of a long dependency chain ({} steps)",
                    node.id, length
                ))
                .with_node(&node.id)
                .with_suggestion("Consider splitting the workflow into smaller stages"),
            );
        }
    }
}

fn edge_targets(graph: &WorkflowGraph) -> HashSet<&str> {
    graph.edges.iter().map(|e| e.target.as_str()).collect()
}

/// Memoized longest path (in nodes) ending at each node
struct ChainLengths<'a> {
    incoming: HashMap<&'a str, Vec<&'a str>>,
    memo: HashMap<&'a str, usize>,
    in_progress: HashSet<&'a str>,
}

impl<'a> ChainLengths<'a> {
    fn new(graph: &'a WorkflowGraph) -> Self {
        let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &graph.edges {
            incoming
                .entry(edge.target.as_str())
                .or_default()
                .push(edge.source.as_str());
        }
        Self {
            incoming,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Chain length of `root`, walking sources with an explicit stack
    fn length_of(&mut self, root: &'a str) -> usize {
        if let Some(&length) = self.memo.get(root) {
            return length;
        }

        // Frame: node, index of its next source, longest source chain so far
        let mut frames: Vec<(&'a str, usize, usize)> = vec![(root, 0, 0)];
        self.in_progress.insert(root);

        while let Some(frame) = frames.last_mut() {
            let (node, cursor, longest) = *frame;
            let next = self
                .incoming
                .get(node)
                .and_then(|sources| sources.get(cursor))
                .copied();

            match next {
                Some(source) => {
                    frame.1 += 1;
                    if let Some(&length) = self.memo.get(source) {
                        frame.2 = longest.max(length);
                    } else if self.in_progress.contains(source) {
                        // Re-entering a node means a loop through ids outside the node list
                        frame.2 = longest.max(1);
                    } else {
                        self.in_progress.insert(source);
                        frames.push((source, 0, 0));
                    }
                }
                None => {
                    frames.pop();
                    let length = 1 + longest;
                    self.in_progress.remove(node);
                    self.memo.insert(node, length);
                    if let Some(parent) = frames.last_mut() {
                        parent.2 = parent.2.max(length);
                    }
                }
            }
        }

        self.memo.get(root).copied().unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::validation::Severity;
    use serde_json::json;

    fn run(
        rule: fn(&WorkflowGraph, &mut Vec<ValidationIssue>),
        graph: &WorkflowGraph,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        rule(graph, &mut issues);
        issues
    }

    #[test]
    fn test_orphan_excludes_start_nodes() {
        let graph = WorkflowBuilder::new()
            .add_node("s", "start", (0.0, 0.0))
            .add_node("p", "prompt", (1.0, 0.0))
            .build();

        let issues = run(check_orphans, &graph);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].node_id.as_deref(), Some("p"));
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_missing_config_fields() {
        let graph = WorkflowBuilder::new()
            .add_node("t", "textModel", (0.0, 0.0))
            .with_data(json!({"model": "  "}))
            .add_node("h", "httpRequest", (1.0, 0.0))
            .add_node("p", "prompt", (2.0, 0.0))
            .with_data(json!({"content": ""}))
            .add_node("c", "conditional", (3.0, 0.0))
            .build();

        let issues = run(check_node_config, &graph);
        let fields: Vec<(Severity, Option<&str>)> = issues
            .iter()
            .map(|i| (i.severity, i.field.as_deref()))
            .collect();

        assert_eq!(
            fields,
            vec![
                (Severity::Error, Some("model")),
                (Severity::Error, Some("url")),
                (Severity::Warning, Some("content")),
                (Severity::Error, Some("condition")),
            ]
        );
    }

    #[test]
    fn test_prompt_field_satisfies_template_check() {
        let graph = WorkflowBuilder::new()
            .add_node("p", "prompt", (0.0, 0.0))
            .with_data(json!({"prompt": "Hello"}))
            .build();

        assert!(run(check_node_config, &graph).is_empty());
    }

    #[test]
    fn test_public_url_accepted() {
        let graph = WorkflowBuilder::new()
            .add_node("h", "httpRequest", (0.0, 0.0))
            .with_data(json!({"url": "https://api.example.com/v1"}))
            .build();

        assert!(run(check_node_config, &graph).is_empty());
    }

    #[test]
    fn test_unused_output_is_literal() {
        // a -> b, c standalone end: a and c are never targets, but end is exempt
        let graph = WorkflowBuilder::new()
            .add_node("a", "start", (0.0, 0.0))
            .add_node("b", "prompt", (1.0, 0.0))
            .add_node("c", "end", (2.0, 0.0))
            .add_edge("a", "b")
            .build();

        let ids: Vec<_> = run(check_unused_outputs, &graph)
            .into_iter()
            .filter_map(|i| i.node_id)
            .collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_chain_length_takes_longest_branch() {
        let graph = WorkflowBuilder::new()
            .add_node("a", "start", (0.0, 0.0))
            .add_node("b", "prompt", (1.0, 0.0))
            .add_node("c", "prompt", (2.0, 0.0))
            .add_node("d", "end", (3.0, 0.0))
            .add_edge("a", "b")
            .add_edge("b", "c")
            .add_edge("c", "d")
            .add_edge("a", "d")
            .build();

        let mut chains = ChainLengths::new(&graph);
        assert_eq!(chains.length_of("a"), 1);
        assert_eq!(chains.length_of("d"), 4);

        let mut issues = Vec::new();
        check_long_chains(&graph, 3, &mut issues);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].node_id.as_deref(), Some("d"));
    }

    #[test]
    fn test_chain_length_terminates_on_phantom_loop() {
        // x and y are not nodes, so cycle detection never sees their loop
        let graph = WorkflowBuilder::new()
            .add_node("n", "prompt", (0.0, 0.0))
            .add_edge("x", "y")
            .add_edge("y", "x")
            .add_edge("y", "n")
            .build();

        let mut chains = ChainLengths::new(&graph);
        assert!(chains.length_of("n") >= 2);
    }
}
