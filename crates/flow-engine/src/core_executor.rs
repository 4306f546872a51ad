//! Built-in node behaviors.
//!
//! The five host-independent node types (`start`, `end`, `prompt`,
//! `javascript`, `conditional`) are plain functions registered into a
//! [`NodeRegistry`]. Anything requiring platform resources (model calls,
//! HTTP, image generation) is supplied by the embedding application.

use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::expression::{self, display_value, Scope};
use crate::registry::NodeRegistry;
use crate::types::{ExecutionContext, GraphNode, NodeInputs};

/// Register every built-in node type into `registry`
pub fn register_core_nodes(registry: &mut NodeRegistry) {
    registry.register_sync("start", execute_start);
    registry.register_sync("end", execute_end);
    registry.register_sync("prompt", execute_prompt);
    registry.register_sync("javascript", execute_javascript);
    registry.register_sync("conditional", execute_conditional);
}

fn execute_start(
    _node: &GraphNode,
    inputs: &NodeInputs,
    context: &ExecutionContext,
) -> Result<Value> {
    let upstream = inputs
        .get("input1")
        .filter(|v| !v.is_null() && v.as_str() != Some(""));

    Ok(upstream
        .or_else(|| context.initial_input())
        .cloned()
        .unwrap_or_else(|| Value::String(String::new())))
}

fn execute_end(
    _node: &GraphNode,
    inputs: &NodeInputs,
    _context: &ExecutionContext,
) -> Result<Value> {
    Ok(inputs
        .get("input1")
        .cloned()
        .unwrap_or_else(|| Value::String(String::new())))
}

fn execute_prompt(
    node: &GraphNode,
    inputs: &NodeInputs,
    _context: &ExecutionContext,
) -> Result<Value> {
    let template = prompt_template(node);

    // Longest key first so `$input10` is not consumed by `$input1`
    let mut keys: Vec<(&str, Option<&Value>)> = inputs.iter().collect();
    keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut rendered = template.to_string();
    for (key, value) in keys {
        let replacement = value.map(display_value).unwrap_or_default();
        rendered = rendered.replace(&format!("${}", key), &replacement);
    }

    Ok(Value::String(rendered))
}

fn prompt_template(node: &GraphNode) -> &str {
    ["content", "prompt"]
        .iter()
        .filter_map(|key| node.data.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .unwrap_or("")
}

fn expression_scope(inputs: &NodeInputs, context: &ExecutionContext) -> Scope {
    let mut scope = Scope::from_inputs(inputs);
    scope.bind("variables", Some(Value::Object(context.variables.clone())));
    scope
}

fn execute_javascript(
    node: &GraphNode,
    inputs: &NodeInputs,
    context: &ExecutionContext,
) -> Result<Value> {
    let code = node
        .data_str("code")
        .ok_or_else(|| EngineError::failed("JavaScript execution error: no code provided"))?;

    expression::evaluate(code, &expression_scope(inputs, context))
        .map_err(|source| EngineError::expression("JavaScript execution error", source))
}

fn execute_conditional(
    node: &GraphNode,
    inputs: &NodeInputs,
    context: &ExecutionContext,
) -> Result<Value> {
    let condition = node
        .data_str("condition")
        .ok_or_else(|| {
            EngineError::failed("Condition evaluation error: no condition provided")
        })?;

    expression::evaluate_condition(condition, &expression_scope(inputs, context))
        .map(Value::Bool)
        .map_err(|source| EngineError::expression("Condition evaluation error", source))
}
