//! Credential presence checks for provider-backed node types

use std::collections::HashMap;

use super::ValidationIssue;
use crate::types::GraphNode;

/// Report nodes whose provider has no usable credential
///
/// `textModel` nodes name their provider as the prefix of `model`
/// (`provider/modelName`); `imageGeneration` always needs `google`.
/// Blank credentials count as missing.
pub fn validate_credentials(
    credentials: &HashMap<String, String>,
    nodes: &[GraphNode],
) -> Vec<ValidationIssue> {
    let has_credential = |provider: &str| {
        credentials
            .get(provider)
            .map(|secret| !secret.trim().is_empty())
            .unwrap_or(false)
    };

    nodes
        .iter()
        .filter_map(|node| {
            let provider = match node.node_type.as_str() {
                "textModel" => node
                    .data_str("model")
                    .and_then(|model| model.split_once('/'))
                    .map(|(provider, _)| provider)
                    .filter(|provider| !provider.is_empty())?,
                "imageGeneration" => "google",
                _ => return None,
            };

            if has_credential(provider) {
                return None;
            }
            Some(
                ValidationIssue::error(format!("Missing API key for provider '{}'", provider))
                    .with_node(&node.id)
                    .with_field("credentials")
                    .with_suggestion(format!(
                        "Add a {} API key before running this workflow",
                        provider
                    )),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, node_type: &str, data: serde_json::Value) -> GraphNode {
        let mut node = GraphNode::new(id, node_type, (0.0, 0.0));
        if let serde_json::Value::Object(map) = data {
            node.data = map;
        }
        node
    }

    #[test]
    fn test_missing_provider_credential() {
        let nodes = vec![
            node("t1", "textModel", json!({"model": "openai/gpt-4o"})),
            node("t2", "textModel", json!({"model": "anthropic/claude"})),
        ];
        let credentials = HashMap::from([("openai".to_string(), "sk-1".to_string())]);

        let issues = validate_credentials(&credentials, &nodes);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].node_id.as_deref(), Some("t2"));
        assert!(issues[0].message.contains("anthropic"));
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let nodes = vec![node("img", "imageGeneration", json!({}))];
        let credentials = HashMap::from([("google".to_string(), "   ".to_string())]);

        let issues = validate_credentials(&credentials, &nodes);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].node_id.as_deref(), Some("img"));
    }

    #[test]
    fn test_models_without_provider_prefix_are_skipped() {
        let nodes = vec![
            node("t1", "textModel", json!({"model": "gpt-4o"})),
            node("t2", "textModel", json!({})),
            node("p", "prompt", json!({"content": "hi"})),
        ];

        assert!(validate_credentials(&HashMap::new(), &nodes).is_empty());
    }

    #[test]
    fn test_one_issue_per_node() {
        let nodes = vec![
            node("a", "imageGeneration", json!({})),
            node("b", "imageGeneration", json!({})),
        ];

        assert_eq!(validate_credentials(&HashMap::new(), &nodes).len(), 2);
    }
}
