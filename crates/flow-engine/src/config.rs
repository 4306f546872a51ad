//! Engine and validator configuration
//!
//! Both configs deserialize from camelCase JSON with every field optional,
//! falling back to the values in [`defaults`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default values for engine and validator configuration
pub mod defaults {
    /// Per-node timeout; `None` lets a node run until it settles
    pub const NODE_TIMEOUT_MS: Option<u64> = None;
    /// Chain length above which a node is reported as part of a long chain
    pub const LONG_CHAIN_THRESHOLD: usize = 10;
}

/// Execution engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Upper bound on a single node's execution, in milliseconds.
    /// Expiry fails the node (and therefore the run).
    pub node_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_timeout_ms: defaults::NODE_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    /// Parse from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the per-node timeout
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn node_timeout(&self) -> Option<Duration> {
        self.node_timeout_ms.map(Duration::from_millis)
    }
}

/// Graph validator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationConfig {
    /// Nodes whose dependency chain is longer than this are reported
    pub long_chain_threshold: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            long_chain_threshold: defaults::LONG_CHAIN_THRESHOLD,
        }
    }
}

impl ValidationConfig {
    /// Parse from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
