//! Event types for streaming workflow progress
//!
//! Updates are sent from the engine to any consumer (a UI channel, a log,
//! a test collector) in the order they happen. Exactly one engine-driven
//! stream exists per run.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Trait for sending execution updates
///
/// This abstracts over the transport mechanism (callback, mpsc, etc.)
/// allowing the engine to be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an update
    ///
    /// Returns an error if the update could not be delivered (e.g., channel closed)
    fn send(&self, update: ExecutionUpdate) -> Result<(), EventError>;
}

/// Error when sending updates fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Lifecycle updates emitted during a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionUpdate {
    /// A node is about to execute
    #[serde(rename_all = "camelCase")]
    NodeStart { node_id: String },

    /// A node finished and its output was recorded
    #[serde(rename_all = "camelCase")]
    NodeComplete {
        node_id: String,
        output: serde_json::Value,
    },

    /// A node failed; the run stops after this update
    #[serde(rename_all = "camelCase")]
    NodeError { node_id: String, error: String },

    /// Every node completed
    Complete,

    /// The run failed (cycle, abort, or node failure)
    Error { message: String },
}

impl ExecutionUpdate {
    pub fn node_start(node_id: &str) -> Self {
        Self::NodeStart {
            node_id: node_id.to_string(),
        }
    }

    pub fn node_complete(node_id: &str, output: serde_json::Value) -> Self {
        Self::NodeComplete {
            node_id: node_id.to_string(),
            output,
        }
    }

    pub fn node_error(node_id: &str, error: impl Into<String>) -> Self {
        Self::NodeError {
            node_id: node_id.to_string(),
            error: error.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Node id for node-scoped updates
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::NodeStart { node_id }
            | Self::NodeComplete { node_id, .. }
            | Self::NodeError { node_id, .. } => Some(node_id),
            Self::Complete | Self::Error { .. } => None,
        }
    }

    /// Whether this update ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error { .. })
    }
}

/// A no-op event sink that discards all updates
///
/// The engine falls back to it when a run is started without a sink.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _update: ExecutionUpdate) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects updates
///
/// Useful for testing to verify updates were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<ExecutionUpdate>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected updates
    pub fn events(&self) -> Vec<ExecutionUpdate> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Clear all collected updates
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, update: ExecutionUpdate) -> Result<(), EventError> {
        self.events
            .lock()
            .map(|mut events| events.push(update))
            .map_err(|_| EventError {
                message: "Event buffer poisoned".to_string(),
            })
    }
}

/// Event sink wrapping a plain callback, invoked synchronously in order
pub struct FnEventSink<F>
where
    F: Fn(ExecutionUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> FnEventSink<F>
where
    F: Fn(ExecutionUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> EventSink for FnEventSink<F>
where
    F: Fn(ExecutionUpdate) + Send + Sync,
{
    fn send(&self, update: ExecutionUpdate) -> Result<(), EventError> {
        (self.callback)(update);
        Ok(())
    }
}

/// Event sink forwarding updates over a tokio channel
///
/// Lets another task consume progress while the run is in flight.
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<ExecutionUpdate>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver that observes it
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, update: ExecutionUpdate) -> Result<(), EventError> {
        self.sender
            .send(update)
            .map_err(|_| EventError::channel_closed())
    }
}
