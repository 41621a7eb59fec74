//! Event types for streaming run progress
//!
//! The runner reports each node transition to an `EventSink`. Sinks are
//! observers only: a failed send is logged and the run carries on.

use serde::{Deserialize, Serialize};

use crate::result::RunStatus;

/// Trait for sending run events
///
/// This abstracts over the transport (mpsc channel, websocket, log file),
/// allowing the runner to be used in different hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone, thiserror::Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkflowEvent {
    /// Validation passed and nodes are about to execute
    #[serde(rename_all = "camelCase")]
    RunStarted {
        run_id: String,
        workflow_id: Option<String>,
        node_count: usize,
    },

    /// A node moved to `running`
    #[serde(rename_all = "camelCase")]
    NodeStarted { run_id: String, node_id: String },

    /// A node reached `success`
    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        run_id: String,
        node_id: String,
        duration_ms: u64,
    },

    /// A node reached `error` on its own account
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        run_id: String,
        node_id: String,
        error: String,
    },

    /// A node was not run because an upstream node failed
    #[serde(rename_all = "camelCase")]
    NodeSkipped { run_id: String, node_id: String },

    /// The run finished, including runs rejected by validation
    #[serde(rename_all = "camelCase")]
    RunCompleted {
        run_id: String,
        status: RunStatus,
        error_count: usize,
    },
}

impl WorkflowEvent {
    /// The run this event belongs to
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::NodeStarted { run_id, .. }
            | Self::NodeCompleted { run_id, .. }
            | Self::NodeFailed { run_id, .. }
            | Self::NodeSkipped { run_id, .. }
            | Self::RunCompleted { run_id, .. } => run_id,
        }
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: WorkflowEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: parking_lot::Mutex<Vec<WorkflowEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().clone()
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Forwards events into a tokio channel
pub struct ChannelEventSink {
    sender: tokio::sync::mpsc::UnboundedSender<WorkflowEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<WorkflowEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::channel_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();

        sink.send(WorkflowEvent::NodeSkipped {
            run_id: "run1".to_string(),
            node_id: "b".to_string(),
        })
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].run_id(), "run1");
    }

    #[test]
    fn test_event_wire_format() {
        let event = WorkflowEvent::NodeCompleted {
            run_id: "run1".to_string(),
            node_id: "a".to_string(),
            duration_ms: 12,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "nodeCompleted");
        assert_eq!(json["durationMs"], 12);
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closed() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = ChannelEventSink::new(tx);
        sink.send(WorkflowEvent::NodeStarted {
            run_id: "r".to_string(),
            node_id: "a".to_string(),
        })
        .unwrap();
        assert!(matches!(rx.recv().await, Some(WorkflowEvent::NodeStarted { .. })));

        drop(rx);
        let err = sink
            .send(WorkflowEvent::NodeSkipped {
                run_id: "r".to_string(),
                node_id: "b".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Event error: Channel closed");
    }
}
