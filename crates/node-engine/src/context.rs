//! Per-run context and per-node log buffers

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Ephemeral record for one execution call
///
/// Never persisted; only the derived `EngineRunResult` is.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Fresh identifier for this run
    pub run_id: String,
    /// Workflow the run belongs to, if any
    pub workflow_id: Option<String>,
    /// When the run began
    pub started_at: DateTime<Utc>,
    /// Cancellation signal for node implementations.
    ///
    /// The runner never cancels and never inspects it. Nodes that wait on
    /// external work fail with an error once it fires, so the rest of the
    /// graph is skipped.
    pub cancel: CancellationToken,
}

impl RunContext {
    /// Create a context with a fresh UUID run id
    pub fn new(workflow_id: Option<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            workflow_id,
            started_at: Utc::now(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token with one owned by the caller
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether the caller asked for this run to stop
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Render a timestamp the way run records and log lines carry it
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Append-only, timestamped log buffer for one node
///
/// Cloning shares the underlying buffer.
#[derive(Debug, Clone)]
pub struct NodeLogger {
    node_id: String,
    lines: Arc<Mutex<Vec<String>>>,
}

impl NodeLogger {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            lines: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append `[<timestamp>] <message>`
    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        log::debug!("[{}] {}", self.node_id, message);
        self.lines
            .lock()
            .push(format!("[{}] {}", format_timestamp(Utc::now()), message));
    }

    /// Snapshot of the lines written so far, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_fresh() {
        let a = RunContext::new(None);
        let b = RunContext::new(Some("wf".to_string()));
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(b.workflow_id.as_deref(), Some("wf"));
        assert!(!a.is_cancelled());
    }

    #[test]
    fn test_logger_appends_in_order() {
        let logger = NodeLogger::new("n1");
        let shared = logger.clone();
        logger.log("first");
        shared.log("second");

        let lines = logger.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] first"));
        assert!(lines[1].ends_with("] second"));
    }

    #[test]
    fn test_cancellation_hook() {
        let token = CancellationToken::new();
        let ctx = RunContext::new(None).with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
