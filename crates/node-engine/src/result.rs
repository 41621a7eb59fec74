//! Run result model
//!
//! `NodeExecutionState` is built incrementally by the runner while a run is in
//! flight. Once the run returns, the `EngineRunResult` is an immutable record
//! owned by the caller (usually a `RunStore`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GraphDefinition, NodeId, PortValues};

/// Message recorded on nodes that never ran because an ancestor failed
pub const SKIPPED_MESSAGE: &str = "Skipped due to upstream failure.";

/// Status of one node within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Idle,
    Running,
    Success,
    Error,
}

impl NodeStatus {
    /// Whether moving from `self` to `next` respects idle -> running -> terminal
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Error)
                | (Self::Running, Self::Success)
                | (Self::Running, Self::Error)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Overall status of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-node, per-run execution record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionState {
    pub node_id: NodeId,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Append-only, chronological
    #[serde(default)]
    pub logs: Vec<String>,
    /// Set only on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PortValues>,
    /// Set only on error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeExecutionState {
    /// A fresh idle state
    pub fn idle(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            status: NodeStatus::Idle,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            logs: Vec::new(),
            output: None,
            error: None,
        }
    }

    fn transition(&mut self, next: NodeStatus) -> bool {
        if !self.status.can_transition_to(next) {
            log::warn!(
                "Ignoring illegal transition {:?} -> {:?} on node {}",
                self.status,
                next,
                self.node_id
            );
            return false;
        }
        self.status = next;
        true
    }

    /// idle -> running
    pub fn start(&mut self, at: DateTime<Utc>) {
        if self.transition(NodeStatus::Running) {
            self.started_at = Some(at);
        }
    }

    /// running -> success
    pub fn succeed(&mut self, output: PortValues, at: DateTime<Utc>) {
        if self.transition(NodeStatus::Success) {
            self.finish_at(at);
            self.output = Some(output);
        }
    }

    /// idle|running -> error
    ///
    /// Duration is measured from this node's own start, or zero if it never
    /// started.
    pub fn fail(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        if self.transition(NodeStatus::Error) {
            self.finish_at(at);
            self.error = Some(message.into());
        }
    }

    /// idle -> error without running, for upstream failures
    pub fn skip(&mut self, at: DateTime<Utc>) {
        if self.transition(NodeStatus::Error) {
            self.started_at = Some(at);
            self.finished_at = Some(at);
            self.duration_ms = Some(0);
            self.error = Some(SKIPPED_MESSAGE.to_string());
        }
    }

    fn finish_at(&mut self, at: DateTime<Utc>) {
        self.finished_at = Some(at);
        self.duration_ms = Some(
            self.started_at
                .map(|start| (at - start).num_milliseconds().max(0) as u64)
                .unwrap_or(0),
        );
    }
}

/// Immutable record of one finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineRunResult {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Nodes that reached `success`, in execution order
    pub executed_node_ids: Vec<NodeId>,
    pub node_states: HashMap<NodeId, NodeExecutionState>,
    /// Validation errors first, then node errors in execution order
    pub errors: Vec<String>,
}

impl EngineRunResult {
    /// An error result in which no node ran
    ///
    /// Every node of `graph` is reported idle.
    pub fn not_started(
        run_id: impl Into<String>,
        workflow_id: Option<String>,
        graph: &GraphDefinition,
        created_at: DateTime<Utc>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            workflow_id,
            status: RunStatus::Error,
            created_at,
            finished_at: Utc::now(),
            executed_node_ids: Vec::new(),
            node_states: idle_states(graph),
            errors,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn node_state(&self, node_id: &str) -> Option<&NodeExecutionState> {
        self.node_states.get(node_id)
    }

    /// Number of nodes with the given status
    pub fn count_status(&self, status: NodeStatus) -> usize {
        self.node_states.values().filter(|s| s.status == status).count()
    }

    /// Summary row for run history listings
    pub fn summary(&self) -> RunHistoryItem {
        RunHistoryItem {
            run_id: self.run_id.clone(),
            workflow_id: self.workflow_id.clone(),
            status: self.status,
            created_at: self.created_at,
            finished_at: self.finished_at,
            node_count: self
                .node_states
                .values()
                .filter(|s| s.status != NodeStatus::Idle)
                .count(),
            success_count: self.count_status(NodeStatus::Success),
            error_count: self.count_status(NodeStatus::Error),
        }
    }
}

/// Idle state for every node of a graph
pub fn idle_states(graph: &GraphDefinition) -> HashMap<NodeId, NodeExecutionState> {
    graph
        .nodes
        .iter()
        .map(|n| (n.id.clone(), NodeExecutionState::idle(n.id.clone())))
        .collect()
}

/// Summary of a persisted run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHistoryItem {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Nodes that left `idle`
    pub node_count: usize,
    pub success_count: usize,
    pub error_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_transitions_are_monotonic() {
        let now = Utc::now();
        let mut state = NodeExecutionState::idle("a");
        state.start(now);
        state.succeed(PortValues::new(), now + Duration::milliseconds(25));
        assert_eq!(state.status, NodeStatus::Success);
        assert_eq!(state.duration_ms, Some(25));

        // Terminal states never revert
        state.fail("late", now);
        assert_eq!(state.status, NodeStatus::Success);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_fail_before_start_has_zero_duration() {
        let mut state = NodeExecutionState::idle("combine");
        state.fail("Missing required input 'textA' on node combine.", Utc::now());
        assert_eq!(state.status, NodeStatus::Error);
        assert_eq!(state.duration_ms, Some(0));
        assert!(state.started_at.is_none());
    }

    #[test]
    fn test_skip() {
        let now = Utc::now();
        let mut state = NodeExecutionState::idle("b");
        state.skip(now);
        assert_eq!(state.error.as_deref(), Some(SKIPPED_MESSAGE));
        assert_eq!(state.started_at, state.finished_at);
        assert_eq!(state.duration_ms, Some(0));
    }

    #[test]
    fn test_result_wire_format() {
        let graph =
            GraphDefinition::new(vec![crate::types::GraphNode::new("a", "prompt.text")], vec![]);
        let result =
            EngineRunResult::not_started("run-1", None, &graph, Utc::now(), vec!["boom".into()]);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["runId"], "run-1");
        assert!(json["executedNodeIds"].as_array().unwrap().is_empty());
        assert_eq!(json["nodeStates"]["a"]["status"], "idle");
        assert_eq!(json["nodeStates"]["a"]["nodeId"], "a");
    }

    #[test]
    fn test_summary_counts_non_idle() {
        let now = Utc::now();
        let graph = GraphDefinition::new(
            vec![
                crate::types::GraphNode::new("a", "prompt.text"),
                crate::types::GraphNode::new("b", "hero.generate"),
                crate::types::GraphNode::new("c", "patchplan.generate"),
            ],
            vec![],
        );
        let mut result =
            EngineRunResult::not_started("run-2", Some("wf".into()), &graph, now, vec![]);
        if let Some(a) = result.node_states.get_mut("a") {
            a.start(now);
            a.succeed(PortValues::new(), now);
        }
        if let Some(b) = result.node_states.get_mut("b") {
            b.skip(now);
        }

        let summary = result.summary();
        assert_eq!(summary.node_count, 2);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.workflow_id.as_deref(), Some("wf"));
    }
}
