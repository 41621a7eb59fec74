//! Editor snapshot adapter
//!
//! The graph editor saves nodes with a UI `kind` and wires labelled by
//! handle strings (see [`crate::handle`]). This module converts such a
//! snapshot into a `GraphDefinition`, and vets a single prospective wire
//! before the editor accepts it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{NodeEngineError, Result};
use crate::handle::{decode_handle, PortDirection};
use crate::registry::NodeRegistry;
use crate::types::{ConfigMap, GraphDefinition, GraphEdge, GraphNode, PortDataType, PortRef};

/// Port name used when a wire's source handle is unusable and the type is unknown
pub const FALLBACK_OUTPUT_PORT: &str = "output";
/// Port name used when a wire's target handle is unusable and the type is unknown
pub const FALLBACK_INPUT_PORT: &str = "input";

/// Canvas position, carried through but unused by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Editor-side payload of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNodeData {
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub config: ConfigMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: String,
    #[serde(default)]
    pub position: Position,
    pub data: SnapshotNodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEdge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

/// A saved editor graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

/// A wire the user is trying to draw
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedConnection {
    pub source: Option<String>,
    pub target: Option<String>,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

/// Why a proposed wire is refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionRejection {
    #[error("Incomplete connection")]
    Incomplete,
    #[error("Cannot connect to the same node")]
    SelfLoop,
    #[error("Target node not found")]
    NodeNotFound,
    #[error("Invalid port connection")]
    MalformedHandle,
    #[error("Must connect output to input")]
    WrongDirection,
    #[error("Port type mismatch ({output} -> {input})")]
    TypeMismatch {
        output: PortDataType,
        input: PortDataType,
    },
    #[error("Invalid target port")]
    UnknownTargetPort,
    #[error("Input is already connected")]
    InputAlreadyConnected,
    #[error("Connection already exists")]
    Duplicate,
    #[error("Connection would create a cycle")]
    WouldCreateCycle,
}

/// Converts editor snapshots using a UI-kind to engine-type table
pub struct GraphAdapter<'a> {
    registry: &'a NodeRegistry,
    kinds: HashMap<String, String>,
}

impl<'a> GraphAdapter<'a> {
    /// `kinds` maps each UI kind to the engine node type it stands for
    pub fn new(registry: &'a NodeRegistry, kinds: HashMap<String, String>) -> Self {
        Self { registry, kinds }
    }

    pub fn engine_type(&self, ui_kind: &str) -> Option<&str> {
        self.kinds.get(ui_kind).map(String::as_str)
    }

    fn fallback_output_port(&self, node_type: Option<&str>) -> String {
        node_type
            .and_then(|t| self.registry.get_metadata(t))
            .and_then(|m| m.default_output.clone())
            .unwrap_or_else(|| FALLBACK_OUTPUT_PORT.to_string())
    }

    fn fallback_input_port(&self, node_type: Option<&str>) -> String {
        node_type
            .and_then(|t| self.registry.get_metadata(t))
            .and_then(|m| m.default_input.clone())
            .unwrap_or_else(|| FALLBACK_INPUT_PORT.to_string())
    }

    /// Convert a snapshot into an executable graph
    ///
    /// An unknown UI kind fails the conversion. Unusable handles fall back to
    /// the node type's default port instead.
    pub fn to_graph_definition(&self, snapshot: &GraphSnapshot) -> Result<GraphDefinition> {
        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        for node in &snapshot.nodes {
            let node_type = self
                .engine_type(&node.data.kind)
                .ok_or_else(|| NodeEngineError::UnsupportedKind(node.data.kind.clone()))?;
            let mut graph_node = GraphNode::new(node.id.clone(), node_type);
            graph_node.config = node.data.config.clone();
            nodes.push(graph_node);
        }

        let node_types: HashMap<&str, &str> = nodes
            .iter()
            .map(|n| (n.id.as_str(), n.node_type.as_str()))
            .collect();

        let edges = snapshot
            .edges
            .iter()
            .map(|edge| {
                let from_port = decode_handle(edge.source_handle.as_deref())
                    .map(|h| h.key)
                    .unwrap_or_else(|| {
                        self.fallback_output_port(node_types.get(edge.source.as_str()).copied())
                    });
                let to_port = decode_handle(edge.target_handle.as_deref())
                    .map(|h| h.key)
                    .unwrap_or_else(|| {
                        self.fallback_input_port(node_types.get(edge.target.as_str()).copied())
                    });
                GraphEdge::new(
                    PortRef::new(edge.source.clone(), from_port),
                    PortRef::new(edge.target.clone(), to_port),
                )
            })
            .collect();

        Ok(GraphDefinition::new(nodes, edges))
    }

    /// Check whether `connection` may be added to `snapshot`
    pub fn validate_connection(
        &self,
        connection: &ProposedConnection,
        snapshot: &GraphSnapshot,
    ) -> std::result::Result<(), ConnectionRejection> {
        let (Some(source), Some(target)) = (
            connection.source.as_deref().filter(|s| !s.is_empty()),
            connection.target.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(ConnectionRejection::Incomplete);
        };

        if source == target {
            return Err(ConnectionRejection::SelfLoop);
        }

        let source_exists = snapshot.nodes.iter().any(|n| n.id == source);
        let Some(target_node) = snapshot.nodes.iter().find(|n| n.id == target) else {
            return Err(ConnectionRejection::NodeNotFound);
        };
        if !source_exists {
            return Err(ConnectionRejection::NodeNotFound);
        }

        let (Some(source_handle), Some(target_handle)) = (
            decode_handle(connection.source_handle.as_deref()),
            decode_handle(connection.target_handle.as_deref()),
        ) else {
            return Err(ConnectionRejection::MalformedHandle);
        };

        if source_handle.direction != PortDirection::Output
            || target_handle.direction != PortDirection::Input
        {
            return Err(ConnectionRejection::WrongDirection);
        }

        if source_handle.data_type != target_handle.data_type {
            return Err(ConnectionRejection::TypeMismatch {
                output: source_handle.data_type,
                input: target_handle.data_type,
            });
        }

        let target_port = self
            .engine_type(&target_node.data.kind)
            .and_then(|t| self.registry.get_metadata(t))
            .and_then(|m| m.inputs.iter().find(|p| p.id == target_handle.key))
            .ok_or(ConnectionRejection::UnknownTargetPort)?;

        let target_already_connected = snapshot
            .edges
            .iter()
            .any(|e| e.target == target && e.target_handle == connection.target_handle);
        if target_port.required && target_already_connected {
            return Err(ConnectionRejection::InputAlreadyConnected);
        }

        let duplicate = snapshot.edges.iter().any(|e| {
            e.source == source
                && e.target == target
                && e.source_handle == connection.source_handle
                && e.target_handle == connection.target_handle
        });
        if duplicate {
            return Err(ConnectionRejection::Duplicate);
        }

        if reaches(target, source, &snapshot.edges) {
            return Err(ConnectionRejection::WouldCreateCycle);
        }

        Ok(())
    }
}

/// Whether `goal` is reachable from `start` along existing wires
fn reaches(start: &str, goal: &str, edges: &[SnapshotEdge]) -> bool {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut stack = vec![start];
    let mut visited: HashSet<&str> = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == goal {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        stack.extend(adjacency.get(current).into_iter().flatten().copied());
    }
    false
}
