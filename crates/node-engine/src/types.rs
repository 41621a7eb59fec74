//! Core types for workflow graphs
//!
//! These types define the structure of an executable graph: typed ports,
//! node instances, directed wires between ports, and the opaque value maps
//! that flow along those wires.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Opaque key/value configuration passed verbatim to a node's executor
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Opaque port-keyed values produced by a node, or gathered for its inputs
pub type PortValues = serde_json::Map<String, serde_json::Value>;

/// The data type of a port
///
/// Wiring is only legal between ports of the identical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortDataType {
    /// Image reference (path or URL)
    Image,
    /// Text string
    Text,
    /// JSON object
    Json,
    /// Ordered file operations for a workspace
    PatchPlan,
    /// Materialized workspace reference
    Workspace,
    /// Running preview server reference
    Preview,
    /// Generated hero artifact
    HeroArtifact,
}

impl PortDataType {
    /// All port types, in declaration order
    pub const ALL: [PortDataType; 7] = [
        PortDataType::Image,
        PortDataType::Text,
        PortDataType::Json,
        PortDataType::PatchPlan,
        PortDataType::Workspace,
        PortDataType::Preview,
        PortDataType::HeroArtifact,
    ];

    /// Wire token for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::Json => "json",
            Self::PatchPlan => "patchPlan",
            Self::Workspace => "workspace",
            Self::Preview => "preview",
            Self::HeroArtifact => "heroArtifact",
        }
    }
}

impl fmt::Display for PortDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown port type '{}'", s))
    }
}

/// Category of a node, used for palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Nodes that bring external data into the graph
    Inputs,
    /// Prompt authoring nodes
    Prompts,
    /// Nodes that derive configuration or generated plans
    Generation,
    /// Nodes with external side effects (workspace, preview, publish)
    Output,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 4] = [
        NodeCategory::Inputs,
        NodeCategory::Prompts,
        NodeCategory::Generation,
        NodeCategory::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inputs => "inputs",
            Self::Prompts => "prompts",
            Self::Generation => "generation",
            Self::Output => "output",
        }
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Node type (references a registered definition)
    #[serde(rename = "type")]
    pub node_type: String,
    /// Configuration for this instance
    #[serde(default)]
    pub config: ConfigMap,
}

impl GraphNode {
    /// Create a node with an empty config
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            config: ConfigMap::new(),
        }
    }
}

/// One end of a wire: a node and one of its port keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub node_id: NodeId,
    pub port: String,
}

impl PortRef {
    pub fn new(node_id: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, self.port)
    }
}

/// A directed wire from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: PortRef,
    pub to: PortRef,
}

impl GraphEdge {
    pub fn new(from: PortRef, to: PortRef) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A complete executable graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Nodes in the graph
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    /// Edges connecting nodes
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl GraphDefinition {
    /// Create a graph from nodes and edges
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self { nodes, edges }
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Check whether a node with this ID exists
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Get edges coming into a node
    pub fn incoming_edges<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.to.node_id == node_id)
    }

    /// Get edges going out of a node
    pub fn outgoing_edges<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.from.node_id == node_id)
    }

    /// Get the IDs of nodes that this node depends on (upstream nodes)
    pub fn get_dependencies(&self, node_id: &str) -> Vec<NodeId> {
        self.incoming_edges(node_id)
            .map(|e| e.from.node_id.clone())
            .collect()
    }

    /// Get the IDs of nodes that depend on this node (downstream nodes)
    pub fn get_dependents(&self, node_id: &str) -> Vec<NodeId> {
        self.outgoing_edges(node_id)
            .map(|e| e.to.node_id.clone())
            .collect()
    }
}
