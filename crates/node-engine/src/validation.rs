//! Structural and type-level graph validation
//!
//! Validation never executes a node or inspects port values. Every problem is
//! collected so one pass reports the whole graph.

use std::collections::HashSet;

use crate::registry::NodeRegistry;
use crate::scheduler::topo_sort;
use crate::types::{GraphDefinition, GraphEdge, PortDataType};

/// A graph-level problem found before any node runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The graph cannot be fully ordered
    CycleDetected,
    /// Two nodes share an id
    DuplicateNodeId { node_id: String },
    /// A node's type has no registered definition
    UnknownNodeType { node_id: String, node_type: String },
    /// An edge references a node that is not in the graph
    InvalidEdge { edge: GraphEdge },
    /// An edge leaves from a port the source type does not declare
    MissingOutputPort { node_id: String, port: String },
    /// An edge arrives at a port the target type does not declare
    MissingInputPort { node_id: String, port: String },
    /// Both ports exist but their declared types differ
    PortTypeMismatch {
        edge: GraphEdge,
        output_type: PortDataType,
        input_type: PortDataType,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleDetected => write!(f, "Cycle detected in workflow graph."),
            Self::DuplicateNodeId { node_id } => {
                write!(f, "Duplicate node id '{}' in workflow graph.", node_id)
            }
            Self::UnknownNodeType { node_type, .. } => {
                write!(f, "No node definition registered for type: {}", node_type)
            }
            Self::InvalidEdge { edge } => write!(f, "Invalid edge: {}", edge),
            Self::MissingOutputPort { node_id, port } => {
                write!(f, "Node {} has no output port named '{}'.", node_id, port)
            }
            Self::MissingInputPort { node_id, port } => {
                write!(f, "Node {} has no input port named '{}'.", node_id, port)
            }
            Self::PortTypeMismatch {
                edge,
                output_type,
                input_type,
            } => write!(
                f,
                "Port type mismatch on edge {} ({} != {}).",
                edge, output_type, input_type
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a graph against the registry
///
/// An empty result means the graph is executable.
pub fn validate_graph(graph: &GraphDefinition, registry: &NodeRegistry) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    detect_cycles(graph, &mut errors);
    validate_node_ids(graph, &mut errors);
    validate_node_types(graph, registry, &mut errors);
    validate_edges(graph, registry, &mut errors);

    errors
}

fn detect_cycles(graph: &GraphDefinition, errors: &mut Vec<ValidationError>) {
    if topo_sort(&graph.nodes, &graph.edges).has_cycle {
        errors.push(ValidationError::CycleDetected);
    }
}

fn validate_node_ids(graph: &GraphDefinition, errors: &mut Vec<ValidationError>) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) && reported.insert(node.id.as_str()) {
            errors.push(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }
}

fn validate_node_types(
    graph: &GraphDefinition,
    registry: &NodeRegistry,
    errors: &mut Vec<ValidationError>,
) {
    for node in &graph.nodes {
        if !registry.has_node_type(&node.node_type) {
            errors.push(ValidationError::UnknownNodeType {
                node_id: node.id.clone(),
                node_type: node.node_type.clone(),
            });
        }
    }
}

/// Check every edge's endpoints, port names and port types
///
/// Port checks are skipped for nodes whose type is unknown; that node already
/// carries an `UnknownNodeType` error.
fn validate_edges(
    graph: &GraphDefinition,
    registry: &NodeRegistry,
    errors: &mut Vec<ValidationError>,
) {
    for edge in &graph.edges {
        let (Some(source), Some(target)) = (
            graph.find_node(&edge.from.node_id),
            graph.find_node(&edge.to.node_id),
        ) else {
            errors.push(ValidationError::InvalidEdge { edge: edge.clone() });
            continue;
        };

        let (Some(source_meta), Some(target_meta)) = (
            registry.get_metadata(&source.node_type),
            registry.get_metadata(&target.node_type),
        ) else {
            continue;
        };

        let output_type = source_meta.output_type(&edge.from.port);
        if output_type.is_none() {
            errors.push(ValidationError::MissingOutputPort {
                node_id: source.id.clone(),
                port: edge.from.port.clone(),
            });
        }

        let input_type = target_meta.input_type(&edge.to.port);
        if input_type.is_none() {
            errors.push(ValidationError::MissingInputPort {
                node_id: target.id.clone(),
                port: edge.to.port.clone(),
            });
        }

        if let (Some(output_type), Some(input_type)) = (output_type, input_type) {
            if output_type != input_type {
                errors.push(ValidationError::PortTypeMismatch {
                    edge: edge.clone(),
                    output_type,
                    input_type,
                });
            }
        }
    }
}
