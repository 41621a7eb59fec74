//! Task descriptor trait and metadata types
//!
//! This module provides the `TaskDescriptor` trait that allows node
//! implementations to self-describe their metadata (ports, category, label).
//! The implementation defines both its behavior AND its port signature, so
//! the validator and scheduler never drift from what the executor expects.

use serde::{Deserialize, Serialize};

use crate::types::{NodeCategory, PortDataType};

/// Trait for node implementations that can describe their metadata
///
/// # Example
///
/// ```ignore
/// use node_engine::{NodeCategory, PortDataType, PortMetadata, TaskDescriptor, TaskMetadata};
///
/// impl TaskDescriptor for MyTask {
///     fn descriptor() -> TaskMetadata {
///         TaskMetadata::new("my.task", NodeCategory::Generation, "My Task")
///             .with_input(PortMetadata::required("text", "Text", PortDataType::Text))
///             .with_output(PortMetadata::required("json", "JSON", PortDataType::Json))
///     }
/// }
/// ```
pub trait TaskDescriptor {
    /// Get the static metadata for this node type
    fn descriptor() -> TaskMetadata
    where
        Self: Sized;
}

/// Complete metadata for a node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    /// Unique type identifier (e.g., "hero.generate")
    pub node_type: String,
    /// Category for palette grouping
    pub category: NodeCategory,
    /// Human-readable label
    pub label: String,
    /// Description of what the node does
    pub description: String,
    /// Input port definitions, in declaration order
    pub inputs: Vec<PortMetadata>,
    /// Output port definitions, in declaration order
    pub outputs: Vec<PortMetadata>,
    /// Input port assumed when an editor wire carries no usable handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_input: Option<String>,
    /// Output port assumed when an editor wire carries no usable handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_output: Option<String>,
}

impl TaskMetadata {
    /// Create metadata with no ports
    pub fn new(
        node_type: impl Into<String>,
        category: NodeCategory,
        label: impl Into<String>,
    ) -> Self {
        Self {
            node_type: node_type.into(),
            category,
            label: label.into(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            default_input: None,
            default_output: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input(mut self, port: PortMetadata) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: PortMetadata) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn with_default_ports(
        mut self,
        input: Option<&str>,
        output: Option<&str>,
    ) -> Self {
        self.default_input = input.map(str::to_string);
        self.default_output = output.map(str::to_string);
        self
    }

    /// Declared type of an input port
    pub fn input_type(&self, key: &str) -> Option<PortDataType> {
        self.inputs.iter().find(|p| p.id == key).map(|p| p.data_type)
    }

    /// Declared type of an output port
    pub fn output_type(&self, key: &str) -> Option<PortDataType> {
        self.outputs.iter().find(|p| p.id == key).map(|p| p.data_type)
    }

    /// Input ports that must be wired, in declaration order
    pub fn required_inputs(&self) -> impl Iterator<Item = &PortMetadata> {
        self.inputs.iter().filter(|p| p.required)
    }

    /// Whether an input port is declared optional
    pub fn is_optional_input(&self, key: &str) -> bool {
        self.inputs.iter().any(|p| p.id == key && !p.required)
    }
}

/// Metadata for a port (input or output)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMetadata {
    /// Port key (used in edges and value maps)
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Data type
    pub data_type: PortDataType,
    /// Whether this input must be wired
    pub required: bool,
}

impl PortMetadata {
    /// Create a new port metadata
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        data_type: PortDataType,
        required: bool,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data_type,
            required,
        }
    }

    /// Create a required port
    pub fn required(
        id: impl Into<String>,
        label: impl Into<String>,
        data_type: PortDataType,
    ) -> Self {
        Self::new(id, label, data_type, true)
    }

    /// Create an optional port
    pub fn optional(
        id: impl Into<String>,
        label: impl Into<String>,
        data_type: PortDataType,
    ) -> Self {
        Self::new(id, label, data_type, false)
    }
}
