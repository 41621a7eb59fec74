//! Fluent builder for workflow graphs
//!
//! Provides a fluent API for constructing graphs programmatically, mostly for
//! tests and host code that wires fixed pipelines.

use crate::types::{ConfigMap, GraphDefinition, GraphEdge, GraphNode, PortRef};

/// Fluent builder for constructing a `GraphDefinition`
///
/// # Example
///
/// ```ignore
/// let graph = GraphBuilder::new()
///     .add_node("prompt", "prompt.text")
///     .with_config("text", serde_json::json!("Launch banner"))
///     .add_node("hero", "hero.generate")
///     .connect("prompt", "text", "hero", "text")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with an empty config
    pub fn add_node(mut self, id: impl Into<String>, node_type: impl Into<String>) -> Self {
        self.nodes.push(GraphNode::new(id, node_type));
        self
    }

    /// Add a node with a full config map
    pub fn add_node_with_config(
        mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        config: ConfigMap,
    ) -> Self {
        let mut node = GraphNode::new(id, node_type);
        node.config = config;
        self.nodes.push(node);
        self
    }

    /// Set one config key on the most recently added node
    ///
    /// Must be called after `add_node`.
    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.config.insert(key.into(), value);
        }
        self
    }

    /// Wire `from_node.from_port` into `to_node.to_port`
    pub fn connect(
        mut self,
        from_node: impl Into<String>,
        from_port: impl Into<String>,
        to_node: impl Into<String>,
        to_port: impl Into<String>,
    ) -> Self {
        self.edges.push(GraphEdge::new(
            PortRef::new(from_node, from_port),
            PortRef::new(to_node, to_port),
        ));
        self
    }

    /// Build the graph without validation
    pub fn build(self) -> GraphDefinition {
        GraphDefinition::new(self.nodes, self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let graph = GraphBuilder::new()
            .add_node("prompt", "prompt.text")
            .with_config("text", json!("Launch banner"))
            .add_node("hero", "hero.generate")
            .connect("prompt", "text", "hero", "text")
            .build();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].config["text"], "Launch banner");
        assert!(graph.nodes[1].config.is_empty());
        assert_eq!(graph.edges[0].to_string(), "prompt:text -> hero:text");
    }

    #[test]
    fn test_with_config_before_any_node_is_ignored() {
        let graph = GraphBuilder::new().with_config("k", json!(1)).build();
        assert!(graph.nodes.is_empty());
    }
}
