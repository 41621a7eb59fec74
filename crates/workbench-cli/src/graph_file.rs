//! Loading graphs from disk
//!
//! A graph file is either an engine `GraphDefinition` (nodes carry `type`) or
//! an editor snapshot (nodes carry `data.kind`). Snapshots are converted with
//! the built-in UI kind table.

use std::path::Path;

use anyhow::{Context, Result};
use node_engine::{GraphAdapter, GraphDefinition, GraphSnapshot, NodeRegistry};
use serde_json::Value;
use workflow_nodes::NodeKind;

/// Which format a graph file was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Engine,
    Snapshot,
}

/// Snapshot nodes wrap their kind and config in `data`
pub fn detect_format(value: &Value) -> GraphFormat {
    let is_snapshot = value
        .get("nodes")
        .and_then(Value::as_array)
        .is_some_and(|nodes| nodes.iter().any(|n| n.get("data").is_some()));
    if is_snapshot {
        GraphFormat::Snapshot
    } else {
        GraphFormat::Engine
    }
}

pub fn parse_graph(value: Value, registry: &NodeRegistry) -> Result<GraphDefinition> {
    match detect_format(&value) {
        GraphFormat::Engine => {
            serde_json::from_value(value).context("graph is not a valid engine graph")
        }
        GraphFormat::Snapshot => {
            let snapshot: GraphSnapshot =
                serde_json::from_value(value).context("graph is not a valid editor snapshot")?;
            let adapter = GraphAdapter::new(registry, NodeKind::ui_kind_map());
            Ok(adapter.to_graph_definition(&snapshot)?)
        }
    }
}

pub async fn load_graph(path: &Path, registry: &NodeRegistry) -> Result<GraphDefinition> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read graph file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse graph file: {}", path.display()))?;
    let graph = parse_graph(value, registry)
        .with_context(|| format!("failed to load graph: {}", path.display()))?;
    log::info!(
        "Loaded graph with {} nodes and {} edges from {:?}",
        graph.nodes.len(),
        graph.edges.len(),
        path
    );
    Ok(graph)
}
