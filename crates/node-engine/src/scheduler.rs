//! Execution ordering
//!
//! Kahn's algorithm for full-graph order, and graph slicing for
//! "run from node". Both are deterministic for a given graph: ready nodes are
//! taken in FIFO order, seeded in node declaration order, and successors are
//! discovered in edge declaration order.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{NodeEngineError, Result};
use crate::types::{GraphDefinition, GraphEdge, GraphNode, NodeId};

/// Outcome of a topological sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopoOrder {
    /// Node ids in execution order. Nodes on or behind a cycle are absent.
    pub order: Vec<NodeId>,
    pub has_cycle: bool,
}

/// Topologically order `nodes`
///
/// Edges with an endpoint outside `nodes` are ignored.
pub fn topo_sort(nodes: &[GraphNode], edges: &[GraphEdge]) -> TopoOrder {
    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let mut seeds: Vec<&str> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if in_degree.insert(node.id.as_str(), 0).is_none() {
            seeds.push(node.id.as_str());
        }
    }

    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        let from = edge.from.node_id.as_str();
        let to = edge.to.node_id.as_str();
        if !in_degree.contains_key(from) || !in_degree.contains_key(to) {
            continue;
        }
        successors.entry(from).or_default().push(to);
        if let Some(deg) = in_degree.get_mut(to) {
            *deg += 1;
        }
    }

    let mut queue: VecDeque<&str> = seeds
        .iter()
        .copied()
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    let mut order = Vec::with_capacity(seeds.len());
    while let Some(node_id) = queue.pop_front() {
        order.push(node_id.to_string());
        for &next in successors.get(node_id).into_iter().flatten() {
            if let Some(deg) = in_degree.get_mut(next) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    let has_cycle = order.len() < seeds.len();
    TopoOrder { order, has_cycle }
}

/// Breadth-first reachability from `start`, including `start` itself
fn reachable<'a>(
    start: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
) -> HashSet<&'a str> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for &next in adjacency.get(current).into_iter().flatten() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

/// Slice of `graph` needed to re-run `target_node_id`
///
/// Contains the target, all of its descendants, and every ancestor of those
/// nodes. Only edges with both endpoints in the slice are kept. Node and edge
/// order follow `graph`.
pub fn compute_run_from_node_subgraph(
    graph: &GraphDefinition,
    target_node_id: &str,
) -> Result<GraphDefinition> {
    if !graph.contains_node(target_node_id) {
        return Err(NodeEngineError::TargetNotFound(target_node_id.to_string()));
    }

    let mut forward: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut backward: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        forward
            .entry(edge.from.node_id.as_str())
            .or_default()
            .push(edge.to.node_id.as_str());
        backward
            .entry(edge.to.node_id.as_str())
            .or_default()
            .push(edge.from.node_id.as_str());
    }

    let descendants = reachable(target_node_id, &forward);
    let mut relevant: HashSet<&str> = HashSet::new();
    for &node_id in &descendants {
        relevant.extend(reachable(node_id, &backward));
    }

    let nodes: Vec<GraphNode> = graph
        .nodes
        .iter()
        .filter(|n| relevant.contains(n.id.as_str()))
        .cloned()
        .collect();
    let edges: Vec<GraphEdge> = graph
        .edges
        .iter()
        .filter(|e| {
            relevant.contains(e.from.node_id.as_str()) && relevant.contains(e.to.node_id.as_str())
        })
        .cloned()
        .collect();

    log::debug!(
        "Run-from-node slice for '{}': {} of {} nodes",
        target_node_id,
        nodes.len(),
        graph.nodes.len()
    );

    Ok(GraphDefinition::new(nodes, edges))
}
