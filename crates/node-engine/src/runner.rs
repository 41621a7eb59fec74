//! Sequential workflow runner
//!
//! Executes a validated graph one node at a time in topological order. A node
//! whose upstream did not succeed is skipped without running, so one failure
//! poisons every transitive descendant while unrelated branches carry on.
//! Node-level failures never escape: both entry points always return an
//! `EngineRunResult`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::context::{NodeLogger, RunContext};
use crate::error::{NodeEngineError, Result};
use crate::events::{EventSink, NullEventSink, WorkflowEvent};
use crate::registry::{NodeRegistry, NodeRequest};
use crate::result::{
    idle_states, EngineRunResult, NodeExecutionState, NodeStatus, RunStatus, SKIPPED_MESSAGE,
};
use crate::scheduler::{compute_run_from_node_subgraph, topo_sort};
use crate::types::{GraphDefinition, GraphEdge, GraphNode, NodeId, PortValues};
use crate::validation::validate_graph;

/// Runs graphs against a node registry
pub struct WorkflowRunner {
    registry: Arc<NodeRegistry>,
    event_sink: Arc<dyn EventSink>,
}

impl WorkflowRunner {
    /// Create a runner that discards events
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            event_sink: Arc::new(NullEventSink),
        }
    }

    /// Report progress to `event_sink`
    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Validate and run the whole graph
    pub async fn run_workflow(
        &self,
        graph: &GraphDefinition,
        workflow_id: Option<&str>,
    ) -> EngineRunResult {
        let ctx = RunContext::new(workflow_id.map(str::to_string));
        self.run_workflow_with_context(graph, ctx).await
    }

    /// Run the graph under a caller-supplied context
    ///
    /// Lets the caller keep a handle on the context's cancellation token.
    pub async fn run_workflow_with_context(
        &self,
        graph: &GraphDefinition,
        ctx: RunContext,
    ) -> EngineRunResult {
        let validation_errors = validate_graph(graph, &self.registry);
        if !validation_errors.is_empty() {
            log::warn!(
                "Run {} rejected: {} validation error(s)",
                ctx.run_id,
                validation_errors.len()
            );
            let errors = validation_errors.iter().map(|e| e.to_string()).collect();
            let result = EngineRunResult::not_started(
                ctx.run_id.clone(),
                ctx.workflow_id.clone(),
                graph,
                ctx.started_at,
                errors,
            );
            self.emit_completed(&result);
            return result;
        }

        let order = topo_sort(&graph.nodes, &graph.edges).order;
        log::info!(
            "Run {} started: {} node(s), workflow {:?}",
            ctx.run_id,
            order.len(),
            ctx.workflow_id
        );
        self.emit(WorkflowEvent::RunStarted {
            run_id: ctx.run_id.clone(),
            workflow_id: ctx.workflow_id.clone(),
            node_count: order.len(),
        });

        let mut node_states = idle_states(graph);
        let mut outputs: HashMap<NodeId, PortValues> = HashMap::new();
        let mut executed_node_ids = Vec::new();
        let mut errors = Vec::new();

        for node_id in &order {
            let Some(node) = graph.find_node(node_id) else {
                continue;
            };
            let incoming: Vec<&GraphEdge> = graph.incoming_edges(node_id).collect();
            let logger = NodeLogger::new(node_id.clone());

            let upstream_failed = incoming.iter().any(|edge| {
                node_states
                    .get(&edge.from.node_id)
                    .map_or(true, |s| s.status != NodeStatus::Success)
            });

            let Some(state) = node_states.get_mut(node_id) else {
                continue;
            };

            if upstream_failed {
                logger.log(SKIPPED_MESSAGE);
                state.skip(Utc::now());
                state.logs = logger.lines();
                log::debug!("Node {} skipped due to upstream failure", node_id);
                self.emit(WorkflowEvent::NodeSkipped {
                    run_id: ctx.run_id.clone(),
                    node_id: node_id.clone(),
                });
                continue;
            }

            match self
                .execute_node(node, &incoming, &outputs, &ctx, &logger, state)
                .await
            {
                Ok(output) => {
                    state.succeed(output.clone(), Utc::now());
                    state.logs = logger.lines();
                    outputs.insert(node_id.clone(), output);
                    executed_node_ids.push(node_id.clone());
                    log::debug!("Node {} succeeded", node_id);
                    self.emit(WorkflowEvent::NodeCompleted {
                        run_id: ctx.run_id.clone(),
                        node_id: node_id.clone(),
                        duration_ms: state.duration_ms.unwrap_or(0),
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    logger.log(format!("ERROR: {}", message));
                    state.fail(message.clone(), Utc::now());
                    state.logs = logger.lines();
                    log::warn!("Node {} failed: {}", node_id, message);
                    errors.push(format!("Node {}: {}", node_id, message));
                    self.emit(WorkflowEvent::NodeFailed {
                        run_id: ctx.run_id.clone(),
                        node_id: node_id.clone(),
                        error: message,
                    });
                }
            }
        }

        let status = if errors.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Error
        };
        let result = EngineRunResult {
            run_id: ctx.run_id.clone(),
            workflow_id: ctx.workflow_id.clone(),
            status,
            created_at: ctx.started_at,
            finished_at: Utc::now(),
            executed_node_ids,
            node_states,
            errors,
        };
        log::info!(
            "Run {} finished with {}: {} succeeded, {} error(s)",
            result.run_id,
            result.status,
            result.executed_node_ids.len(),
            result.errors.len()
        );
        self.emit_completed(&result);
        result
    }

    /// Re-run `target_node_id`, everything downstream of it, and whatever
    /// those nodes depend on
    ///
    /// A missing target yields an error result with every node of `graph`
    /// idle. Otherwise the returned node states cover only the slice.
    pub async fn run_from_node(
        &self,
        graph: &GraphDefinition,
        target_node_id: &str,
        workflow_id: Option<&str>,
    ) -> EngineRunResult {
        let ctx = RunContext::new(workflow_id.map(str::to_string));
        self.run_from_node_with_context(graph, target_node_id, ctx).await
    }

    pub async fn run_from_node_with_context(
        &self,
        graph: &GraphDefinition,
        target_node_id: &str,
        ctx: RunContext,
    ) -> EngineRunResult {
        match compute_run_from_node_subgraph(graph, target_node_id) {
            Ok(slice) => self.run_workflow_with_context(&slice, ctx).await,
            Err(e) => {
                log::warn!("Run {} rejected: {}", ctx.run_id, e);
                let result = EngineRunResult::not_started(
                    ctx.run_id.clone(),
                    ctx.workflow_id.clone(),
                    graph,
                    ctx.started_at,
                    vec![e.to_string()],
                );
                self.emit_completed(&result);
                result
            }
        }
    }

    /// Check inputs, gather upstream values, and call the node's executor
    async fn execute_node(
        &self,
        node: &GraphNode,
        incoming: &[&GraphEdge],
        outputs: &HashMap<NodeId, PortValues>,
        ctx: &RunContext,
        logger: &NodeLogger,
        state: &mut NodeExecutionState,
    ) -> Result<PortValues> {
        let entry = self.registry.resolve(&node.node_type)?;

        for port in entry.metadata.required_inputs() {
            if !incoming.iter().any(|edge| edge.to.port == port.id) {
                return Err(NodeEngineError::MissingInput {
                    node_id: node.id.clone(),
                    port: port.id.clone(),
                });
            }
        }

        let inputs = gather_inputs(incoming, outputs)?;

        state.start(Utc::now());
        self.emit(WorkflowEvent::NodeStarted {
            run_id: ctx.run_id.clone(),
            node_id: node.id.clone(),
        });

        entry
            .executor
            .execute(NodeRequest {
                node_id: &node.id,
                config: &node.config,
                inputs,
                ctx,
                log: logger,
            })
            .await
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Err(e) = self.event_sink.send(event) {
            log::warn!("Dropping run event: {}", e);
        }
    }

    fn emit_completed(&self, result: &EngineRunResult) {
        self.emit(WorkflowEvent::RunCompleted {
            run_id: result.run_id.clone(),
            status: result.status,
            error_count: result.errors.len(),
        });
    }
}

/// Read each incoming edge's value from its source's output map
///
/// When several edges feed the same input port, the last one wins.
fn gather_inputs(
    incoming: &[&GraphEdge],
    outputs: &HashMap<NodeId, PortValues>,
) -> Result<PortValues> {
    let mut inputs = PortValues::new();
    for edge in incoming {
        let source = outputs.get(&edge.from.node_id).ok_or_else(|| {
            NodeEngineError::MissingUpstreamOutput(format!(
                "Missing upstream output from node {}.",
                edge.from.node_id
            ))
        })?;
        let value = source.get(&edge.from.port).ok_or_else(|| {
            NodeEngineError::MissingUpstreamOutput(format!(
                "Output port '{}' not produced by node {}.",
                edge.from.port, edge.from.node_id
            ))
        })?;
        inputs.insert(edge.to.port.clone(), value.clone());
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{PortMetadata, TaskMetadata};
    use crate::events::VecEventSink;
    use crate::types::{NodeCategory, PortDataType, PortRef};
    use serde_json::json;

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register_callback(
            TaskMetadata::new("source", NodeCategory::Prompts, "Source")
                .with_output(PortMetadata::required("text", "text", PortDataType::Text)),
            |_id, _inputs, config| async move {
                let mut out = PortValues::new();
                if let Some(text) = config.get("text") {
                    out.insert("text".to_string(), text.clone());
                }
                Ok(out)
            },
        );
        registry.register_callback(
            TaskMetadata::new("upper", NodeCategory::Generation, "Upper")
                .with_input(PortMetadata::required("text", "text", PortDataType::Text))
                .with_output(PortMetadata::required("text", "text", PortDataType::Text)),
            |_id, inputs, _config| async move {
                let text = inputs.get("text").and_then(|v| v.as_str()).unwrap_or_default();
                let mut out = PortValues::new();
                out.insert("text".to_string(), json!(text.to_uppercase()));
                Ok(out)
            },
        );
        registry
    }

    fn edge(from: &str, to: &str) -> GraphEdge {
        GraphEdge::new(PortRef::new(from, "text"), PortRef::new(to, "text"))
    }

    fn source(id: &str, text: Option<&str>) -> GraphNode {
        let mut node = GraphNode::new(id, "source");
        if let Some(text) = text {
            node.config.insert("text".to_string(), json!(text));
        }
        node
    }

    #[tokio::test]
    async fn test_values_flow_downstream() {
        let runner = WorkflowRunner::new(Arc::new(registry()));
        let graph = GraphDefinition::new(
            vec![GraphNode::new("b", "upper"), source("a", Some("hi"))],
            vec![edge("a", "b")],
        );

        let result = runner.run_workflow(&graph, Some("wf")).await;
        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.executed_node_ids, vec!["a", "b"]);
        assert_eq!(result.workflow_id.as_deref(), Some("wf"));
        let b = result.node_state("b").unwrap();
        assert_eq!(b.output.as_ref().unwrap()["text"], "HI");
    }

    #[tokio::test]
    async fn test_missing_upstream_field() {
        let runner = WorkflowRunner::new(Arc::new(registry()));
        let graph = GraphDefinition::new(
            vec![source("a", None), GraphNode::new("b", "upper")],
            vec![edge("a", "b")],
        );

        let result = runner.run_workflow(&graph, None).await;
        assert_eq!(result.status, RunStatus::Error);
        assert_eq!(
            result.errors,
            vec!["Node b: Output port 'text' not produced by node a."]
        );
        let b = result.node_state("b").unwrap();
        assert_eq!(b.duration_ms, Some(0));
        assert!(b
            .logs
            .last()
            .unwrap()
            .ends_with("ERROR: Output port 'text' not produced by node a."));
    }

    #[tokio::test]
    async fn test_events_follow_transitions() {
        let sink = Arc::new(VecEventSink::new());
        let runner = WorkflowRunner::new(Arc::new(registry())).with_event_sink(sink.clone());
        let graph = GraphDefinition::new(
            vec![GraphNode::new("orphan", "upper"), GraphNode::new("child", "upper")],
            vec![GraphEdge::new(PortRef::new("orphan", "text"), PortRef::new("child", "text"))],
        );

        let result = runner.run_workflow(&graph, None).await;
        let kinds: Vec<&'static str> = sink
            .events()
            .iter()
            .map(|e| match e {
                WorkflowEvent::RunStarted { .. } => "runStarted",
                WorkflowEvent::NodeStarted { .. } => "nodeStarted",
                WorkflowEvent::NodeCompleted { .. } => "nodeCompleted",
                WorkflowEvent::NodeFailed { .. } => "nodeFailed",
                WorkflowEvent::NodeSkipped { .. } => "nodeSkipped",
                WorkflowEvent::RunCompleted { .. } => "runCompleted",
            })
            .collect();

        assert_eq!(kinds, vec!["runStarted", "nodeFailed", "nodeSkipped", "runCompleted"]);
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_leaves_nodes_idle() {
        let runner = WorkflowRunner::new(Arc::new(registry()));
        let graph = GraphDefinition::new(
            vec![source("a", Some("x")), GraphNode::new("b", "mystery")],
            vec![],
        );

        let result = runner.run_workflow(&graph, None).await;
        assert_eq!(result.status, RunStatus::Error);
        assert!(result.executed_node_ids.is_empty());
        assert_eq!(result.errors, vec!["No node definition registered for type: mystery"]);
        assert!(result.node_states.values().all(|s| s.status == NodeStatus::Idle));
    }
}
