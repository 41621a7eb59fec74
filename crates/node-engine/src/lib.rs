//! Node Engine - typed workflow graph execution
//!
//! This crate validates and runs directed graphs of typed processing nodes:
//!
//! - Typed ports and self-describing port handles
//! - A registry mapping node types to metadata and async executors
//! - Structural and type-level validation that reports every problem at once
//! - Kahn scheduling and "run from node" graph slicing
//! - A sequential runner with upstream-failure propagation
//! - Immutable run results, run events, and run persistence
//!
//! # Architecture
//!
//! The runner never performs side effects itself. Everything external
//! (network, filesystem, processes) happens inside a `NodeExecutor`, and node
//! failures are recorded on the result instead of being returned as errors.
//!
//! # Example
//!
//! ```ignore
//! use node_engine::{GraphBuilder, NodeRegistry, WorkflowRunner};
//!
//! let graph = GraphBuilder::new()
//!     .add_node("prompt", "prompt.text")
//!     .with_config("text", serde_json::json!("Launch banner"))
//!     .add_node("hero", "hero.generate")
//!     .connect("prompt", "text", "hero", "text")
//!     .build();
//!
//! let runner = WorkflowRunner::new(Arc::new(registry));
//! let result = runner.run_workflow(&graph, Some("default-workflow")).await;
//! ```

pub mod adapter;
pub mod builder;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod handle;
pub mod registry;
pub mod result;
pub mod runner;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod validation;

// Re-export key types
pub use adapter::{
    ConnectionRejection, GraphAdapter, GraphSnapshot, ProposedConnection, SnapshotEdge,
    SnapshotNode, SnapshotNodeData,
};
pub use builder::GraphBuilder;
pub use context::{format_timestamp, NodeLogger, RunContext};
pub use descriptor::{PortMetadata, TaskDescriptor, TaskMetadata};
pub use error::{NodeEngineError, Result};
pub use events::{
    ChannelEventSink, EventError, EventSink, NullEventSink, VecEventSink, WorkflowEvent,
};
pub use handle::{decode_handle, encode_handle, PortDirection, PortHandle};
pub use registry::{NodeExecutor, NodeRegistry, NodeRequest, RegistryEntry};
pub use result::{
    EngineRunResult, NodeExecutionState, NodeStatus, RunHistoryItem, RunStatus, SKIPPED_MESSAGE,
};
pub use runner::WorkflowRunner;
pub use scheduler::{compute_run_from_node_subgraph, topo_sort, TopoOrder};
pub use store::{FileRunStore, InMemoryRunStore, RunStore, DEFAULT_WORKFLOW_ID};
pub use types::{
    ConfigMap, GraphDefinition, GraphEdge, GraphNode, NodeCategory, NodeId, PortDataType,
    PortRef, PortValues,
};
pub use validation::{validate_graph, ValidationError};
