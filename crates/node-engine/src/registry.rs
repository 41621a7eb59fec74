//! Node type registry
//!
//! Maps node type strings to their metadata and executors. The registry is
//! pure lookup: it never runs anything itself, and side effects happen only
//! inside an executor's `execute`.
//!
//! # Usage
//!
//! ```ignore
//! use node_engine::{NodeRegistry, TaskDescriptor};
//!
//! let mut registry = NodeRegistry::new();
//! registry.register(MyTask::descriptor(), Arc::new(MyTask));
//! let entry = registry.resolve("my.task")?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{NodeLogger, RunContext};
use crate::descriptor::TaskMetadata;
use crate::error::{NodeEngineError, Result};
use crate::types::{ConfigMap, NodeCategory, PortValues};

/// Everything a node receives for one execution
pub struct NodeRequest<'a> {
    /// ID of the node instance being executed
    pub node_id: &'a str,
    /// The node's configuration, verbatim from the graph
    pub config: &'a ConfigMap,
    /// Upstream values keyed by this node's input port
    pub inputs: PortValues,
    /// The run this execution belongs to
    pub ctx: &'a RunContext,
    /// The node's log buffer
    pub log: &'a NodeLogger,
}

/// Per-node-type executor
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Execute this node type, returning its output values keyed by port
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues>;
}

/// A registration entry combining metadata with its executor
pub struct RegistryEntry {
    pub metadata: TaskMetadata,
    pub executor: Arc<dyn NodeExecutor>,
}

/// Registry of node types with their metadata and executors
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a node type with metadata and an executor
    ///
    /// Re-registering a type replaces the previous entry.
    pub fn register(&mut self, metadata: TaskMetadata, executor: Arc<dyn NodeExecutor>) {
        self.entries.insert(
            metadata.node_type.clone(),
            RegistryEntry { metadata, executor },
        );
    }

    /// Register a node type backed by an async closure
    ///
    /// The closure receives `(node_id, inputs, config)` and returns outputs.
    pub fn register_callback<F, Fut>(&mut self, metadata: TaskMetadata, callback: F)
    where
        F: Fn(String, PortValues, ConfigMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PortValues>> + Send + 'static,
    {
        let executor = CallbackNodeExecutor {
            callback: Box::new(move |node_id, inputs, config| {
                Box::pin(callback(node_id, inputs, config))
            }),
        };
        self.register(metadata, Arc::new(executor));
    }

    /// Look up a node type, failing when it is not registered
    pub fn resolve(&self, node_type: &str) -> Result<&RegistryEntry> {
        self.entries
            .get(node_type)
            .ok_or_else(|| NodeEngineError::NodeTypeNotFound(node_type.to_string()))
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<&TaskMetadata> {
        self.entries.get(node_type).map(|e| &e.metadata)
    }

    /// Get all registered metadata, sorted by node type
    pub fn all_metadata(&self) -> Vec<&TaskMetadata> {
        let mut all: Vec<&TaskMetadata> = self.entries.values().map(|e| &e.metadata).collect();
        all.sort_by(|a, b| a.node_type.cmp(&b.node_type));
        all
    }

    /// Get metadata grouped by category
    pub fn metadata_by_category(&self) -> HashMap<NodeCategory, Vec<&TaskMetadata>> {
        let mut grouped: HashMap<NodeCategory, Vec<&TaskMetadata>> = HashMap::new();
        for metadata in self.all_metadata() {
            grouped.entry(metadata.category).or_default().push(metadata);
        }
        grouped
    }

    /// Check if a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    /// List all registered node type strings
    pub fn node_types(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

type BoxedFuture = Pin<Box<dyn Future<Output = Result<PortValues>> + Send>>;

type BoxedCallback = Box<dyn Fn(String, PortValues, ConfigMap) -> BoxedFuture + Send + Sync>;

/// Async closure wrapped as a NodeExecutor
pub struct CallbackNodeExecutor {
    callback: BoxedCallback,
}

#[async_trait]
impl NodeExecutor for CallbackNodeExecutor {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        (self.callback)(
            request.node_id.to_string(),
            request.inputs,
            request.config.clone(),
        )
        .await
    }
}
