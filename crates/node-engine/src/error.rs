//! Error types for the node engine

use thiserror::Error;

/// Result type alias using NodeEngineError
pub type Result<T> = std::result::Result<T, NodeEngineError>;

/// Errors that can occur in the node engine
#[derive(Debug, Error)]
pub enum NodeEngineError {
    /// No definition is registered for a node type. Fatal, never retried.
    #[error("No node definition registered for type: {0}")]
    NodeTypeNotFound(String),

    /// A UI snapshot names a node kind with no engine type
    #[error("Unsupported UI node kind '{0}'")]
    UnsupportedKind(String),

    /// A required input port has no wired source
    #[error("Missing required input '{port}' on node {node_id}.")]
    MissingInput { node_id: String, port: String },

    /// An upstream node produced no output, or not the referenced field
    #[error("{0}")]
    MissingUpstreamOutput(String),

    /// Node execution failed
    #[error("{0}")]
    ExecutionFailed(String),

    /// Run-from-node target is not part of the graph
    #[error("Target node '{0}' was not found in graph.")]
    TargetNotFound(String),

    /// Run store failure
    #[error("Run store error: {0}")]
    Store(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeEngineError {
    /// Create an execution failed error with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }
}
