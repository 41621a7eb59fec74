//! Typed payloads carried on ports, and lenient config readers
//!
//! Config values arrive from editor forms, so numbers and booleans may be
//! encoded as strings.

use std::future::Future;

use node_engine::{ConfigMap, NodeEngineError, PortValues, RunContext};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One file-system operation inside a workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileOp {
    Mkdir { path: String },
    Write { path: String, content: String },
}

impl FileOp {
    pub fn path(&self) -> &str {
        match self {
            Self::Mkdir { path } | Self::Write { path, .. } => path,
        }
    }
}

/// Ordered operations that materialize one hero into a workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchPlan {
    pub hero_id: String,
    pub workspace_name: String,
    pub ops: Vec<FileOp>,
}

/// A materialized workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRef {
    pub path: String,
    pub hero_id: String,
}

/// A running preview server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRef {
    pub url: String,
    pub port: u16,
    pub pid: u32,
}

/// Read a port value as `T`, or `None` when absent or the wrong shape
pub fn input_as<T: DeserializeOwned>(inputs: &PortValues, port: &str) -> Option<T> {
    inputs
        .get(port)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// Read a port value that must be a JSON object
pub fn input_object<'a>(
    inputs: &'a PortValues,
    port: &str,
) -> Option<&'a serde_json::Map<String, Value>> {
    inputs.get(port).and_then(Value::as_object)
}

/// A config value as trimmed text; blank strings count as missing
pub fn config_text(config: &ConfigMap, key: &str) -> Option<String> {
    match config.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `config_text` with a fallback
pub fn config_text_or(config: &ConfigMap, key: &str, default: &str) -> String {
    config_text(config, key).unwrap_or_else(|| default.to_string())
}

/// A boolean that may be encoded as `"true"`/`"false"`
pub fn config_bool(config: &ConfigMap, key: &str, default: bool) -> bool {
    match config.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim() == "true",
        Some(_) => false,
        None => default,
    }
}

/// A finite number that may be encoded as a string
pub fn config_number(config: &ConfigMap, key: &str) -> Option<f64> {
    let n = match config.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Single-entry output map
pub fn output(port: &str, value: impl Serialize) -> node_engine::Result<PortValues> {
    let mut outputs = PortValues::new();
    outputs.insert(port.to_string(), serde_json::to_value(value)?);
    Ok(outputs)
}

/// Text input, trimmed; blank counts as missing
pub fn input_text(inputs: &PortValues, port: &str) -> Option<String> {
    inputs
        .get(port)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn require<T>(value: Option<T>, message: &str) -> node_engine::Result<T> {
    value.ok_or_else(|| NodeEngineError::failed(message))
}

/// Node error recorded when the run's token fires during external work
pub const CANCELLED_MESSAGE: &str = "Run cancelled.";

/// Await `work` unless the run is cancelled first
///
/// An already-cancelled token wins without polling `work`. Dropping `work`
/// drops any child process it owns.
pub(crate) async fn unless_cancelled<T, E, F>(ctx: &RunContext, work: F) -> node_engine::Result<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<NodeEngineError>,
{
    tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Err(NodeEngineError::failed(CANCELLED_MESSAGE)),
        result = work => result.map_err(Into::into),
    }
}
