//! Errors raised by the local services nodes call into

use std::path::PathBuf;

use node_engine::NodeEngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A resolved path left the directory it must stay in
    #[error("Path escapes allowed directory.")]
    PathEscape,

    #[error("Invalid patch path '{0}'.")]
    InvalidPatchPath(String),

    /// A patch path is well-formed but outside the hero's subtree
    #[error("Patch path '{path}' is outside {root}/.")]
    PatchPathOutsideHero { path: String, root: String },

    #[error("Starter template not found at {}.", .0.display())]
    TemplateMissing(PathBuf),

    #[error("{0} is required for preview.run. Please install {0} and retry.")]
    PackageManagerMissing(String),

    #[error("{0}")]
    InstallFailed(String),

    #[error("No free port available between {start} and {end}.")]
    NoFreePort { start: u16, end: u16 },

    #[error("Failed to start preview process.")]
    PreviewSpawn,

    #[error("Preview server did not become ready in time.")]
    PreviewNotReady,

    /// No API key for the vision model
    #[error("{0} is not set; cannot call the vision model.")]
    MissingCredential(String),

    #[error("Vision prompt extraction failed: {0}")]
    Vision(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Service failures surface on the node verbatim
impl From<ServiceError> for NodeEngineError {
    fn from(e: ServiceError) -> Self {
        NodeEngineError::ExecutionFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_reach_the_node_verbatim() {
        let err: NodeEngineError = ServiceError::PatchPathOutsideHero {
            path: "src/other/x.ts".to_string(),
            root: "src/heroes/abc".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Patch path 'src/other/x.ts' is outside src/heroes/abc/.");

        assert_eq!(
            ServiceError::PackageManagerMissing("pnpm".to_string()).to_string(),
            "pnpm is required for preview.run. Please install pnpm and retry."
        );
    }
}
