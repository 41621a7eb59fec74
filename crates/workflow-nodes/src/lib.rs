//! Workflow Nodes
//!
//! The built-in node kinds of the hero workbench, and the local services
//! they call.
//!
//! # Categories
//!
//! - **Inputs**: image input with optional vision-model prompt extraction
//! - **Prompts**: prompt text, negative prompt, prompt combine
//! - **Generation**: theme, animation, patch plan
//! - **Output**: hero artifact, workspace apply, preview run, publish

pub mod config;
pub mod error;
pub mod generation;
pub mod input;
pub mod kind;
pub mod output;
pub mod prompt;
pub mod services;
pub mod setup;
pub mod values;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{PreviewConfig, ServicesConfig, VisionConfig};
pub use error::{Result, ServiceError};
pub use generation::*;
pub use input::*;
pub use kind::NodeKind;
pub use output::*;
pub use prompt::*;
pub use setup::{builtin_registry, Services};
pub use values::{FileOp, PatchPlan, PreviewRef, WorkspaceRef};
