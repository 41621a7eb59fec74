//! Output nodes
//!
//! Nodes that produce the hero artifact and act on it: workspace, preview,
//! and publishing.

mod hero_generate;
mod hero_publish;
mod preview_run;
mod workspace_apply;

pub use hero_generate::{stable_hero_id, HeroArtifact, HeroGenerateNode};
pub use hero_publish::HeroPublishNode;
pub use preview_run::PreviewRunNode;
pub use workspace_apply::WorkspaceApplyNode;
