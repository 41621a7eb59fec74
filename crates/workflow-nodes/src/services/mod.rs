//! Local collaborators the output nodes call into
//!
//! Nodes only see the traits; the host decides which implementations to
//! hand them through [`crate::Services`].

pub mod catalog;
pub mod preview;
pub mod vision;
pub mod workspace;

pub use catalog::{HeroCatalog, HeroRecord, JsonHeroCatalog, NewHeroRecord};
pub use preview::{PreviewInfo, PreviewProcess, PreviewRegistry};
pub use vision::{OpenRouterVisionService, VisionPromptService};
pub use workspace::{
    sanitize_hero_id, ApplyOptions, FileNodeKind, LocalWorkspaceService, Thumbnail,
    WorkspaceFileNode, WorkspaceService,
};
