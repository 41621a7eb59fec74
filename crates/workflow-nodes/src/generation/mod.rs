//! Generation nodes
//!
//! Style configuration and the patch plan that turns an artifact into files.

mod animation_config;
mod patch_plan;
mod theme_config;

pub use animation_config::{AnimationConfigNode, AnimationSettings};
pub use patch_plan::PatchPlanGenerateNode;
pub use theme_config::{ThemeConfigNode, ThemeSettings};
