//! The closed set of built-in node kinds
//!
//! Every match here is exhaustive, so adding a kind without metadata or an
//! executor fails to compile.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use node_engine::{NodeExecutor, TaskDescriptor, TaskMetadata};
use serde::{Deserialize, Serialize};

use crate::generation::{AnimationConfigNode, PatchPlanGenerateNode, ThemeConfigNode};
use crate::input::ImageInputNode;
use crate::output::{HeroGenerateNode, HeroPublishNode, PreviewRunNode, WorkspaceApplyNode};
use crate::prompt::{PromptCombineNode, PromptNegativeNode, PromptTextNode};
use crate::setup::Services;

/// A built-in node kind, serialized as its editor (UI) name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    ImageInput,
    Prompt,
    PromptNegative,
    CombinePrompt,
    Theme,
    Animation,
    GenerateHero,
    PatchPlanGenerate,
    WorkspaceApply,
    PreviewRun,
    HeroPublish,
}

impl NodeKind {
    pub const ALL: [NodeKind; 11] = [
        NodeKind::ImageInput,
        NodeKind::Prompt,
        NodeKind::PromptNegative,
        NodeKind::CombinePrompt,
        NodeKind::Theme,
        NodeKind::Animation,
        NodeKind::GenerateHero,
        NodeKind::PatchPlanGenerate,
        NodeKind::WorkspaceApply,
        NodeKind::PreviewRun,
        NodeKind::HeroPublish,
    ];

    /// Engine node type, e.g. `hero.generate`
    pub fn engine_type(&self) -> &'static str {
        match self {
            Self::ImageInput => ImageInputNode::NODE_TYPE,
            Self::Prompt => PromptTextNode::NODE_TYPE,
            Self::PromptNegative => PromptNegativeNode::NODE_TYPE,
            Self::CombinePrompt => PromptCombineNode::NODE_TYPE,
            Self::Theme => ThemeConfigNode::NODE_TYPE,
            Self::Animation => AnimationConfigNode::NODE_TYPE,
            Self::GenerateHero => HeroGenerateNode::NODE_TYPE,
            Self::PatchPlanGenerate => PatchPlanGenerateNode::NODE_TYPE,
            Self::WorkspaceApply => WorkspaceApplyNode::NODE_TYPE,
            Self::PreviewRun => PreviewRunNode::NODE_TYPE,
            Self::HeroPublish => HeroPublishNode::NODE_TYPE,
        }
    }

    /// Editor kind, e.g. `generateHero`
    pub fn ui_kind(&self) -> &'static str {
        match self {
            Self::ImageInput => "imageInput",
            Self::Prompt => "prompt",
            Self::PromptNegative => "promptNegative",
            Self::CombinePrompt => "combinePrompt",
            Self::Theme => "theme",
            Self::Animation => "animation",
            Self::GenerateHero => "generateHero",
            Self::PatchPlanGenerate => "patchPlanGenerate",
            Self::WorkspaceApply => "workspaceApply",
            Self::PreviewRun => "previewRun",
            Self::HeroPublish => "heroPublish",
        }
    }

    pub fn from_ui_kind(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.ui_kind() == kind)
    }

    pub fn from_engine_type(node_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.engine_type() == node_type)
    }

    pub fn descriptor(&self) -> TaskMetadata {
        match self {
            Self::ImageInput => ImageInputNode::descriptor(),
            Self::Prompt => PromptTextNode::descriptor(),
            Self::PromptNegative => PromptNegativeNode::descriptor(),
            Self::CombinePrompt => PromptCombineNode::descriptor(),
            Self::Theme => ThemeConfigNode::descriptor(),
            Self::Animation => AnimationConfigNode::descriptor(),
            Self::GenerateHero => HeroGenerateNode::descriptor(),
            Self::PatchPlanGenerate => PatchPlanGenerateNode::descriptor(),
            Self::WorkspaceApply => WorkspaceApplyNode::descriptor(),
            Self::PreviewRun => PreviewRunNode::descriptor(),
            Self::HeroPublish => HeroPublishNode::descriptor(),
        }
    }

    /// Executor for this kind, wired to `services`
    pub fn executor(&self, services: &Services) -> Arc<dyn NodeExecutor> {
        match self {
            Self::ImageInput => Arc::new(ImageInputNode::new(services.vision.clone())),
            Self::Prompt => Arc::new(PromptTextNode),
            Self::PromptNegative => Arc::new(PromptNegativeNode),
            Self::CombinePrompt => Arc::new(PromptCombineNode),
            Self::Theme => Arc::new(ThemeConfigNode),
            Self::Animation => Arc::new(AnimationConfigNode),
            Self::GenerateHero => Arc::new(HeroGenerateNode),
            Self::PatchPlanGenerate => Arc::new(PatchPlanGenerateNode),
            Self::WorkspaceApply => Arc::new(WorkspaceApplyNode::new(services.workspace.clone())),
            Self::PreviewRun => Arc::new(PreviewRunNode::new(services.workspace.clone())),
            Self::HeroPublish => Arc::new(HeroPublishNode::new(
                services.workspace.clone(),
                services.catalog.clone(),
            )),
        }
    }

    /// UI kind to engine type, as the graph adapter expects it
    pub fn ui_kind_map() -> HashMap<String, String> {
        Self::ALL
            .into_iter()
            .map(|k| (k.ui_kind().to_string(), k.engine_type().to_string()))
            .collect()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ui_kind())
    }
}
