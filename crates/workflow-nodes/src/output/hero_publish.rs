//! Publish Node
//!
//! Records a finished hero in the local catalog together with a placeholder
//! thumbnail.

use std::sync::Arc;

use async_trait::async_trait;
use node_engine::{
    NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata, PortValues, Result,
    TaskDescriptor, TaskMetadata,
};
use serde_json::Value;

use crate::services::{HeroCatalog, NewHeroRecord, WorkspaceService};
use crate::values::{config_text, input_as, input_object, output, require, PreviewRef, WorkspaceRef};

/// Publish Node
///
/// # Inputs
/// - `heroArtifact` (required)
/// - `workspace` (required) - `{path, heroId}`
/// - `preview` (required) - `{url, port, pid}`
///
/// # Config
/// - `titleOverride` - Used instead of the artifact prompt as title
///
/// # Outputs
/// - `json` - The published catalog record
pub struct HeroPublishNode {
    workspace: Arc<dyn WorkspaceService>,
    catalog: Arc<dyn HeroCatalog>,
}

impl HeroPublishNode {
    pub const NODE_TYPE: &'static str = "hero.publish";
    pub const PORT_HERO_ARTIFACT: &'static str = "heroArtifact";
    pub const PORT_WORKSPACE: &'static str = "workspace";
    pub const PORT_PREVIEW: &'static str = "preview";
    pub const PORT_JSON: &'static str = "json";

    pub fn new(workspace: Arc<dyn WorkspaceService>, catalog: Arc<dyn HeroCatalog>) -> Self {
        Self { workspace, catalog }
    }
}

impl TaskDescriptor for HeroPublishNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Output, "Publish")
            .with_description("Save published hero record locally")
            .with_input(PortMetadata::required(
                Self::PORT_HERO_ARTIFACT,
                "heroArtifact",
                PortDataType::HeroArtifact,
            ))
            .with_input(PortMetadata::required(
                Self::PORT_WORKSPACE,
                "workspace",
                PortDataType::Workspace,
            ))
            .with_input(PortMetadata::required(
                Self::PORT_PREVIEW,
                "preview",
                PortDataType::Preview,
            ))
            .with_output(PortMetadata::required(
                Self::PORT_JSON,
                "json(published)",
                PortDataType::Json,
            ))
            .with_default_ports(Some(Self::PORT_HERO_ARTIFACT), Some(Self::PORT_JSON))
    }
}

#[async_trait]
impl NodeExecutor for HeroPublishNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let artifact = input_object(&request.inputs, Self::PORT_HERO_ARTIFACT);
        let workspace = input_as::<WorkspaceRef>(&request.inputs, Self::PORT_WORKSPACE);
        let preview = input_as::<PreviewRef>(&request.inputs, Self::PORT_PREVIEW);
        let (artifact, workspace, preview) = require(
            artifact.zip(workspace).zip(preview).map(|((a, w), p)| (a, w, p)),
            "hero.publish requires heroArtifact, workspace, and preview inputs",
        )?;

        let artifact_text = |key: &str| {
            artifact
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let hero_id = artifact_text("heroId").unwrap_or_else(|| workspace.hero_id.clone());
        let title = config_text(request.config, "titleOverride")
            .or_else(|| artifact_text("prompt"))
            .unwrap_or_else(|| "Generated Hero".to_string());

        let thumbnail = self
            .workspace
            .create_placeholder_thumbnail(&hero_id, &title)
            .await?;
        let record = self
            .catalog
            .publish(NewHeroRecord {
                title,
                hero_id,
                workspace_path: workspace.path,
                preview_url: preview.url,
                thumbnail_path: thumbnail.relative_path,
            })
            .await?;

        request.log.log(format!("Published hero {}", record.id));
        output(Self::PORT_JSON, record)
    }
}
