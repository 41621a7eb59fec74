//! Generate Hero Node
//!
//! Assembles the hero artifact that the patch plan and publish nodes consume.

use async_trait::async_trait;
use chrono::Utc;
use node_engine::{
    format_timestamp, NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata,
    PortValues, Result, TaskDescriptor, TaskMetadata,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::generation::{AnimationSettings, ThemeSettings};
use crate::values::{config_bool, config_text_or, input_text, output, require};

/// Everything known about a generated hero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroArtifact {
    pub hero_id: String,
    pub created_at: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub theme: Value,
    pub animation: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
    pub quality: String,
    pub include_preview: bool,
}

/// `hero_` plus the first 12 hex chars of SHA-256 over `runId:nodeId:prompt`
pub fn stable_hero_id(run_id: &str, node_id: &str, prompt: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}:{}", run_id, node_id, prompt).as_bytes());
    let hex: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();
    format!("hero_{}", hex)
}

/// Generate Hero Node
///
/// # Inputs
/// - `text` (required) - The prompt
/// - `jsonTheme` (optional) - Defaults to [`ThemeSettings::default`]
/// - `jsonAnimation` (optional) - Defaults to [`AnimationSettings::default`]
/// - `image` (optional)
/// - `negative` (optional)
///
/// # Outputs
/// - `heroArtifact` - [`HeroArtifact`]
#[derive(Debug, Clone, Copy, Default)]
pub struct HeroGenerateNode;

impl HeroGenerateNode {
    pub const NODE_TYPE: &'static str = "hero.generate";
    pub const PORT_TEXT: &'static str = "text";
    pub const PORT_JSON_THEME: &'static str = "jsonTheme";
    pub const PORT_JSON_ANIMATION: &'static str = "jsonAnimation";
    pub const PORT_IMAGE: &'static str = "image";
    pub const PORT_NEGATIVE: &'static str = "negative";
    pub const PORT_HERO_ARTIFACT: &'static str = "heroArtifact";
}

impl TaskDescriptor for HeroGenerateNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Output, "Generate Hero")
            .with_description("Combine inputs to generate artifact")
            .with_input(PortMetadata::required(
                Self::PORT_TEXT,
                "text",
                PortDataType::Text,
            ))
            .with_input(PortMetadata::optional(
                Self::PORT_JSON_THEME,
                "json(theme)",
                PortDataType::Json,
            ))
            .with_input(PortMetadata::optional(
                Self::PORT_JSON_ANIMATION,
                "json(animation)",
                PortDataType::Json,
            ))
            .with_input(PortMetadata::optional(
                Self::PORT_IMAGE,
                "image(optional)",
                PortDataType::Image,
            ))
            .with_input(PortMetadata::optional(
                Self::PORT_NEGATIVE,
                "negative(optional)",
                PortDataType::Text,
            ))
            .with_output(PortMetadata::required(
                Self::PORT_HERO_ARTIFACT,
                "heroArtifact",
                PortDataType::HeroArtifact,
            ))
            .with_default_ports(Some(Self::PORT_TEXT), Some(Self::PORT_HERO_ARTIFACT))
    }
}

#[async_trait]
impl NodeExecutor for HeroGenerateNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let prompt = require(
            input_text(&request.inputs, Self::PORT_TEXT),
            "Generate Hero requires text input",
        )?;

        let object = |port: &str| request.inputs.get(port).filter(|v| v.is_object()).cloned();
        let theme = match object(Self::PORT_JSON_THEME) {
            Some(theme) => theme,
            None => serde_json::to_value(ThemeSettings::default())?,
        };
        let animation = match object(Self::PORT_JSON_ANIMATION) {
            Some(animation) => animation,
            None => serde_json::to_value(AnimationSettings::default())?,
        };

        let artifact = HeroArtifact {
            hero_id: stable_hero_id(&request.ctx.run_id, request.node_id, &prompt),
            created_at: format_timestamp(Utc::now()),
            negative_prompt: input_text(&request.inputs, Self::PORT_NEGATIVE),
            image: object(Self::PORT_IMAGE),
            prompt,
            theme,
            animation,
            quality: config_text_or(request.config, "quality", "draft"),
            include_preview: config_bool(request.config, "includePreview", true),
        };

        request
            .log
            .log(format!("Hero artifact generated: {}", artifact.hero_id));
        output(Self::PORT_HERO_ARTIFACT, artifact)
    }
}
