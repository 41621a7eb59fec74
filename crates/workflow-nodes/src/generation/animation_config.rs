//! Animation Config Node

use async_trait::async_trait;
use node_engine::{
    NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata, PortValues, Result,
    TaskDescriptor, TaskMetadata,
};
use serde::{Deserialize, Serialize};

use crate::values::{config_number, config_text_or, output};

/// Motion preset applied to a hero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// `fadeUp`, `stagger`, `clipReveal` or `parallaxLite`
    pub preset: String,
    pub speed: f64,
    pub intensity: f64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            preset: "fadeUp".to_string(),
            speed: 1.0,
            intensity: 60.0,
        }
    }
}

/// Builds an animation object from config
///
/// Non-numeric `speed`/`intensity` fall back to their defaults.
///
/// # Outputs
/// - `json` - [`AnimationSettings`]
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimationConfigNode;

impl AnimationConfigNode {
    pub const NODE_TYPE: &'static str = "animation.config";
    pub const PORT_JSON: &'static str = "json";
}

impl TaskDescriptor for AnimationConfigNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Generation, "Animation")
            .with_description("Configure motion presets")
            .with_output(PortMetadata::required(
                Self::PORT_JSON,
                "json(animation)",
                PortDataType::Json,
            ))
            .with_default_ports(None, Some(Self::PORT_JSON))
    }
}

#[async_trait]
impl NodeExecutor for AnimationConfigNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let defaults = AnimationSettings::default();
        let settings = AnimationSettings {
            preset: config_text_or(request.config, "preset", &defaults.preset),
            speed: config_number(request.config, "speed").unwrap_or(defaults.speed),
            intensity: config_number(request.config, "intensity").unwrap_or(defaults.intensity),
        };

        request
            .log
            .log(format!("Animation preset: {}", settings.preset));
        output(Self::PORT_JSON, settings)
    }
}
