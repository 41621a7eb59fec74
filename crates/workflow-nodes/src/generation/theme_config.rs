//! Theme Config Node

use async_trait::async_trait;
use node_engine::{
    NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata, PortValues, Result,
    TaskDescriptor, TaskMetadata,
};
use serde::{Deserialize, Serialize};

use crate::values::{config_text_or, output};

/// Color scheme, accent color and font of a hero
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    /// `dark` or `light`
    pub theme: String,
    pub primary_color: String,
    pub font_preset: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            primary_color: "#21d4a7".to_string(),
            font_preset: "cinematic-sans".to_string(),
        }
    }
}

/// Builds a theme object from config
///
/// # Config
/// - `theme` - `light`, anything else means `dark`
/// - `primaryColor` - Defaults to `#21d4a7`
/// - `fontPreset` - Defaults to `cinematic-sans`
///
/// # Outputs
/// - `json` - [`ThemeSettings`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeConfigNode;

impl ThemeConfigNode {
    pub const NODE_TYPE: &'static str = "theme.config";
    pub const PORT_JSON: &'static str = "json";
}

impl TaskDescriptor for ThemeConfigNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Generation, "Theme")
            .with_description("Configure colors, font, and mode")
            .with_output(PortMetadata::required(
                Self::PORT_JSON,
                "json(theme)",
                PortDataType::Json,
            ))
            .with_default_ports(None, Some(Self::PORT_JSON))
    }
}

#[async_trait]
impl NodeExecutor for ThemeConfigNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let defaults = ThemeSettings::default();
        let theme = match config_text_or(request.config, "theme", &defaults.theme).as_str() {
            "light" => "light",
            _ => "dark",
        };
        let settings = ThemeSettings {
            theme: theme.to_string(),
            primary_color: config_text_or(request.config, "primaryColor", &defaults.primary_color),
            font_preset: config_text_or(request.config, "fontPreset", &defaults.font_preset),
        };

        request.log.log(format!("Theme prepared: {}", settings.theme));
        output(Self::PORT_JSON, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::execute;
    use serde_json::json;

    #[tokio::test]
    async fn test_defaults() {
        let outcome = execute(&ThemeConfigNode, json!({}), json!({})).await;
        assert_eq!(
            outcome.output()["json"],
            json!({"theme": "dark", "primaryColor": "#21d4a7", "fontPreset": "cinematic-sans"})
        );
        assert!(outcome.logged("Theme prepared: dark"));
    }

    #[tokio::test]
    async fn test_unknown_theme_falls_back_to_dark() {
        let outcome = execute(
            &ThemeConfigNode,
            json!({"theme": "sepia", "primaryColor": "#ff0000", "fontPreset": "editorial"}),
            json!({}),
        )
        .await;
        let theme = &outcome.output()["json"];
        assert_eq!(theme["theme"], "dark");
        assert_eq!(theme["primaryColor"], "#ff0000");

        let outcome = execute(&ThemeConfigNode, json!({"theme": "light"}), json!({})).await;
        assert_eq!(outcome.output()["json"]["theme"], "light");
    }
}
