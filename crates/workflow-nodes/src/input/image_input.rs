//! Image Input Node
//!
//! Resolves an image reference and, in vision mode, asks a vision model for
//! a prompt describing it.

use std::sync::Arc;

use async_trait::async_trait;
use node_engine::{
    NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata, PortValues, Result,
    TaskDescriptor, TaskMetadata,
};
use serde_json::json;

use crate::services::VisionPromptService;
use crate::values::{config_text, config_text_or, require, unless_cancelled};

/// Image Input Node
///
/// # Config
/// - `imagePath` (required) - Local path or URL of the image
/// - `mode` - `visionPrompt` (default) or `passthrough`
/// - `openRouterModel` - Vision model id
///
/// # Outputs
/// - `image` - `{path}`
/// - `text` - The extracted prompt (vision mode only)
pub struct ImageInputNode {
    vision: Arc<dyn VisionPromptService>,
}

impl ImageInputNode {
    pub const NODE_TYPE: &'static str = "input.image";
    /// Port ID for the image reference output
    pub const PORT_IMAGE: &'static str = "image";
    /// Port ID for the extracted prompt output
    pub const PORT_TEXT: &'static str = "text";
    pub const DEFAULT_MODEL: &'static str = "qwen/qwen3-vl-235b-a22b-thinking";

    pub fn new(vision: Arc<dyn VisionPromptService>) -> Self {
        Self { vision }
    }
}

impl TaskDescriptor for ImageInputNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Inputs, "Image Input")
            .with_description("Load image and extract prompt via OpenRouter")
            .with_output(PortMetadata::required(
                Self::PORT_IMAGE,
                "image",
                PortDataType::Image,
            ))
            .with_output(PortMetadata::optional(
                Self::PORT_TEXT,
                "text(prompt)",
                PortDataType::Text,
            ))
            .with_default_ports(None, Some(Self::PORT_IMAGE))
    }
}

#[async_trait]
impl NodeExecutor for ImageInputNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let image_path = require(
            config_text(request.config, "imagePath"),
            "imagePath is required",
        )?;
        request.log.log(format!("Resolved image path: {}", image_path));

        let mut outputs = PortValues::new();
        outputs.insert(Self::PORT_IMAGE.to_string(), json!({ "path": image_path }));

        if config_text_or(request.config, "mode", "visionPrompt") == "passthrough" {
            return Ok(outputs);
        }

        let model = config_text_or(request.config, "openRouterModel", Self::DEFAULT_MODEL);
        request.log.log(format!("Extracting prompt with {}", model));
        let extracted =
            unless_cancelled(request.ctx, self.vision.extract_prompt(&image_path, &model)).await?;
        let prompt = extracted
            .get("prompt")
            .and_then(|p| p.as_str())
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let prompt = require(
            Some(prompt).filter(|p| !p.is_empty()),
            "Vision model returned no prompt",
        )?;

        request
            .log
            .log(format!("Extracted prompt: {} chars", prompt.chars().count()));
        outputs.insert(Self::PORT_TEXT.to_string(), json!(prompt));
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cancel_soon, execute, execute_in, FakeVision, Stalled};
    use crate::values::CANCELLED_MESSAGE;
    use node_engine::RunContext;
    use std::time::Duration;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_vision_mode_outputs_image_and_prompt() {
        let vision = Arc::new(FakeVision::answering("A caped hero"));
        let node = ImageInputNode::new(vision.clone());

        let outcome = execute(&node, json!({"imagePath": " /img/hero.png "}), json!({})).await;
        let output = outcome.output();
        assert_eq!(output["image"], json!({"path": "/img/hero.png"}));
        assert_eq!(output["text"], "A caped hero");
        assert!(outcome.logged("Resolved image path: /img/hero.png"));
        assert_eq!(
            vision.calls.lock()[0],
            ("/img/hero.png".to_string(), ImageInputNode::DEFAULT_MODEL.to_string())
        );
    }

    #[tokio::test]
    async fn test_passthrough_skips_vision() {
        let vision = Arc::new(FakeVision::answering("unused"));
        let node = ImageInputNode::new(vision.clone());

        let outcome = execute(
            &node,
            json!({"imagePath": "https://x.test/a.png", "mode": "passthrough"}),
            json!({}),
        )
        .await;
        assert_eq!(outcome.output().len(), 1);
        assert!(vision.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_errors() {
        let node = ImageInputNode::new(Arc::new(FakeVision::answering("x")));
        assert_eq!(
            execute(&node, json!({"imagePath": "  "}), json!({})).await.error(),
            "imagePath is required"
        );

        let failing = ImageInputNode::new(Arc::new(FakeVision {
            prompt: None,
            calls: Mutex::new(Vec::new()),
        }));
        assert_eq!(
            execute(&failing, json!({"imagePath": "a.png"}), json!({})).await.error(),
            "OPENROUTER_API_KEY is not set; cannot call the vision model."
        );
    }

    #[test]
    fn test_descriptor() {
        let meta = ImageInputNode::descriptor();
        assert!(meta.inputs.is_empty());
        assert_eq!(meta.output_type("image"), Some(PortDataType::Image));
        assert_eq!(meta.output_type("text"), Some(PortDataType::Text));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_vision_call() {
        let node = ImageInputNode::new(Arc::new(Stalled));
        let ctx = RunContext::new(None);
        cancel_soon(&ctx);

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            execute_in(&node, &ctx, json!({"imagePath": "a.png"}), json!({})),
        )
        .await
        .expect("vision call ignored cancellation");
        assert_eq!(outcome.error(), CANCELLED_MESSAGE);
    }
}
