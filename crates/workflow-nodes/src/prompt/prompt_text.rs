//! Prompt Text Node
//!
//! Emits the main prompt typed into the node's config.

use async_trait::async_trait;
use node_engine::{
    NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata, PortValues, Result,
    TaskDescriptor, TaskMetadata,
};

use crate::values::{config_text, output, require};

/// Prompt Text Node
///
/// # Config
/// - `text` (required) - The prompt, trimmed
///
/// # Outputs
/// - `text` - The prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptTextNode;

impl PromptTextNode {
    pub const NODE_TYPE: &'static str = "prompt.text";
    /// Port ID for text output
    pub const PORT_TEXT: &'static str = "text";
}

impl TaskDescriptor for PromptTextNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Prompts, "Prompt")
            .with_description("Main text for the hero section")
            .with_output(PortMetadata::required(
                Self::PORT_TEXT,
                "text",
                PortDataType::Text,
            ))
            .with_default_ports(None, Some(Self::PORT_TEXT))
    }
}

#[async_trait]
impl NodeExecutor for PromptTextNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let text = require(config_text(request.config, "text"), "Prompt text is required")?;
        request
            .log
            .log(format!("Prompt length: {} chars", text.chars().count()));
        output(Self::PORT_TEXT, text)
    }
}
