//! Negative Prompt Node

use async_trait::async_trait;
use node_engine::{
    NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata, PortValues, Result,
    TaskDescriptor, TaskMetadata,
};

use crate::values::{config_text, output, require};

/// Emits the things a generated hero should avoid
///
/// # Config
/// - `text` (required) - The negative prompt, trimmed
///
/// # Outputs
/// - `text` - The negative prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptNegativeNode;

impl PromptNegativeNode {
    pub const NODE_TYPE: &'static str = "prompt.negative";
    pub const PORT_TEXT: &'static str = "text";
}

impl TaskDescriptor for PromptNegativeNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Prompts, "Negative Prompt")
            .with_description("Constraints and things to avoid")
            .with_output(PortMetadata::required(
                Self::PORT_TEXT,
                "text",
                PortDataType::Text,
            ))
            .with_default_ports(None, Some(Self::PORT_TEXT))
    }
}

#[async_trait]
impl NodeExecutor for PromptNegativeNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let text = require(
            config_text(request.config, "text"),
            "Negative prompt text is required",
        )?;
        request
            .log
            .log(format!("Negative prompt length: {} chars", text.chars().count()));
        output(Self::PORT_TEXT, text)
    }
}
