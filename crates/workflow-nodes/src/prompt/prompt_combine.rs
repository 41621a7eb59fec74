//! Combine Prompt Node
//!
//! Joins two prompts, either line by line or through a template with
//! `{a}` and `{b}` placeholders.

use async_trait::async_trait;
use node_engine::{
    NodeCategory, NodeExecutor, NodeRequest, PortDataType, PortMetadata, PortValues, Result,
    TaskDescriptor, TaskMetadata,
};
use serde_json::Value;

use crate::values::{config_text, config_text_or, output, require};

/// How two prompts are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    /// `a`, newline, `b`
    Concat,
    /// Substitute every `{a}` and `{b}` in `templateString`
    Template,
}

impl CombineMode {
    fn from_config(value: &str) -> Self {
        match value {
            "template" => Self::Template,
            _ => Self::Concat,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Concat => "concat",
            Self::Template => "template",
        }
    }
}

/// Combine Prompt Node
///
/// # Inputs
/// - `textA` (required)
/// - `textB` (required)
///
/// # Config
/// - `mode` - `concat` (default) or `template`
/// - `templateString` - Required in template mode
///
/// # Outputs
/// - `text` - The combined prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptCombineNode;

impl PromptCombineNode {
    pub const NODE_TYPE: &'static str = "prompt.combine";
    pub const PORT_TEXT_A: &'static str = "textA";
    pub const PORT_TEXT_B: &'static str = "textB";
    pub const PORT_TEXT: &'static str = "text";
}

impl TaskDescriptor for PromptCombineNode {
    fn descriptor() -> TaskMetadata {
        TaskMetadata::new(Self::NODE_TYPE, NodeCategory::Prompts, "Combine Prompt")
            .with_description("Combine two text inputs")
            .with_input(PortMetadata::required(
                Self::PORT_TEXT_A,
                "textA",
                PortDataType::Text,
            ))
            .with_input(PortMetadata::required(
                Self::PORT_TEXT_B,
                "textB",
                PortDataType::Text,
            ))
            .with_output(PortMetadata::required(
                Self::PORT_TEXT,
                "text",
                PortDataType::Text,
            ))
            .with_default_ports(Some(Self::PORT_TEXT_A), Some(Self::PORT_TEXT))
    }
}

fn raw_text(inputs: &PortValues, port: &str) -> String {
    match inputs.get(port) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl NodeExecutor for PromptCombineNode {
    async fn execute(&self, request: NodeRequest<'_>) -> Result<PortValues> {
        let a = raw_text(&request.inputs, Self::PORT_TEXT_A);
        let b = raw_text(&request.inputs, Self::PORT_TEXT_B);
        let mode = CombineMode::from_config(&config_text_or(request.config, "mode", "concat"));

        require(
            (!a.trim().is_empty() && !b.trim().is_empty()).then_some(()),
            "Combine Prompt requires textA and textB",
        )?;

        let text = match mode {
            CombineMode::Template => {
                let template = require(
                    config_text(request.config, "templateString"),
                    "templateString is required in template mode",
                )?;
                template.replace("{a}", &a).replace("{b}", &b)
            }
            CombineMode::Concat => format!("{}\n{}", a, b),
        };

        request
            .log
            .log(format!("Combined prompt with {} mode", mode.as_str()));
        output(Self::PORT_TEXT, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::execute;
    use serde_json::json;

    #[tokio::test]
    async fn test_concat_is_default() {
        let outcome = execute(
            &PromptCombineNode,
            json!({}),
            json!({"textA": "Bold hero", "textB": "no clutter"}),
        )
        .await;
        assert_eq!(outcome.output()["text"], "Bold hero\nno clutter");
        assert!(outcome.logged("Combined prompt with concat mode"));
    }

    #[tokio::test]
    async fn test_template_replaces_every_placeholder() {
        let outcome = execute(
            &PromptCombineNode,
            json!({"mode": "template", "templateString": "{a} / {b} / {a}"}),
            json!({"textA": "x", "textB": "y"}),
        )
        .await;
        assert_eq!(outcome.output()["text"], "x / y / x");
        assert!(outcome.logged("Combined prompt with template mode"));
    }

    #[tokio::test]
    async fn test_template_requires_template_string() {
        let outcome = execute(
            &PromptCombineNode,
            json!({"mode": "template", "templateString": " "}),
            json!({"textA": "x", "textB": "y"}),
        )
        .await;
        assert_eq!(outcome.error(), "templateString is required in template mode");
    }

    #[tokio::test]
    async fn test_blank_input_fails() {
        let outcome = execute(
            &PromptCombineNode,
            json!({}),
            json!({"textA": "x", "textB": "  "}),
        )
        .await;
        assert_eq!(outcome.error(), "Combine Prompt requires textA and textB");
    }
}
