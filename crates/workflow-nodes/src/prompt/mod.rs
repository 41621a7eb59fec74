//! Prompt nodes
//!
//! Nodes that produce or merge prompt text.

mod prompt_combine;
mod prompt_negative;
mod prompt_text;

pub use prompt_combine::PromptCombineNode;
pub use prompt_negative::PromptNegativeNode;
pub use prompt_text::PromptTextNode;
