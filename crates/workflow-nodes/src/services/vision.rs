//! Prompt extraction from an image with a vision-capable chat model

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};

use crate::config::VisionConfig;
use crate::error::{Result, ServiceError};

const INSTRUCTION: &str = "Describe this image as a prompt for a website hero section. \
Respond with JSON only: {\"prompt\": string, \"style\": string, \"palette\": [string]}.";

/// Turns an image into a structured prompt
#[async_trait]
pub trait VisionPromptService: Send + Sync {
    /// Returns a JSON object with at least a `prompt` string
    async fn extract_prompt(&self, image: &str, model: &str) -> Result<Value>;
}

/// OpenAI-compatible `chat/completions` client (OpenRouter by default)
pub struct OpenRouterVisionService {
    client: reqwest::Client,
    config: VisionConfig,
}

impl OpenRouterVisionService {
    pub fn new(config: VisionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }
}

#[async_trait]
impl VisionPromptService for OpenRouterVisionService {
    async fn extract_prompt(&self, image: &str, model: &str) -> Result<Value> {
        let api_key = std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ServiceError::MissingCredential(self.config.api_key_env.clone()))?;

        let model = if model.trim().is_empty() {
            self.config.default_model.as_str()
        } else {
            model
        };
        let image_url = image_url(image).await?;

        log::debug!("Requesting vision prompt from {} with {}", self.config.base_url, model);

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": INSTRUCTION },
                    { "type": "image_url", "image_url": { "url": image_url } }
                ]
            }]
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Vision(format!(
                "API error ({}): {}",
                status, error_body
            )));
        }

        let json: Value = response.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();
        parse_prompt_payload(content)
    }
}

/// Remote and data URLs pass through; local files are inlined as data URLs
async fn image_url(image: &str) -> Result<String> {
    if image.starts_with("http://") || image.starts_with("https://") || image.starts_with("data:")
    {
        return Ok(image.to_string());
    }
    let bytes = tokio::fs::read(image).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime_for(Path::new(image)), encoded))
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

/// Parse the model's reply, tolerating a fenced code block around the JSON
pub fn parse_prompt_payload(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: Value = serde_json::from_str(unfenced)
        .map_err(|_| ServiceError::Vision("model response was not JSON".to_string()))?;
    match value.get("prompt").and_then(Value::as_str) {
        Some(prompt) if !prompt.trim().is_empty() => Ok(value),
        _ => Err(ServiceError::Vision(
            "model response has no prompt field".to_string(),
        )),
    }
}
