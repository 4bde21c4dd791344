//! Anthropic Backend Adapter
//!
//! Adapter for the Anthropic Messages API, serving the Claude 3 Opus,
//! Sonnet, and Haiku identities. Vision requests attach image references
//! as URL-sourced image content blocks.
//!
//! # Anthropic API
//!
//! - `POST /v1/messages` with a `messages` array and mandatory `max_tokens`
//! - `x-api-key` header auth plus a pinned `anthropic-version`
//! - Token usage reported as separate input/output counts

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{AdapterError, ModelAdapter, ModelResponse, ProviderConfig};
use crate::routing::capability::supports_images;
use crate::routing::config::ModelId;

/// API version header value pinned for wire stability
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Response token ceiling sent with every request
const MAX_TOKENS: u32 = 1024;

/// Adapter for one Claude model
pub struct AnthropicAdapter {
    /// Identity this adapter serves
    model: ModelId,
    /// Live provider settings, swapped atomically on config updates
    settings: RwLock<ProviderConfig>,
    /// Shared HTTP client
    client: reqwest::Client,
}

impl AnthropicAdapter {
    /// Create an adapter for `model` with the given provider slice
    #[must_use]
    pub fn new(model: ModelId, config: ProviderConfig) -> Self {
        Self {
            model,
            settings: RwLock::new(config),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.settings.read().base_url)
    }

    fn api_key(&self) -> String {
        self.settings.read().api_key.clone()
    }

    /// Build the messages body; images become URL-sourced image blocks
    fn request_body(&self, prompt: &str, images: &[String]) -> serde_json::Value {
        let content = if images.is_empty() {
            serde_json::json!(prompt)
        } else {
            let mut blocks = Vec::with_capacity(images.len() + 1);
            for image in images {
                blocks.push(serde_json::json!({
                    "type": "image",
                    "source": {"type": "url", "url": image},
                }));
            }
            blocks.push(serde_json::json!({"type": "text", "text": prompt}));
            serde_json::json!(blocks)
        };

        serde_json::json!({
            "model": self.model.provider_model(),
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": content}],
        })
    }

    async fn dispatch(
        &self,
        prompt: &str,
        images: &[String],
    ) -> Result<ModelResponse, AdapterError> {
        let api_key = self.api_key();
        if api_key.is_empty() {
            return Err(AdapterError::AuthenticationFailed);
        }

        let start = Instant::now();
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(prompt, images))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AdapterError::AuthenticationFailed);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::RequestFailed(format!(
                "Anthropic returned {status}: {body}"
            )));
        }

        let data: serde_json::Value = response.json().await?;

        let content = data
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                AdapterError::InvalidResponse("missing content[0].text".to_string())
            })?
            .to_string();

        let tokens_used = data.get("usage").map(|usage| {
            let input = usage
                .get("input_tokens")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0);
            let output = usage
                .get("output_tokens")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0);
            (input + output) as u32
        });

        Ok(ModelResponse {
            content,
            model_used: self.model,
            tokens_used,
            duration_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        })
    }
}

#[async_trait]
impl ModelAdapter for AnthropicAdapter {
    fn model_id(&self) -> ModelId {
        self.model
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }

    async fn process_text(&self, prompt: &str) -> Result<ModelResponse, AdapterError> {
        self.dispatch(prompt, &[]).await
    }

    async fn process_with_images(
        &self,
        prompt: &str,
        images: &[String],
    ) -> Result<ModelResponse, AdapterError> {
        self.dispatch(prompt, images).await
    }

    async fn is_available(&self) -> bool {
        self.settings.read().is_configured()
    }

    fn model_info(&self) -> serde_json::Value {
        serde_json::json!({
            "model": self.model.as_str(),
            "provider": "anthropic",
            "api_model": self.model.provider_model(),
            "supports_images": supports_images(self.model),
            "configured": self.settings.read().is_configured(),
        })
    }

    fn update_config(&self, config: &ProviderConfig) {
        *self.settings.write() = config.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> AnthropicAdapter {
        AnthropicAdapter::new(
            ModelId::ClaudeSonnet,
            ProviderConfig::new("https://api.anthropic.com", "sk-ant-test"),
        )
    }

    #[test]
    fn test_messages_url() {
        assert_eq!(adapter().messages_url(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_body_carries_api_model_string() {
        let body = adapter().request_body("hello", &[]);
        assert_eq!(body["model"], "claude-3-sonnet-20240229");
        assert_eq!(body["max_tokens"], MAX_TOKENS);
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_image_blocks_precede_text() {
        let images = vec!["https://example.com/cat.png".to_string()];
        let body = adapter().request_body("describe", &images);

        let blocks = body["messages"][0]["content"]
            .as_array()
            .expect("content blocks");
        assert_eq!(blocks[0]["type"], "image");
        assert_eq!(blocks[0]["source"]["url"], "https://example.com/cat.png");
        assert_eq!(blocks[1]["type"], "text");
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_failure() {
        let adapter = AnthropicAdapter::new(
            ModelId::ClaudeOpus,
            ProviderConfig::new("https://api.anthropic.com", ""),
        );
        let err = adapter.process_text("hi").await.unwrap_err();
        assert!(matches!(err, AdapterError::AuthenticationFailed));
    }
}
