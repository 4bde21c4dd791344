//! OpenAI Backend Adapter
//!
//! Adapter for the OpenAI chat completions API, serving the GPT-4 and
//! GPT-3.5 Turbo identities. Vision requests attach image references as
//! `image_url` content parts.
//!
//! # OpenAI API
//!
//! - `POST /v1/chat/completions` with a `messages` array
//! - Bearer token auth
//! - Token usage reported under `usage.total_tokens`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{AdapterError, ModelAdapter, ModelResponse, ProviderConfig};
use crate::routing::capability::supports_images;
use crate::routing::config::ModelId;

/// Adapter for one OpenAI model
pub struct OpenAiAdapter {
    /// Identity this adapter serves
    model: ModelId,
    /// Live provider settings, swapped atomically on config updates
    settings: RwLock<ProviderConfig>,
    /// Shared HTTP client
    client: reqwest::Client,
}

impl OpenAiAdapter {
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

    fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.settings.read().base_url)
    }

    fn api_key(&self) -> String {
        self.settings.read().api_key.clone()
    }

    /// Build the chat completions body; images become `image_url` parts
    fn request_body(&self, prompt: &str, images: &[String]) -> serde_json::Value {
        let content = if images.is_empty() {
            serde_json::json!(prompt)
        } else {
            let mut parts = vec![serde_json::json!({"type": "text", "text": prompt})];
            for image in images {
                parts.push(serde_json::json!({
                    "type": "image_url",
                    "image_url": {"url": image},
                }));
            }
            serde_json::json!(parts)
        };

        serde_json::json!({
            "model": self.model.provider_model(),
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
            .post(self.chat_url())
            .bearer_auth(api_key)
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
                "OpenAI returned {status}: {body}"
            )));
        }

        let data: serde_json::Value = response.json().await?;

        let content = data
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                AdapterError::InvalidResponse("missing choices[0].message.content".to_string())
            })?
            .to_string();

        let tokens_used = data
            .get("usage")
            .and_then(|u| u.get("total_tokens"))
            .and_then(serde_json::Value::as_u64)
            .map(|t| t as u32);

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
impl ModelAdapter for OpenAiAdapter {
    fn model_id(&self) -> ModelId {
        self.model
    }

    fn provider_name(&self) -> &'static str {
        "openai"
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
            "provider": "openai",
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

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter::new(
            ModelId::OpenAiGpt4,
            ProviderConfig::new("https://api.openai.com", "sk-test"),
        )
    }

    #[test]
    fn test_chat_url() {
        assert_eq!(adapter().chat_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_text_body() {
        let body = adapter().request_body("hello", &[]);
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_image_body_uses_content_parts() {
        let images = vec!["https://example.com/cat.png".to_string()];
        let body = adapter().request_body("describe", &images);

        let parts = body["messages"][0]["content"]
            .as_array()
            .expect("content parts");
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "https://example.com/cat.png");
    }

    #[test]
    fn test_availability_tracks_config() {
        let adapter = OpenAiAdapter::new(
            ModelId::OpenAiGpt35,
            ProviderConfig::new("https://api.openai.com", ""),
        );
        assert!(!tokio_test::block_on(adapter.is_available()));

        adapter.update_config(&ProviderConfig::new("https://api.openai.com", "sk-new"));
        assert!(tokio_test::block_on(adapter.is_available()));
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_failure() {
        let adapter = OpenAiAdapter::new(
            ModelId::OpenAiGpt4,
            ProviderConfig::new("https://api.openai.com", ""),
        );
        let err = adapter.process_text("hi").await.unwrap_err();
        assert!(matches!(err, AdapterError::AuthenticationFailed));
    }
}
