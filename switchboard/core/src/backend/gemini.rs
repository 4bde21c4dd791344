//! Gemini Backend Adapter
//!
//! Adapter for the Google Generative Language API, serving the Gemini Pro
//! and Gemini Pro Vision identities. Vision requests attach image
//! references as `file_data` parts.
//!
//! # Gemini API
//!
//! - `POST /v1beta/models/{model}:generateContent`
//! - API key passed as the `key` query parameter
//! - Token usage reported under `usageMetadata.totalTokenCount`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{AdapterError, ModelAdapter, ModelResponse, ProviderConfig};
use crate::routing::capability::supports_images;
use crate::routing::config::ModelId;

/// Adapter for one Gemini model
pub struct GeminiAdapter {
    /// Identity this adapter serves
    model: ModelId,
    /// Live provider settings, swapped atomically on config updates
    settings: RwLock<ProviderConfig>,
    /// Shared HTTP client
    client: reqwest::Client,
}

impl GeminiAdapter {
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

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.read().base_url,
            self.model.provider_model()
        )
    }

    fn api_key(&self) -> String {
        self.settings.read().api_key.clone()
    }

    /// Build the generateContent body; images become `file_data` parts
    fn request_body(&self, prompt: &str, images: &[String]) -> serde_json::Value {
        let mut parts = vec![serde_json::json!({"text": prompt})];
        for image in images {
            parts.push(serde_json::json!({
                "file_data": {"file_uri": image},
            }));
        }

        serde_json::json!({
            "contents": [{"parts": parts}],
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
            .post(self.generate_url())
            .query(&[("key", api_key)])
            .json(&self.request_body(prompt, images))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AdapterError::AuthenticationFailed);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::RequestFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let data: serde_json::Value = response.json().await?;

        let content = data
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                AdapterError::InvalidResponse(
                    "missing candidates[0].content.parts[0].text".to_string(),
                )
            })?
            .to_string();

        let tokens_used = data
            .get("usageMetadata")
            .and_then(|u| u.get("totalTokenCount"))
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
impl ModelAdapter for GeminiAdapter {
    fn model_id(&self) -> ModelId {
        self.model
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
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
            "provider": "gemini",
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

    #[test]
    fn test_generate_url_embeds_model() {
        let adapter = GeminiAdapter::new(
            ModelId::GeminiProVision,
            ProviderConfig::new("https://generativelanguage.googleapis.com", "key"),
        );
        assert_eq!(
            adapter.generate_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro-vision:generateContent"
        );
    }

    #[test]
    fn test_image_body_uses_file_data_parts() {
        let adapter = GeminiAdapter::new(
            ModelId::GeminiProVision,
            ProviderConfig::new("https://generativelanguage.googleapis.com", "key"),
        );
        let images = vec!["gs://bucket/cat.png".to_string()];
        let body = adapter.request_body("describe", &images);

        let parts = body["contents"][0]["parts"].as_array().expect("parts");
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["file_data"]["file_uri"], "gs://bucket/cat.png");
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_failure() {
        let adapter = GeminiAdapter::new(
            ModelId::GeminiPro,
            ProviderConfig::new("https://generativelanguage.googleapis.com", ""),
        );
        let err = adapter.process_text("hi").await.unwrap_err();
        assert!(matches!(err, AdapterError::AuthenticationFailed));
    }
}
