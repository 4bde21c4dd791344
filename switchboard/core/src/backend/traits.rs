//! Backend Adapter Traits
//!
//! Trait definitions for provider backends. The router only ever sees this
//! capability contract; provider wire formats, auth schemes, and response
//! parsing stay inside the adapter implementations.
//!
//! # Contract
//!
//! A [`ModelAdapter`] exposes:
//! - Text and image completion (`process_text`, `process_with_images`)
//! - An availability predicate that cannot fail (`is_available`)
//! - A descriptive metadata lookup (`model_info`)
//! - A live configuration update (`update_config`), safe while other calls
//!   on the same adapter are in flight

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::config::ModelId;

// ============================================================================
// Provider Configuration
// ============================================================================

/// Connection settings for one provider family.
///
/// One slice of this shape exists per family (`openai`, `gemini`,
/// `anthropic`); every adapter of that family shares it. API keys are
/// resolved from the environment by the config layer and never written to
/// disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider API
    pub base_url: String,

    /// API key (empty means unconfigured)
    #[serde(skip_serializing, default)]
    pub api_key: String,
}

impl ProviderConfig {
    /// Create a new provider configuration
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Whether this slice carries enough to talk to the provider
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ============================================================================
// Response Envelope
// ============================================================================

/// Uniform result returned for every routed request, whichever backend
/// served it.
///
/// Exactly one of `content` / `error` is meaningful: a non-empty `error`
/// is an authoritative failure regardless of what `content` holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The response text (empty on failure)
    pub content: String,

    /// Identity that produced the response; on total failure, the identity
    /// that was originally requested
    pub model_used: ModelId,

    /// Tokens consumed, when the provider reports them
    pub tokens_used: Option<u32>,

    /// Wall-clock processing time in milliseconds
    pub duration_ms: Option<u64>,

    /// Failure description; `Some` marks the envelope as failed
    pub error: Option<String>,
}

impl ModelResponse {
    /// Successful envelope with content
    pub fn ok(model_used: ModelId, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model_used,
            tokens_used: None,
            duration_ms: None,
            error: None,
        }
    }

    /// Failed envelope carrying an error description
    pub fn failure(model_used: ModelId, error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            model_used,
            tokens_used: None,
            duration_ms: None,
            error: Some(error.into()),
        }
    }

    /// Whether this envelope reports a failure
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

// ============================================================================
// Adapter Errors
// ============================================================================

/// Transport-level failures an adapter call can surface.
///
/// These never cross the router boundary: the router converts them into
/// "try the next candidate" and, on exhaustion, into the envelope's error
/// field.
#[derive(Clone, Debug, Error)]
pub enum AdapterError {
    /// Could not reach the provider
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Provider rejected or failed the request
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Provider answered with a body the adapter could not interpret
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Provider credentials missing or rejected
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The attempt exceeded its time budget
    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::RequestFailed(e.to_string())
        }
    }
}

// ============================================================================
// Adapter Trait
// ============================================================================

/// Capability contract between the router and one provider+model pairing.
///
/// Implementations must be cheap to share (`Arc<dyn ModelAdapter>`) and
/// safe to call concurrently; `update_config` in particular must not
/// expose torn settings to calls already in flight.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// The identity this adapter serves
    fn model_id(&self) -> ModelId;

    /// Provider family name, used to select configuration slices
    fn provider_name(&self) -> &'static str;

    /// Complete a text prompt
    async fn process_text(&self, prompt: &str) -> Result<ModelResponse, AdapterError>;

    /// Complete a prompt with attached image references.
    ///
    /// Only invoked when the capability table marks this identity as
    /// vision-capable.
    async fn process_with_images(
        &self,
        prompt: &str,
        images: &[String],
    ) -> Result<ModelResponse, AdapterError>;

    /// Whether this adapter is currently usable. Must not fail; adapters
    /// report configuration problems as `false`.
    async fn is_available(&self) -> bool;

    /// Descriptive metadata for this identity
    fn model_info(&self) -> serde_json::Value;

    /// Apply a new configuration slice for this adapter's provider family
    fn update_config(&self, config: &ProviderConfig);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_configured() {
        let unset = ProviderConfig::new("https://api.example.com", "");
        assert!(!unset.is_configured());

        let set = ProviderConfig::new("https://api.example.com", "sk-test");
        assert!(set.is_configured());
    }

    #[test]
    fn test_envelope_error_is_authoritative() {
        let mut response = ModelResponse::ok(ModelId::ClaudeSonnet, "ok");
        assert!(!response.is_error());

        // Content present but error set: still a failure
        response.error = Some("provider overloaded".to_string());
        assert!(response.is_error());

        // Empty error string is not a failure marker
        response.error = Some(String::new());
        assert!(!response.is_error());
    }

    #[test]
    fn test_failure_envelope_shape() {
        let response = ModelResponse::failure(ModelId::OpenAiGpt4, "boom");
        assert!(response.content.is_empty());
        assert_eq!(response.model_used, ModelId::OpenAiGpt4);
        assert!(response.is_error());
    }
}
