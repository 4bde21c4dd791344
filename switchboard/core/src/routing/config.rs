//! Routing Configuration
//!
//! Configuration types for the routing core: the closed set of backend
//! identities, fallback policy, router tunables, and per-identity rate
//! limit numbers.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Backend Identity
// ============================================================================

/// Identity of one provider+model pairing the router can dispatch to.
///
/// This is a closed set: every other table in the system (fallback chains,
/// capability flags, rate limits, the adapter registry) is keyed by it.
/// Adding a provider model means adding a variant here and updating the
/// per-identity tables that match on it exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    /// OpenAI GPT-4 (vision-capable tier)
    #[serde(rename = "openai-gpt4")]
    OpenAiGpt4,

    /// OpenAI GPT-3.5 Turbo (text only)
    #[serde(rename = "openai-gpt35")]
    OpenAiGpt35,

    /// Google Gemini Pro (text only)
    #[serde(rename = "gemini-pro")]
    GeminiPro,

    /// Google Gemini Pro Vision
    #[serde(rename = "gemini-pro-vision")]
    GeminiProVision,

    /// Anthropic Claude 3 Opus
    #[serde(rename = "claude-opus")]
    ClaudeOpus,

    /// Anthropic Claude 3 Sonnet
    #[serde(rename = "claude-sonnet")]
    ClaudeSonnet,

    /// Anthropic Claude 3 Haiku
    #[serde(rename = "claude-haiku")]
    ClaudeHaiku,
}

impl ModelId {
    /// All identities, in registry order
    pub const ALL: [ModelId; 7] = [
        ModelId::OpenAiGpt4,
        ModelId::OpenAiGpt35,
        ModelId::GeminiPro,
        ModelId::GeminiProVision,
        ModelId::ClaudeOpus,
        ModelId::ClaudeSonnet,
        ModelId::ClaudeHaiku,
    ];

    /// Stable string form (used in config files and logs)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAiGpt4 => "openai-gpt4",
            Self::OpenAiGpt35 => "openai-gpt35",
            Self::GeminiPro => "gemini-pro",
            Self::GeminiProVision => "gemini-pro-vision",
            Self::ClaudeOpus => "claude-opus",
            Self::ClaudeSonnet => "claude-sonnet",
            Self::ClaudeHaiku => "claude-haiku",
        }
    }

    /// Provider family name, used to route configuration slices
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::OpenAiGpt4 | Self::OpenAiGpt35 => "openai",
            Self::GeminiPro | Self::GeminiProVision => "gemini",
            Self::ClaudeOpus | Self::ClaudeSonnet | Self::ClaudeHaiku => "anthropic",
        }
    }

    /// The model string the provider's wire API expects
    #[must_use]
    pub fn provider_model(&self) -> &'static str {
        match self {
            Self::OpenAiGpt4 => "gpt-4",
            Self::OpenAiGpt35 => "gpt-3.5-turbo",
            Self::GeminiPro => "gemini-pro",
            Self::GeminiProVision => "gemini-pro-vision",
            Self::ClaudeOpus => "claude-3-opus-20240229",
            Self::ClaudeSonnet => "claude-3-sonnet-20240229",
            Self::ClaudeHaiku => "claude-3-haiku-20240307",
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown identity string
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown model identity: {0}")]
pub struct UnknownModelId(pub String);

impl FromStr for ModelId {
    type Err = UnknownModelId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownModelId(s.to_string()))
    }
}

// ============================================================================
// Fallback Policy
// ============================================================================

/// Primary identity plus the ordered chain of fallbacks to try after it.
///
/// The chain may mention the primary (or the per-request target); the
/// resolver removes those occurrences so any requested identity is
/// attempted at most once, first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPolicy {
    /// Identity used when a request names no target
    pub primary: ModelId,

    /// Fallbacks, attempted in order after the requested identity
    pub chain: Vec<ModelId>,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            primary: ModelId::OpenAiGpt4,
            chain: vec![
                ModelId::OpenAiGpt35,
                ModelId::ClaudeSonnet,
                ModelId::GeminiPro,
            ],
        }
    }
}

// ============================================================================
// Rate Limits
// ============================================================================

/// Declared request/token budget for one identity.
///
/// `requests_per_minute` is enforced by the token-bucket gate;
/// `tokens_per_minute` is carried as declared policy (token usage is not
/// known until a response arrives, so it cannot gate dispatch).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRateLimit {
    /// Maximum dispatch attempts per minute
    pub requests_per_minute: u32,

    /// Declared provider token budget per minute
    pub tokens_per_minute: u64,
}

/// Per-identity rate limit table
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether the gate is consulted at all (disable for testing)
    pub enabled: bool,

    /// Limits per identity; an absent entry means unlimited
    pub per_model: HashMap<ModelId, ModelRateLimit>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut per_model = HashMap::new();
        per_model.insert(
            ModelId::OpenAiGpt4,
            ModelRateLimit {
                requests_per_minute: 10_000,
                tokens_per_minute: 150_000,
            },
        );
        per_model.insert(
            ModelId::OpenAiGpt35,
            ModelRateLimit {
                requests_per_minute: 3_500,
                tokens_per_minute: 90_000,
            },
        );
        per_model.insert(
            ModelId::GeminiPro,
            ModelRateLimit {
                requests_per_minute: 1_500,
                tokens_per_minute: 32_000,
            },
        );
        per_model.insert(
            ModelId::GeminiProVision,
            ModelRateLimit {
                requests_per_minute: 1_500,
                tokens_per_minute: 32_000,
            },
        );
        for claude in [
            ModelId::ClaudeOpus,
            ModelId::ClaudeSonnet,
            ModelId::ClaudeHaiku,
        ] {
            per_model.insert(
                claude,
                ModelRateLimit {
                    requests_per_minute: 1_000,
                    tokens_per_minute: 40_000,
                },
            );
        }

        Self {
            enabled: true,
            per_model,
        }
    }
}

impl RateLimitConfig {
    /// Create a disabled configuration (for testing)
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

// ============================================================================
// Router Configuration
// ============================================================================

/// Complete router configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Fallback policy
    pub fallback: FallbackPolicy,

    /// Upper bound on a single adapter invocation, milliseconds (0 disables)
    pub attempt_timeout_ms: u64,

    /// Upper bound on a single availability probe, milliseconds
    pub health_check_timeout_ms: u64,

    /// Attempt budget used when a request does not carry its own
    pub default_max_retries: u32,

    /// Per-identity rate limits
    pub rate_limits: RateLimitConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::default(),
            attempt_timeout_ms: 120_000, // matches the provider client timeout
            health_check_timeout_ms: 5_000,
            default_max_retries: 3,
            rate_limits: RateLimitConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Per-attempt timeout as a `Duration`, `None` when disabled
    #[must_use]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        if self.attempt_timeout_ms > 0 {
            Some(Duration::from_millis(self.attempt_timeout_ms))
        } else {
            None
        }
    }

    /// Health probe timeout as a `Duration`
    #[must_use]
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }
}
