//! Configuration Loading
//!
//! TOML configuration for the router and provider backends. API keys are
//! never stored in the file; the file names the environment variable each
//! key is read from.
//!
//! # File format
//!
//! ```toml
//! [router]
//! attempt_timeout_ms = 120000
//! health_check_timeout_ms = 5000
//! default_max_retries = 3
//!
//! [fallback]
//! primary = "openai-gpt4"
//! chain = ["openai-gpt35", "claude-sonnet", "gemini-pro"]
//!
//! [providers.openai]
//! api_key_env = "OPENAI_API_KEY"
//!
//! [providers.anthropic]
//! base_url = "https://api.anthropic.com"
//! api_key_env = "ANTHROPIC_API_KEY"
//!
//! [limits]
//! enabled = true
//!
//! [limits.per_model.openai-gpt4]
//! requests_per_minute = 10000
//! tokens_per_minute = 150000
//! ```
//!
//! Every section is optional; an absent section keeps the built-in
//! defaults (which mirror the shipped provider endpoints and limits).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::backend::traits::ProviderConfig;
use crate::routing::config::{FallbackPolicy, RateLimitConfig, RouterConfig};
use crate::routing::registry::ProvidersConfig;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config at {path}: {source}")]
    Read {
        /// Path that was attempted
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        /// Path that was attempted
        path: PathBuf,
        /// Underlying parse error
        source: toml::de::Error,
    },
}

/// `[router]` section
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RouterSection {
    /// Per-attempt timeout override, milliseconds (0 disables)
    pub attempt_timeout_ms: Option<u64>,

    /// Health probe timeout override, milliseconds
    pub health_check_timeout_ms: Option<u64>,

    /// Default attempt budget override
    pub default_max_retries: Option<u32>,
}

/// One `[providers.*]` section
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// Base URL override
    pub base_url: Option<String>,

    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
}

/// `[providers]` section
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersSection {
    /// OpenAI family settings
    pub openai: ProviderSection,

    /// Gemini family settings
    pub gemini: ProviderSection,

    /// Anthropic family settings
    pub anthropic: ProviderSection,
}

/// On-disk configuration file shape
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SwitchboardToml {
    /// Router tunables
    pub router: RouterSection,

    /// Fallback policy; built-in default chain when absent
    pub fallback: Option<FallbackPolicy>,

    /// Provider connection settings
    pub providers: ProvidersSection,

    /// Rate limit table; built-in per-identity numbers when absent
    pub limits: Option<RateLimitConfig>,
}

impl SwitchboardToml {
    /// Resolve the file into runtime configuration, reading API keys from
    /// the named environment variables
    #[must_use]
    pub fn into_runtime(self) -> (ProvidersConfig, RouterConfig) {
        let mut providers = ProvidersConfig::default();
        apply_provider(&mut providers.openai, &self.providers.openai, "OPENAI_API_KEY");
        apply_provider(&mut providers.gemini, &self.providers.gemini, "GEMINI_API_KEY");
        apply_provider(
            &mut providers.anthropic,
            &self.providers.anthropic,
            "ANTHROPIC_API_KEY",
        );

        let mut config = RouterConfig::default();
        if let Some(ms) = self.router.attempt_timeout_ms {
            config.attempt_timeout_ms = ms;
        }
        if let Some(ms) = self.router.health_check_timeout_ms {
            config.health_check_timeout_ms = ms;
        }
        if let Some(retries) = self.router.default_max_retries {
            config.default_max_retries = retries;
        }
        if let Some(fallback) = self.fallback {
            config.fallback = fallback;
        }
        if let Some(limits) = self.limits {
            config.rate_limits = limits;
        }

        (providers, config)
    }
}

fn apply_provider(target: &mut ProviderConfig, section: &ProviderSection, default_env: &str) {
    if let Some(ref base_url) = section.base_url {
        target.base_url = base_url.clone();
    }
    let env_name = section.api_key_env.as_deref().unwrap_or(default_env);
    target.api_key = std::env::var(env_name).unwrap_or_default();
}

/// Default configuration file location under the XDG config directory
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("switchboard")
        .join("switchboard.toml")
}

/// Load configuration from an explicit path
pub fn load_config_from_path(path: &Path) -> Result<SwitchboardToml, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration from `SWITCHBOARD_CONFIG` or the default path.
///
/// A missing file is not an error: the built-in defaults apply, matching
/// a fresh install with nothing configured yet.
pub fn load_config() -> Result<SwitchboardToml, ConfigError> {
    let path = std::env::var("SWITCHBOARD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_config_path());

    if !path.exists() {
        tracing::info!(path = ?path, "no config file, using defaults");
        return Ok(SwitchboardToml::default());
    }

    load_config_from_path(&path)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::routing::config::ModelId;

    #[test]
    fn test_empty_file_yields_defaults() {
        let parsed: SwitchboardToml = toml::from_str("").expect("empty config parses");
        let (providers, config) = parsed.into_runtime();

        assert_eq!(providers.openai.base_url, "https://api.openai.com");
        assert_eq!(config.fallback, FallbackPolicy::default());
        assert_eq!(config.attempt_timeout_ms, 120_000);
    }

    #[test]
    fn test_sections_override_defaults() {
        let raw = r#"
            [router]
            attempt_timeout_ms = 9000
            default_max_retries = 1

            [fallback]
            primary = "claude-sonnet"
            chain = ["claude-haiku", "gemini-pro"]

            [providers.openai]
            base_url = "https://proxy.internal"
        "#;

        let parsed: SwitchboardToml = toml::from_str(raw).expect("config parses");
        let (providers, config) = parsed.into_runtime();

        assert_eq!(providers.openai.base_url, "https://proxy.internal");
        assert_eq!(config.attempt_timeout_ms, 9_000);
        assert_eq!(config.default_max_retries, 1);
        assert_eq!(config.fallback.primary, ModelId::ClaudeSonnet);
        assert_eq!(
            config.fallback.chain,
            vec![ModelId::ClaudeHaiku, ModelId::GeminiPro]
        );
    }

    #[test]
    fn test_per_model_limits_parse() {
        let raw = r#"
            [limits]
            enabled = true

            [limits.per_model.openai-gpt4]
            requests_per_minute = 42
            tokens_per_minute = 1000
        "#;

        let parsed: SwitchboardToml = toml::from_str(raw).expect("config parses");
        let limits = parsed.limits.expect("limits section");
        assert_eq!(
            limits.per_model[&ModelId::OpenAiGpt4].requests_per_minute,
            42
        );
    }

    #[test]
    fn test_load_from_path_reports_parse_errors() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "this is not toml at all [").expect("write");

        let err = load_config_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
