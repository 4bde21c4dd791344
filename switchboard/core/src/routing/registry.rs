//! Adapter Registry
//!
//! Maps every backend identity to a live adapter instance, together with
//! the fallback policy in force. Both live in one immutable snapshot: the
//! router clones an `Arc` to it at the start of each request, and
//! administrative updates install a fresh snapshot in one swap, so an
//! in-flight request never observes a half-updated registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::anthropic::AnthropicAdapter;
use crate::backend::gemini::GeminiAdapter;
use crate::backend::openai::OpenAiAdapter;
use crate::backend::traits::{ModelAdapter, ProviderConfig};

use super::config::{FallbackPolicy, ModelId};

// ============================================================================
// Provider Configuration Set
// ============================================================================

/// Configuration slices for every provider family.
///
/// This is the process-wide provider state; `update_config` merges into it
/// and re-dispatches the changed slices to live adapters by family name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// OpenAI family slice
    pub openai: ProviderConfig,

    /// Gemini family slice
    pub gemini: ProviderConfig,

    /// Anthropic family slice
    pub anthropic: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: ProviderConfig::new("https://api.openai.com", ""),
            gemini: ProviderConfig::new("https://generativelanguage.googleapis.com", ""),
            anthropic: ProviderConfig::new("https://api.anthropic.com", ""),
        }
    }
}

impl ProvidersConfig {
    /// Look up the slice for a provider family name
    #[must_use]
    pub fn slice(&self, provider_name: &str) -> Option<&ProviderConfig> {
        match provider_name {
            "openai" => Some(&self.openai),
            "gemini" => Some(&self.gemini),
            "anthropic" => Some(&self.anthropic),
            _ => None,
        }
    }

    /// Merge an update: present slices replace, absent slices are kept
    pub fn merge(&mut self, update: ProvidersUpdate) {
        if let Some(openai) = update.openai {
            self.openai = openai;
        }
        if let Some(gemini) = update.gemini {
            self.gemini = gemini;
        }
        if let Some(anthropic) = update.anthropic {
            self.anthropic = anthropic;
        }
    }
}

/// Partial provider configuration carried by an administrative update
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProvidersUpdate {
    /// Replacement OpenAI slice, if any
    pub openai: Option<ProviderConfig>,

    /// Replacement Gemini slice, if any
    pub gemini: Option<ProviderConfig>,

    /// Replacement Anthropic slice, if any
    pub anthropic: Option<ProviderConfig>,
}

// ============================================================================
// Router Snapshot
// ============================================================================

/// Immutable registry + policy pair the router works from.
///
/// Built once at startup and replaced wholesale by administrative updates;
/// never mutated in place.
pub struct RouterSnapshot {
    adapters: HashMap<ModelId, Arc<dyn ModelAdapter>>,
    policy: FallbackPolicy,
}

impl RouterSnapshot {
    /// Build a snapshot from explicit adapters (used by tests and by
    /// embedders that bring their own backends)
    #[must_use]
    pub fn new(adapters: HashMap<ModelId, Arc<dyn ModelAdapter>>, policy: FallbackPolicy) -> Self {
        Self { adapters, policy }
    }

    /// Build the full registry from provider slices: every identity gets
    /// an adapter of its family, all families sharing one slice each.
    #[must_use]
    pub fn from_providers(providers: &ProvidersConfig, policy: FallbackPolicy) -> Self {
        let mut adapters: HashMap<ModelId, Arc<dyn ModelAdapter>> = HashMap::new();

        for model in ModelId::ALL {
            let adapter: Arc<dyn ModelAdapter> = match model.provider_name() {
                "openai" => Arc::new(OpenAiAdapter::new(model, providers.openai.clone())),
                "gemini" => Arc::new(GeminiAdapter::new(model, providers.gemini.clone())),
                _ => Arc::new(AnthropicAdapter::new(model, providers.anthropic.clone())),
            };
            adapters.insert(model, adapter);
        }

        Self { adapters, policy }
    }

    /// Adapter registered for an identity, if any
    #[must_use]
    pub fn adapter(&self, model: ModelId) -> Option<&Arc<dyn ModelAdapter>> {
        self.adapters.get(&model)
    }

    /// Iterate over all registrations
    pub fn adapters(&self) -> impl Iterator<Item = (ModelId, &Arc<dyn ModelAdapter>)> {
        self.adapters.iter().map(|(id, adapter)| (*id, adapter))
    }

    /// Number of registered adapters
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether no adapter is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Fallback policy in force for this snapshot
    #[must_use]
    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    /// Copy of this snapshot with a different policy (registry shared)
    #[must_use]
    pub fn with_policy(&self, policy: FallbackPolicy) -> Self {
        Self {
            adapters: self.adapters.clone(),
            policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_registry_covers_every_identity() {
        let snapshot =
            RouterSnapshot::from_providers(&ProvidersConfig::default(), FallbackPolicy::default());
        assert_eq!(snapshot.len(), ModelId::ALL.len());
        for model in ModelId::ALL {
            let adapter = snapshot.adapter(model).expect("adapter registered");
            assert_eq!(adapter.model_id(), model);
            assert_eq!(adapter.provider_name(), model.provider_name());
        }
    }

    #[test]
    fn test_merge_keeps_absent_slices() {
        let mut providers = ProvidersConfig::default();
        providers.openai.api_key = "sk-old".to_string();
        providers.anthropic.api_key = "sk-ant".to_string();

        providers.merge(ProvidersUpdate {
            openai: Some(ProviderConfig::new("https://proxy.internal", "sk-new")),
            ..ProvidersUpdate::default()
        });

        assert_eq!(providers.openai.api_key, "sk-new");
        assert_eq!(providers.openai.base_url, "https://proxy.internal");
        assert_eq!(providers.anthropic.api_key, "sk-ant");
    }

    #[test]
    fn test_slice_by_family_name() {
        let providers = ProvidersConfig::default();
        assert!(providers.slice("openai").is_some());
        assert!(providers.slice("gemini").is_some());
        assert!(providers.slice("anthropic").is_some());
        assert!(providers.slice("cohere").is_none());
    }
}
