//! Request Router
//!
//! The orchestration core: resolves which backends to try for a request,
//! walks them in order with per-attempt error isolation, and always hands
//! the caller one uniform envelope.
//!
//! # Request Flow
//!
//! ```text
//! 1. Resolve the target (requested identity, else policy primary)
//! 2. Derive the candidate list (target first, chain deduplicated)
//! 3. Per candidate: registration check -> image capability filter ->
//!    rate gate -> adapter invocation under the attempt timeout
//! 4. First success wins; failures become "last error" and advance
//! 5. Exhaustion returns an envelope with empty content and the last
//!    recorded failure, never an Err
//! ```
//!
//! Failures never cross this boundary as errors: transport faults,
//! error-bearing envelopes, and timeouts are all converted to "try the
//! next candidate", and on exhaustion to data in the returned envelope.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::backend::traits::{AdapterError, ModelAdapter, ModelResponse};

use super::capability::supports_images;
use super::config::{ModelId, RouterConfig};
use super::context::RequestContext;
use super::fallback::resolve_candidates;
use super::health::{available_models, probe_all};
use super::metrics::RouterMetrics;
use super::rate_limit::{RateGate, TokenBucketGate};
use super::registry::{ProvidersConfig, ProvidersUpdate, RouterSnapshot};

// ============================================================================
// Route Request
// ============================================================================

/// One routed generation request
#[derive(Clone, Debug)]
pub struct RouteRequest {
    /// Correlation id carried through the log stream
    pub request_id: String,

    /// The prompt to complete
    pub prompt: String,

    /// Explicitly requested identity; the policy primary when absent
    pub model: Option<ModelId>,

    /// Structured context prepended to the prompt when non-empty
    pub context: Option<RequestContext>,

    /// Image references; routes the request to vision-capable backends
    pub images: Vec<String>,

    /// Attempt budget override; the router default when absent
    pub max_retries: Option<u32>,
}

impl Default for RouteRequest {
    fn default() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            prompt: String::new(),
            model: None,
            context: None,
            images: Vec::new(),
            max_retries: None,
        }
    }
}

impl RouteRequest {
    /// Create a request for a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Request a specific identity
    #[must_use]
    pub fn with_model(mut self, model: ModelId) -> Self {
        self.model = Some(model);
        self
    }

    /// Attach structured context
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach image references
    #[must_use]
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Override the attempt budget
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Prepend the formatted context block when it is non-empty; an empty
/// context must leave the prompt untouched (no separator artifacts).
pub(crate) fn compose_prompt(context: Option<&RequestContext>, prompt: &str) -> String {
    match context {
        Some(ctx) => {
            let block = ctx.format();
            if block.is_empty() {
                prompt.to_string()
            } else {
                format!("{block}\n\n{prompt}")
            }
        }
        None => prompt.to_string(),
    }
}

// ============================================================================
// Router
// ============================================================================

/// The routing core.
///
/// Holds the registry snapshot (swapped atomically on administrative
/// updates), the process-wide provider configuration, the rate gate, and
/// request accounting. Cheap to share behind an `Arc`; concurrent
/// `process_request` calls are independent.
pub struct Router {
    /// Current registry + policy snapshot
    snapshot: RwLock<Arc<RouterSnapshot>>,

    /// Process-wide provider configuration, merged by `update_config`
    providers: Mutex<ProvidersConfig>,

    /// Router tunables
    config: RouterConfig,

    /// Admission policy consulted before each attempt
    gate: Arc<dyn RateGate>,

    /// Request accounting
    metrics: Arc<RouterMetrics>,
}

impl Router {
    /// Build a router with the full provider registry
    #[must_use]
    pub fn new(providers: ProvidersConfig, config: RouterConfig) -> Self {
        let snapshot = RouterSnapshot::from_providers(&providers, config.fallback.clone());
        let gate = Arc::new(TokenBucketGate::new(config.rate_limits.clone()));
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            providers: Mutex::new(providers),
            config,
            gate,
            metrics: Arc::new(RouterMetrics::new()),
        }
    }

    /// Build a router around an explicit snapshot (tests, embedders that
    /// bring their own adapters)
    #[must_use]
    pub fn with_snapshot(snapshot: RouterSnapshot, config: RouterConfig) -> Self {
        let gate = Arc::new(TokenBucketGate::new(config.rate_limits.clone()));
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            providers: Mutex::new(ProvidersConfig::default()),
            config,
            gate,
            metrics: Arc::new(RouterMetrics::new()),
        }
    }

    /// Replace the admission policy
    #[must_use]
    pub fn with_rate_gate(mut self, gate: Arc<dyn RateGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Current snapshot; each request works from one consistent copy
    fn current(&self) -> Arc<RouterSnapshot> {
        self.snapshot.read().clone()
    }

    /// Request accounting counters
    #[must_use]
    pub fn metrics(&self) -> &RouterMetrics {
        &self.metrics
    }

    /// Route a request through the fallback chain.
    ///
    /// Never returns an error: exhaustion produces an envelope with empty
    /// content, `model_used` set to the originally requested identity, and
    /// an error string embedding the last recorded failure.
    pub async fn process_request(&self, request: RouteRequest) -> ModelResponse {
        let snapshot = self.current();
        let requested = request.model.unwrap_or(snapshot.policy().primary);
        let candidates = resolve_candidates(requested, snapshot.policy());
        let max_attempts = request
            .max_retries
            .unwrap_or(self.config.default_max_retries);

        let prompt = compose_prompt(request.context.as_ref(), &request.prompt);

        self.metrics.record_request();
        tracing::debug!(
            request_id = %request.request_id,
            requested = %requested,
            candidates = candidates.len(),
            "routing request"
        );

        let mut last_error: Option<String> = None;
        let mut attempts = 0u32;

        for candidate in candidates {
            if attempts >= max_attempts {
                tracing::warn!(
                    request_id = %request.request_id,
                    attempts,
                    "attempt budget spent before the chain was exhausted"
                );
                break;
            }

            let Some(adapter) = snapshot.adapter(candidate) else {
                tracing::warn!(model = %candidate, "no adapter registered, skipping");
                continue;
            };

            if !request.images.is_empty() && !supports_images(candidate) {
                tracing::warn!(model = %candidate, "backend does not accept images, skipping");
                continue;
            }

            if !self.gate.try_acquire(candidate) {
                tracing::warn!(model = %candidate, "rate limited, skipping");
                continue;
            }

            attempts += 1;
            self.metrics.record_attempt(candidate);

            match self.invoke(adapter.as_ref(), &prompt, &request.images).await {
                Ok(response) if !response.is_error() => {
                    self.metrics.record_success(candidate, candidate != requested);
                    tracing::info!(
                        request_id = %request.request_id,
                        model = %candidate,
                        duration_ms = response.duration_ms,
                        "request served"
                    );
                    return response;
                }
                Ok(response) => {
                    // An error-bearing envelope is equivalent to a thrown
                    // failure for retry purposes
                    let reason = response.error.unwrap_or_default();
                    tracing::warn!(model = %candidate, error = %reason, "backend reported an error");
                    self.metrics.record_failure(candidate);
                    last_error = Some(reason);
                }
                Err(e) => {
                    tracing::warn!(model = %candidate, error = %e, "backend invocation failed");
                    self.metrics.record_failure(candidate);
                    last_error = Some(e.to_string());
                }
            }
        }

        self.metrics.record_exhausted();
        tracing::warn!(
            request_id = %request.request_id,
            requested = %requested,
            "all candidates exhausted"
        );
        ModelResponse::failure(
            requested,
            format!(
                "all backends failed (last error: {})",
                last_error.as_deref().unwrap_or("none")
            ),
        )
    }

    /// Invoke one adapter under the configured attempt timeout
    async fn invoke(
        &self,
        adapter: &dyn ModelAdapter,
        prompt: &str,
        images: &[String],
    ) -> Result<ModelResponse, AdapterError> {
        let call = async {
            if images.is_empty() {
                adapter.process_text(prompt).await
            } else {
                adapter.process_with_images(prompt, images).await
            }
        };

        match self.config.attempt_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| AdapterError::Timeout)?,
            None => call.await,
        }
    }

    // ------------------------------------------------------------------
    // Health / metadata facade
    // ------------------------------------------------------------------

    /// Identities whose adapters currently report themselves available
    pub async fn list_available(&self) -> HashSet<ModelId> {
        let snapshot = self.current();
        available_models(&snapshot, self.config.health_check_timeout()).await
    }

    /// Probe every registered adapter; one entry per registration, with
    /// individual probe failures captured per entry
    pub async fn health_check(&self) -> HashMap<ModelId, super::health::HealthStatus> {
        let snapshot = self.current();
        probe_all(&snapshot, self.config.health_check_timeout()).await
    }

    /// Descriptive metadata for one identity; a soft error map when it
    /// has no registered adapter
    #[must_use]
    pub fn model_info(&self, model: ModelId) -> serde_json::Value {
        match self.current().adapter(model) {
            Some(adapter) => adapter.model_info(),
            None => serde_json::json!({
                "available": false,
                "error": "model not registered",
            }),
        }
    }

    /// Merge a provider configuration update into process-wide state and
    /// re-dispatch each family's slice to its adapters.
    ///
    /// Adapters guard their own settings, so calls already in flight keep
    /// the configuration they started with.
    pub fn update_config(&self, update: ProvidersUpdate) {
        let merged = {
            let mut providers = self.providers.lock();
            providers.merge(update);
            providers.clone()
        };

        let snapshot = self.current();
        for (model, adapter) in snapshot.adapters() {
            if let Some(slice) = merged.slice(adapter.provider_name()) {
                adapter.update_config(slice);
                tracing::debug!(model = %model, "provider configuration re-dispatched");
            }
        }
    }

    /// Install a new fallback policy; in-flight requests keep the old one
    pub fn set_fallback_policy(&self, policy: super::config::FallbackPolicy) {
        let next = Arc::new(self.current().with_policy(policy));
        *self.snapshot.write() = next;
    }

    /// Replace the whole registry snapshot in one swap
    pub fn replace_registry(&self, snapshot: RouterSnapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_prompt_without_context() {
        assert_eq!(compose_prompt(None, "hello"), "hello");
    }

    #[test]
    fn test_compose_prompt_with_empty_context() {
        // An empty bundle must not leave a stray separator
        let ctx = RequestContext::new();
        assert_eq!(compose_prompt(Some(&ctx), "hello"), "hello");
    }

    #[test]
    fn test_compose_prompt_prepends_block() {
        let ctx = RequestContext::new().with_page_title("T");
        assert_eq!(compose_prompt(Some(&ctx), "hello"), "Page Title: T\n\nhello");
    }

    #[test]
    fn test_request_builder() {
        let request = RouteRequest::new("hi")
            .with_model(ModelId::ClaudeHaiku)
            .with_images(vec!["a.png".to_string()])
            .with_max_retries(5);

        assert_eq!(request.prompt, "hi");
        assert_eq!(request.model, Some(ModelId::ClaudeHaiku));
        assert_eq!(request.images.len(), 1);
        assert_eq!(request.max_retries, Some(5));
        assert!(!request.request_id.is_empty());
    }
}
