//! Per-Identity Rate Limiting
//!
//! Token-bucket gate the router consults before each dispatch attempt.
//! The gate is an injectable policy: the router only sees the [`RateGate`]
//! trait, so deployments can swap in their own admission logic (or a
//! no-op) without touching the routing loop.
//!
//! # Algorithm
//!
//! One bucket per identity, seeded from the configured
//! requests-per-minute number:
//! - Tokens refill continuously at the per-minute rate
//! - The balance is tracked in milli-tokens for sub-token precision
//! - A bucket holds at most one minute's budget
//! - Each dispatch attempt consumes one token
//!
//! A denied candidate is skipped like an unavailable one; the router does
//! not treat it as a request failure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::config::{ModelId, RateLimitConfig};

/// Admission policy consulted before every dispatch attempt
pub trait RateGate: Send + Sync {
    /// Try to take one dispatch slot for `model`. Returns `false` when the
    /// identity is currently over its budget.
    fn try_acquire(&self, model: ModelId) -> bool;
}

/// Gate that always admits (for testing and for deployments that enforce
/// limits elsewhere)
#[derive(Clone, Copy, Debug, Default)]
pub struct UnlimitedGate;

impl RateGate for UnlimitedGate {
    fn try_acquire(&self, _model: ModelId) -> bool {
        true
    }
}

/// Milli-token bucket for one identity
struct ModelBucket {
    /// Configured requests per minute
    requests_per_minute: u32,

    /// Current balance, scaled by 1000 for precision
    tokens_millis: AtomicU64,

    /// Last refill time
    last_refill: Mutex<Instant>,
}

impl ModelBucket {
    fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            // Start with the full minute budget available
            tokens_millis: AtomicU64::new(u64::from(requests_per_minute) * 1000),
            last_refill: Mutex::new(Instant::now()),
        }
    }

    fn try_acquire(&self) -> bool {
        self.refill();

        let tokens = self.tokens_millis.load(Ordering::SeqCst);
        if tokens >= 1000 {
            self.tokens_millis.fetch_sub(1000, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    fn refill(&self) {
        let now = Instant::now();
        let mut last_refill = self.last_refill.lock();

        let elapsed_ms = now.duration_since(*last_refill).as_millis() as u64;
        if elapsed_ms == 0 {
            return;
        }

        // rate is per minute; milli-tokens accrued = rpm * elapsed_ms / 60
        let tokens_to_add = u64::from(self.requests_per_minute) * elapsed_ms / 60;
        if tokens_to_add == 0 {
            // Too little time has passed to mint anything at this rate;
            // keep the refill timestamp so the remainder is not lost.
            return;
        }

        let max_tokens_millis = u64::from(self.requests_per_minute) * 1000;
        let current = self.tokens_millis.load(Ordering::SeqCst);
        let new_tokens = (current + tokens_to_add).min(max_tokens_millis);
        self.tokens_millis.store(new_tokens, Ordering::SeqCst);

        *last_refill = now;
    }
}

/// Default [`RateGate`]: one token bucket per configured identity.
///
/// Identities without a configured limit are admitted unconditionally.
pub struct TokenBucketGate {
    config: RateLimitConfig,
    buckets: DashMap<ModelId, ModelBucket>,
}

impl TokenBucketGate {
    /// Create a gate from the per-identity limit table
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }
}

impl RateGate for TokenBucketGate {
    fn try_acquire(&self, model: ModelId) -> bool {
        if !self.config.enabled {
            return true;
        }

        let Some(limit) = self.config.per_model.get(&model) else {
            return true;
        };

        self.buckets
            .entry(model)
            .or_insert_with(|| ModelBucket::new(limit.requests_per_minute))
            .try_acquire()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::routing::config::ModelRateLimit;

    fn gate_with(model: ModelId, requests_per_minute: u32) -> TokenBucketGate {
        let mut per_model = HashMap::new();
        per_model.insert(
            model,
            ModelRateLimit {
                requests_per_minute,
                tokens_per_minute: 0,
            },
        );
        TokenBucketGate::new(RateLimitConfig {
            enabled: true,
            per_model,
        })
    }

    #[test]
    fn test_budget_exhausts() {
        let gate = gate_with(ModelId::ClaudeSonnet, 3);

        assert!(gate.try_acquire(ModelId::ClaudeSonnet));
        assert!(gate.try_acquire(ModelId::ClaudeSonnet));
        assert!(gate.try_acquire(ModelId::ClaudeSonnet));
        // Fourth request inside the same instant is over budget
        assert!(!gate.try_acquire(ModelId::ClaudeSonnet));
    }

    #[test]
    fn test_unconfigured_identity_is_unlimited() {
        let gate = gate_with(ModelId::ClaudeSonnet, 1);
        for _ in 0..100 {
            assert!(gate.try_acquire(ModelId::GeminiPro));
        }
    }

    #[test]
    fn test_disabled_gate_admits_everything() {
        let gate = TokenBucketGate::new(RateLimitConfig::disabled());
        for _ in 0..100 {
            assert!(gate.try_acquire(ModelId::OpenAiGpt4));
        }
    }

    #[test]
    fn test_unlimited_gate() {
        let gate = UnlimitedGate;
        assert!(gate.try_acquire(ModelId::OpenAiGpt35));
    }
}
