//! Router Metrics
//!
//! Lightweight request accounting for the routing core: how many requests
//! came in, how many attempts they cost, how often the answer came from a
//! fallback, and per-identity attempt/success/failure counts. Everything
//! is lock-free counters; `snapshot()` produces a serializable copy for
//! logs or an embedding process to export.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use super::config::ModelId;

/// Per-identity counters
#[derive(Debug, Default)]
struct ModelCounters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
}

/// Counters for the routing core
#[derive(Debug, Default)]
pub struct RouterMetrics {
    /// Requests received
    requests_total: AtomicU64,

    /// Adapter invocations across all requests
    attempts_total: AtomicU64,

    /// Requests answered by an identity other than the requested one
    fallbacks_total: AtomicU64,

    /// Requests that exhausted every candidate
    exhausted_total: AtomicU64,

    /// Per-identity attempt/success/failure counts
    per_model: DashMap<ModelId, ModelCounters>,
}

impl RouterMetrics {
    /// Create zeroed metrics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_attempt(&self, model: ModelId) {
        self.attempts_total.fetch_add(1, Ordering::Relaxed);
        self.per_model
            .entry(model)
            .or_default()
            .attempts
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self, model: ModelId, fellback: bool) {
        if fellback {
            self.fallbacks_total.fetch_add(1, Ordering::Relaxed);
        }
        self.per_model
            .entry(model)
            .or_default()
            .successes
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, model: ModelId) {
        self.per_model
            .entry(model)
            .or_default()
            .failures
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_exhausted(&self) {
        self.exhausted_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let per_model = self
            .per_model
            .iter()
            .map(|entry| {
                (
                    *entry.key(),
                    ModelStats {
                        attempts: entry.attempts.load(Ordering::Relaxed),
                        successes: entry.successes.load(Ordering::Relaxed),
                        failures: entry.failures.load(Ordering::Relaxed),
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            attempts_total: self.attempts_total.load(Ordering::Relaxed),
            fallbacks_total: self.fallbacks_total.load(Ordering::Relaxed),
            exhausted_total: self.exhausted_total.load(Ordering::Relaxed),
            per_model,
        }
    }
}

/// Point-in-time copy of the router counters
#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    /// Requests received
    pub requests_total: u64,

    /// Adapter invocations across all requests
    pub attempts_total: u64,

    /// Requests answered by a fallback identity
    pub fallbacks_total: u64,

    /// Requests that exhausted every candidate
    pub exhausted_total: u64,

    /// Per-identity counts
    pub per_model: HashMap<ModelId, ModelStats>,
}

/// Per-identity counter values
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ModelStats {
    /// Invocations attempted against this identity
    pub attempts: u64,

    /// Invocations that returned a usable envelope
    pub successes: u64,

    /// Invocations that failed or returned an error-bearing envelope
    pub failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = RouterMetrics::new();
        metrics.record_request();
        metrics.record_attempt(ModelId::OpenAiGpt4);
        metrics.record_failure(ModelId::OpenAiGpt4);
        metrics.record_attempt(ModelId::ClaudeSonnet);
        metrics.record_success(ModelId::ClaudeSonnet, true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 1);
        assert_eq!(snapshot.attempts_total, 2);
        assert_eq!(snapshot.fallbacks_total, 1);
        assert_eq!(snapshot.exhausted_total, 0);
        assert_eq!(snapshot.per_model[&ModelId::OpenAiGpt4].failures, 1);
        assert_eq!(snapshot.per_model[&ModelId::ClaudeSonnet].successes, 1);
    }
}
