//! Fallback Resolution
//!
//! Derives the ordered candidate list for one request from the requested
//! identity and the configured fallback policy. Pure function, no I/O;
//! availability and capability filtering happen later, per attempt, in the
//! router loop.

use super::config::{FallbackPolicy, ModelId};

/// Build the ordered candidate list for a request.
///
/// The requested identity goes first, followed by the policy's chain with
/// every occurrence of the requested identity removed, so it is attempted
/// exactly once. Nothing else is reordered or deduplicated; if the chain
/// repeats some other identity, it will be attempted again. When the
/// requested identity is not the configured primary, the primary gets no
/// special treatment — it is attempted only if (and where) the chain
/// mentions it.
#[must_use]
pub fn resolve_candidates(requested: ModelId, policy: &FallbackPolicy) -> Vec<ModelId> {
    let mut candidates = Vec::with_capacity(1 + policy.chain.len());
    candidates.push(requested);
    candidates.extend(policy.chain.iter().copied().filter(|m| *m != requested));
    candidates
}
