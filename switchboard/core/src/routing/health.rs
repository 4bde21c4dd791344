//! Health and Availability Probing
//!
//! Fan-out over every registered adapter's availability predicate. Probes
//! run concurrently and are isolated from each other: one probe hanging
//! past the timeout or panicking marks only its own entry unavailable and
//! never fails the aggregate.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use super::config::ModelId;
use super::registry::RouterSnapshot;

/// Outcome of one availability probe
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Whether the backend reported itself usable
    pub available: bool,

    /// When the probe completed
    pub checked_at: DateTime<Utc>,

    /// Probe failure description (timeout, panic), if any
    pub error: Option<String>,
}

impl HealthStatus {
    fn up(available: bool) -> Self {
        Self {
            available,
            checked_at: Utc::now(),
            error: None,
        }
    }

    fn down(error: impl Into<String>) -> Self {
        Self {
            available: false,
            checked_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Probe every adapter in the snapshot concurrently.
///
/// Always returns one entry per registration. A probe that exceeds
/// `timeout` or panics produces an unavailable entry carrying the failure
/// text; all other entries reflect their true status.
pub(crate) async fn probe_all(
    snapshot: &RouterSnapshot,
    timeout: Duration,
) -> HashMap<ModelId, HealthStatus> {
    let mut tasks = JoinSet::new();
    let mut task_models = HashMap::new();

    for (model, adapter) in snapshot.adapters() {
        let adapter = adapter.clone();
        let handle = tasks.spawn(async move {
            match tokio::time::timeout(timeout, adapter.is_available()).await {
                Ok(available) => HealthStatus::up(available),
                Err(_) => HealthStatus::down(format!(
                    "availability check timed out after {}ms",
                    timeout.as_millis()
                )),
            }
        });
        task_models.insert(handle.id(), model);
    }

    let mut statuses = HashMap::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, status)) => {
                if let Some(model) = task_models.remove(&id) {
                    statuses.insert(model, status);
                }
            }
            Err(join_error) => {
                // A panicking probe must not take the sweep down with it
                if let Some(model) = task_models.remove(&join_error.id()) {
                    tracing::warn!(model = %model, error = %join_error, "availability check crashed");
                    statuses.insert(
                        model,
                        HealthStatus::down(format!("availability check crashed: {join_error}")),
                    );
                }
            }
        }
    }

    statuses
}

/// Reduce a probe sweep to the set of identities currently answering
pub(crate) async fn available_models(
    snapshot: &RouterSnapshot,
    timeout: Duration,
) -> HashSet<ModelId> {
    probe_all(snapshot, timeout)
        .await
        .into_iter()
        .filter_map(|(model, status)| status.available.then_some(model))
        .collect()
}
