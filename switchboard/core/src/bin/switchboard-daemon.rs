//! Switchboard Daemon
//!
//! Standalone process hosting the routing core. It loads configuration,
//! builds the provider registry, and keeps a periodic availability sweep
//! in the logs so operators can see backend health at a glance.
//!
//! # Usage
//!
//! ```bash
//! # Start with the default config path ($XDG_CONFIG_HOME/switchboard/switchboard.toml)
//! switchboard-daemon
//!
//! # Start with a custom config file
//! SWITCHBOARD_CONFIG=/etc/switchboard.toml switchboard-daemon
//!
//! # With verbose logging
//! RUST_LOG=debug switchboard-daemon
//! ```
//!
//! # Environment Variables
//!
//! - `SWITCHBOARD_CONFIG`: Custom config file path
//! - `OPENAI_API_KEY` / `GEMINI_API_KEY` / `ANTHROPIC_API_KEY`: Provider
//!   credentials (names are overridable per provider in the config file)
//! - `SWITCHBOARD_HEALTH_INTERVAL_SECS`: Seconds between availability
//!   sweeps (default: 60)
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGINT (Ctrl-C): Graceful shutdown

use std::time::Duration;

use tracing::{info, warn};

use switchboard_core::{load_config, Router};

fn health_interval() -> Duration {
    let secs = std::env::var("SWITCHBOARD_HEALTH_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);
    Duration::from_secs(secs)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("switchboard_daemon=info".parse()?)
                .add_directive("switchboard_core=info".parse()?),
        )
        .with_target(true)
        .init();

    info!("Starting Switchboard Daemon");
    info!("PID: {}", std::process::id());

    let (providers, router_config) = load_config()?.into_runtime();
    let router = Router::new(providers, router_config);

    // Immediate sweep so startup logs show what is reachable
    log_health(&router).await;

    let mut ticker = tokio::time::interval(health_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately; the sweep above already covered it
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                log_health(&router).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    let snapshot = router.metrics().snapshot();
    info!(
        requests = snapshot.requests_total,
        fallbacks = snapshot.fallbacks_total,
        exhausted = snapshot.exhausted_total,
        "Switchboard Daemon stopped"
    );
    Ok(())
}

/// Run one availability sweep and log the outcome per identity
async fn log_health(router: &Router) {
    let statuses = router.health_check().await;
    let available = statuses.values().filter(|s| s.available).count();

    info!(
        available,
        registered = statuses.len(),
        "availability sweep complete"
    );

    for (model, status) in &statuses {
        if status.available {
            info!(model = %model, "backend available");
        } else {
            match &status.error {
                Some(error) => warn!(model = %model, error = %error, "backend probe failed"),
                None => warn!(model = %model, "backend unavailable"),
            }
        }
    }
}
