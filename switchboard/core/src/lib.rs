//! Switchboard Core - AI Request Routing and Fallback Resolution
//!
//! This crate routes a text/image generation request to one of several LLM
//! provider backends, walking a configured fallback chain when a backend
//! is unavailable, rate-limited, or erroring, and returns a uniform
//! response envelope regardless of which backend served it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Callers                              │
//! │        (daemon, embedding service, test harness)             │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │  RouteRequest
//! ┌───────────────────────────┼──────────────────────────────────┐
//! │                      SWITCHBOARD CORE                        │
//! │  ┌────────────────────────┴───────────────────────────────┐  │
//! │  │                        Router                          │  │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────────┐  │  │
//! │  │  │ Fallback │ │Capability│ │ RateGate │ │ Registry  │  │  │
//! │  │  │ Resolver │ │  Table   │ │ (bucket) │ │ Snapshot  │  │  │
//! │  │  └──────────┘ └──────────┘ └──────────┘ └─────┬─────┘  │  │
//! │  └────────────────────────────────────────────────┼───────┘  │
//! └───────────────────────────────────────────────────┼──────────┘
//!                             ModelAdapter (trait)    │
//!                  ┌──────────────┬────────────────┬──┘
//!                  ▼              ▼                ▼
//!             ┌─────────┐   ┌──────────┐   ┌───────────┐
//!             │ OpenAI  │   │  Gemini  │   │ Anthropic │
//!             └─────────┘   └──────────┘   └───────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Router`]: the orchestration core; first-success fallback routing
//! - [`RouteRequest`]: one generation request (prompt, context, images)
//! - [`ModelResponse`]: the uniform envelope every request resolves to
//! - [`ModelId`]: the closed set of provider+model identities
//! - [`ModelAdapter`]: the capability contract provider backends satisfy
//! - [`FallbackPolicy`]: primary identity plus the ordered fallback chain
//!
//! # Quick Start
//!
//! ```ignore
//! use switchboard_core::{
//!     config::load_config,
//!     routing::{RouteRequest, Router},
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let (providers, router_config) = load_config().unwrap().into_runtime();
//!     let router = Router::new(providers, router_config);
//!
//!     let response = router
//!         .process_request(RouteRequest::new("Summarize this page"))
//!         .await;
//!
//!     match response.error {
//!         None => println!("{} answered: {}", response.model_used, response.content),
//!         Some(e) => eprintln!("request failed: {e}"),
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: the `ModelAdapter` contract and provider adapters
//! - [`routing`]: fallback resolution, capability and rate filters, the
//!   router itself, health probing, metrics
//! - [`config`]: TOML configuration loading
//!
//! # Failure Model
//!
//! `Router::process_request` never returns an error. Per-attempt failures
//! advance the fallback chain; total exhaustion is reported inside the
//! returned envelope, so callers always hold a well-formed result.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod routing;

// Re-exports for convenience
pub use backend::{
    AdapterError, AnthropicAdapter, GeminiAdapter, ModelAdapter, ModelResponse, OpenAiAdapter,
    ProviderConfig,
};
pub use routing::capability::supports_images;
pub use routing::context::RequestContext;
pub use routing::health::HealthStatus;
pub use routing::metrics::{MetricsSnapshot, ModelStats, RouterMetrics};
pub use routing::rate_limit::{RateGate, TokenBucketGate, UnlimitedGate};
pub use routing::registry::{ProvidersConfig, ProvidersUpdate, RouterSnapshot};
pub use routing::{
    FallbackPolicy, ModelId, ModelRateLimit, RateLimitConfig, RouteRequest, Router, RouterConfig,
};

// Config exports
pub use config::{default_config_path, load_config, load_config_from_path, ConfigError};
