//! Octoguard - Resilient GitHub REST API client
//!
//! Octoguard wraps the GitHub REST API with the machinery a long-running
//! integration needs to stay within its quota and survive transient failures.
//!
//! # Features
//!
//! - **Rate Limiting**: Token bucket pacing, reconciled with the server's
//!   `x-ratelimit-*` headers, waiting out exhausted windows
//! - **Retries**: Exponential backoff with jitter for transient failures,
//!   honoring `Retry-After`
//! - **Caching**: TTL and LRU bounded cache for GET responses with
//!   pattern-based invalidation
//! - **Metrics**: Request, error, cache and latency statistics with a
//!   derived health score
//! - **Cancellation**: Per-request cancellation tokens and client shutdown
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use octoguard::OctoguardSettings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     octoguard::init_observability()?;
//!
//!     let client = OctoguardSettings::load()?.build_client()?;
//!     let repo = client.get("/repos/rust-lang/rust").await?;
//!     println!("{}", repo.body()["full_name"]);
//!
//!     println!("{:?}", client.health().status());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Octoguard is organized as a workspace with focused crates:
//!
//! - `octoguard_error` - Error types and failure classification
//! - `octoguard_rate_limit` - Quota tracking and pacing
//! - `octoguard_cache` - Response cache
//! - `octoguard_metrics` - Metrics collection and health scoring
//! - `octoguard_client` - The request pipeline
//!
//! This crate (`octoguard`) re-exports everything for convenience and adds
//! configuration loading and observability setup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod observability;
mod settings;

pub use octoguard_cache::*;
pub use octoguard_client::*;
pub use octoguard_error::*;
pub use octoguard_metrics::*;
pub use octoguard_rate_limit::*;

pub use observability::{
    ObservabilityConfig, init_observability, init_observability_with_config,
    shutdown_observability,
};
pub use settings::{ENV_PREFIX, OctoguardSettings, load_client_config};
