//! Resilient client for rate-limited REST APIs, GitHub's in particular.
//!
//! [`ApiClient`] wraps an HTTP [`Transport`] with four fixed stages:
//!
//! - a response cache for GET requests ([`octoguard_cache`])
//! - a rate limiter honoring both a local budget and the remote quota headers
//!   ([`octoguard_rate_limit`])
//! - a retry loop driven by error classification, with exponential backoff and
//!   jitter
//! - metrics and a health score ([`octoguard_metrics`])
//!
//! # Example
//!
//! ```rust,ignore
//! use octoguard_client::{ApiClient, ClientConfig};
//!
//! let client = ApiClient::new(ClientConfig::default(), token)?;
//! let issues = client.get("/repos/rust-lang/rust/issues").await?;
//! let metrics = client.get_metrics();
//! ```

#![warn(missing_docs)]

mod backoff;
mod client;
mod config;
mod credential;
mod health;
mod interceptor;
mod request;
mod transport;

pub use backoff::{BackoffConfig, BackoffConfigBuilder, exponential_delay, with_jitter};
pub use client::{ApiClient, ApiClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_API_VERSION};
pub use credential::Credential;
pub use health::HealthReport;
pub use interceptor::{RequestInterceptor, ResponseInterceptor};
pub use request::{
    ApiRequest, ApiResponse, BatchOptions, BatchOptionsBuilder, CacheMode, HttpMethod,
    PreparedRequest, RequestOptions, RequestOptionsBuilder, TransportResponse,
};
pub use transport::{ReqwestTransport, Transport};
