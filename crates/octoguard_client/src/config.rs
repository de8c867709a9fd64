//! Client configuration.

use crate::BackoffConfig;
use derive_getters::Getters;
use octoguard_cache::RequestCacheConfig;
use octoguard_error::ConfigError;
use octoguard_rate_limit::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// GitHub REST API version sent with every request.
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Configuration for [`ApiClient`](crate::ApiClient).
///
/// Every field has a default, so an empty TOML table is a valid
/// configuration. Unknown keys are rejected.
///
/// # Example
///
/// ```toml
/// base_url = "https://api.github.com"
/// timeout_secs = 30
/// retry_attempts = 3
///
/// [cache]
/// ttl_secs = 300
/// max_size = 1000
///
/// [rate_limit]
/// window_capacity = 5000
/// window_secs = 3600
/// burst_allowance = 100
///
/// [backoff]
/// base_ms = 1000
/// max_ms = 30000
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[serde(deny_unknown_fields)]
#[setters(prefix = "with_")]
#[builder(setter(into))]
pub struct ClientConfig {
    /// API root; request paths are appended to it
    #[serde(default = "default_base_url")]
    #[builder(default = "default_base_url()")]
    base_url: String,

    /// Per-attempt timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    #[builder(default = "default_timeout_secs()")]
    timeout_secs: u64,

    /// Total attempts per request, first try included
    #[serde(default = "default_retry_attempts")]
    #[builder(default = "default_retry_attempts()")]
    retry_attempts: u32,

    /// `User-Agent` header
    #[serde(default = "default_user_agent")]
    #[builder(default = "default_user_agent()")]
    user_agent: String,

    /// `X-GitHub-Api-Version` header
    #[serde(default = "default_api_version")]
    #[builder(default = "default_api_version()")]
    api_version: String,

    /// Response cache
    #[serde(default)]
    #[builder(default)]
    cache: RequestCacheConfig,

    /// Rate limiter
    #[serde(default)]
    #[builder(default)]
    rate_limit: RateLimitConfig,

    /// Retry backoff
    #[serde(default)]
    #[builder(default)]
    backoff: BackoffConfig,
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("octoguard/{}", env!("CARGO_PKG_VERSION"))
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            user_agent: default_user_agent(),
            api_version: default_api_version(),
            cache: RequestCacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Builder for client configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Per-attempt timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reject configurations the client cannot run with.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::new(format!("Invalid base_url '{}': {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::new(format!(
                "base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::new("timeout_secs must be greater than zero"));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::new("retry_attempts must be at least 1"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::new("user_agent must not be empty"));
        }
        if *self.backoff.base_ms() > *self.backoff.max_ms() {
            return Err(ConfigError::new("backoff.base_ms must not exceed backoff.max_ms"));
        }
        self.rate_limit
            .validate()
            .map_err(|e| ConfigError::new(format!("rate_limit: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url(), "https://api.github.com");
        assert_eq!(*config.retry_attempts(), 3);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.user_agent().starts_with("octoguard/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_matches_defaults() {
        let built = ClientConfig::builder().build().unwrap();
        assert_eq!(built, ClientConfig::default());
    }

    #[test]
    fn test_setters() {
        let config = ClientConfig::default()
            .with_retry_attempts(5)
            .with_base_url("http://localhost:8080".to_string());
        assert_eq!(*config.retry_attempts(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let bad = [
            ClientConfig::default().with_base_url("ftp://example.com".to_string()),
            ClientConfig::default().with_base_url("not a url".to_string()),
            ClientConfig::default().with_retry_attempts(0),
            ClientConfig::default().with_timeout_secs(0),
            ClientConfig::default().with_backoff(
                crate::BackoffConfigBuilder::default()
                    .base_ms(5000)
                    .max_ms(100)
                    .build()
                    .unwrap(),
            ),
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{:?} accepted", config);
        }
    }
}
