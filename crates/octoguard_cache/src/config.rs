//! Cache configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the request cache.
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
pub struct RequestCacheConfig {
    /// Default TTL for cached entries (seconds)
    #[serde(default = "default_ttl")]
    #[builder(default = "default_ttl()")]
    ttl_secs: u64,

    /// Maximum cache size (number of entries)
    #[serde(default = "default_max_size")]
    #[builder(default = "default_max_size()")]
    max_size: usize,

    /// Optional bound on the estimated memory footprint (bytes)
    #[serde(default)]
    #[builder(default)]
    max_memory_bytes: Option<usize>,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    enabled: bool,
}

fn default_ttl() -> u64 {
    300 // 5 minutes
}

fn default_max_size() -> usize {
    1000
}

fn default_enabled() -> bool {
    true
}

impl Default for RequestCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            max_size: default_max_size(),
            max_memory_bytes: None,
            enabled: default_enabled(),
        }
    }
}

impl RequestCacheConfig {
    /// Default TTL as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
