//! Configuration for the rate limiter.

use crate::{RateLimitError, RateLimitErrorKind};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate limiter configuration.
///
/// The local bucket admits `window_capacity + burst_allowance` calls at once
/// and refills at `window_capacity` per `window_secs`. Defaults match GitHub's
/// authenticated REST quota.
///
/// # Example
///
/// ```toml
/// [rate_limit]
/// window_capacity = 5000
/// window_secs = 3600
/// burst_allowance = 100
/// max_reset_wait_secs = 3600
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
pub struct RateLimitConfig {
    /// Calls allowed per window
    #[serde(default = "default_window_capacity")]
    #[builder(default = "default_window_capacity()")]
    window_capacity: u32,

    /// Window length (seconds)
    #[serde(default = "default_window_secs")]
    #[builder(default = "default_window_secs()")]
    window_secs: u64,

    /// Extra calls admitted in a burst on top of the window capacity
    #[serde(default = "default_burst_allowance")]
    #[builder(default = "default_burst_allowance()")]
    burst_allowance: u32,

    /// Longest single wait for a remote quota reset (seconds)
    #[serde(default = "default_max_reset_wait_secs")]
    #[builder(default = "default_max_reset_wait_secs()")]
    max_reset_wait_secs: u64,
}

fn default_window_capacity() -> u32 {
    5000
}

fn default_window_secs() -> u64 {
    3600
}

fn default_burst_allowance() -> u32 {
    100
}

fn default_max_reset_wait_secs() -> u64 {
    3600
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            window_secs: default_window_secs(),
            burst_allowance: default_burst_allowance(),
            max_reset_wait_secs: default_max_reset_wait_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Window length as a duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Longest single wait for a remote reset as a duration.
    pub fn max_reset_wait(&self) -> Duration {
        Duration::from_secs(self.max_reset_wait_secs)
    }

    /// Reject configurations the limiter cannot enforce.
    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.window_capacity == 0 {
            return Err(RateLimitError::new(RateLimitErrorKind::InvalidConfig(
                "window_capacity must be greater than zero".to_string(),
            )));
        }
        if self.window_secs == 0 {
            return Err(RateLimitError::new(RateLimitErrorKind::InvalidConfig(
                "window_secs must be greater than zero".to_string(),
            )));
        }
        Ok(())
    }
}
