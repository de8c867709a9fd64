//! Exponential backoff with jitter.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry backoff configuration.
///
/// The delay before retry `n` (1-based) is `base_ms * 2^(n-1)`, capped at
/// `max_ms`, then jittered into the upper half of that range.
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
pub struct BackoffConfig {
    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_base_ms")]
    #[builder(default = "default_base_ms()")]
    base_ms: u64,

    /// Upper bound for a single delay (milliseconds)
    #[serde(default = "default_max_ms")]
    #[builder(default = "default_max_ms()")]
    max_ms: u64,
}

fn default_base_ms() -> u64 {
    1000
}

fn default_max_ms() -> u64 {
    30_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: default_base_ms(),
            max_ms: default_max_ms(),
        }
    }
}

impl BackoffConfig {
    /// Delay before retry `attempt` (1-based), without jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        exponential_delay(
            attempt,
            Duration::from_millis(self.base_ms),
            Duration::from_millis(self.max_ms),
        )
    }

    /// Endless sequence of jittered delays, one per retry.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        let config = self.clone();
        (1u32..).map(move |attempt| with_jitter(config.delay(attempt)))
    }
}

/// `base * 2^(attempt-1)`, capped at `max`. Attempt 0 is treated as 1.
///
/// # Example
///
/// ```
/// use octoguard_client::exponential_delay;
/// use std::time::Duration;
///
/// let base = Duration::from_millis(100);
/// let max = Duration::from_secs(1);
/// assert_eq!(exponential_delay(1, base, max), Duration::from_millis(100));
/// assert_eq!(exponential_delay(3, base, max), Duration::from_millis(400));
/// assert_eq!(exponential_delay(10, base, max), max);
/// ```
pub fn exponential_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exponent)
        .map_or(max, |delay| delay.min(max))
}

/// Spread `delay` uniformly over `[delay / 2, delay]`.
///
/// `tokio_retry2::strategy::jitter` scales by a factor in `[0.5, 1.5)`, so
/// jittering `delay / 2` lands in `[delay / 4, 3 * delay / 4)`. Shifting that
/// by `delay / 4` gives the upper half of `delay`, never more than `delay`.
pub fn with_jitter(delay: Duration) -> Duration {
    let quarter = delay / 4;
    let jittered = quarter + tokio_retry2::strategy::jitter(delay / 2);
    jittered.clamp(delay / 2, delay)
}
