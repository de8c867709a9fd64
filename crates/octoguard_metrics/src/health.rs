//! Health score derivation.

use serde::Serialize;

/// Average response time at which the latency penalty is at its maximum.
const SLOW_RESPONSE_MS: f64 = 5000.0;

const ERROR_WEIGHT: f64 = 50.0;
const LATENCY_WEIGHT: f64 = 30.0;
const CACHE_WEIGHT: f64 = 20.0;

/// Derive a 0–100 health score.
///
/// Penalties grow linearly with the error rate, with the average response
/// time up to five seconds, and with the cache miss ratio. Each input
/// moves the score in one direction only. With no cache lookups at all the
/// cache term contributes nothing.
///
/// # Example
///
/// ```
/// use octoguard_metrics::health_score;
///
/// assert_eq!(health_score(0.0, 0.0, 1.0, 10), 100.0);
/// assert!(health_score(0.5, 0.0, 1.0, 10) < health_score(0.1, 0.0, 1.0, 10));
/// ```
pub fn health_score(
    error_rate: f64,
    avg_response_ms: f64,
    cache_hit_ratio: f64,
    cache_lookups: u64,
) -> f64 {
    let error_penalty = error_rate.clamp(0.0, 1.0) * ERROR_WEIGHT;
    let latency_penalty = (avg_response_ms / SLOW_RESPONSE_MS).clamp(0.0, 1.0) * LATENCY_WEIGHT;
    let cache_penalty = if cache_lookups == 0 {
        0.0
    } else {
        (1.0 - cache_hit_ratio.clamp(0.0, 1.0)) * CACHE_WEIGHT
    };
    (100.0 - error_penalty - latency_penalty - cache_penalty).clamp(0.0, 100.0)
}

/// Coarse health bucket for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Score of 80 or more
    Healthy,
    /// Score of 50 or more
    Degraded,
    /// Anything lower
    Unhealthy,
}

impl HealthStatus {
    /// Bucket a health score.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthStatus::Healthy
        } else if score >= 50.0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }
}
