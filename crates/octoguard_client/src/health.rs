//! Client health report.

use derive_getters::Getters;
use octoguard_cache::CacheStats;
use octoguard_metrics::{HealthStatus, MetricsSnapshot};
use octoguard_rate_limit::RateLimitStatus;
use serde::Serialize;

/// Point-in-time view of client health.
#[derive(Debug, Clone, Serialize, Getters)]
pub struct HealthReport {
    /// 0–100 score from error rate, latency and cache effectiveness
    score: f64,
    /// Bucketed score
    status: HealthStatus,
    /// Limiter state
    rate_limit: RateLimitStatus,
    /// Cache counters
    cache: CacheStats,
    /// Whether `shutdown` has been called
    shut_down: bool,
}

impl HealthReport {
    pub(crate) fn new(
        metrics: &MetricsSnapshot,
        rate_limit: RateLimitStatus,
        cache: CacheStats,
        shut_down: bool,
    ) -> Self {
        let status = if shut_down {
            HealthStatus::Unhealthy
        } else {
            *metrics.health_status()
        };
        Self {
            score: *metrics.health_score(),
            status,
            rate_limit,
            cache,
            shut_down,
        }
    }

    /// True unless the client is shut down or unhealthy.
    pub fn is_operational(&self) -> bool {
        !self.shut_down && self.status != HealthStatus::Unhealthy
    }
}
