//! Point-in-time metrics views.

use crate::HealthStatus;
use derive_getters::Getters;
use octoguard_error::ErrorCategory;
use serde::Serialize;
use std::collections::BTreeMap;

/// Response-time statistics in milliseconds.
///
/// `min`, `max` and `avg` cover every recorded response; percentiles cover
/// the most recent sample window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Getters)]
pub struct ResponseTimeStats {
    pub(crate) count: u64,
    pub(crate) avg_ms: f64,
    pub(crate) min_ms: f64,
    pub(crate) max_ms: f64,
    pub(crate) p50_ms: f64,
    pub(crate) p95_ms: f64,
    pub(crate) p99_ms: f64,
}

/// Aggregated client metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct MetricsSnapshot {
    pub(crate) total_requests: u64,
    pub(crate) total_responses: u64,
    pub(crate) total_errors: u64,
    pub(crate) retries: u64,
    pub(crate) requests_by_method: BTreeMap<String, u64>,
    pub(crate) responses_by_status: BTreeMap<u16, u64>,
    pub(crate) errors_by_kind: BTreeMap<ErrorCategory, u64>,
    pub(crate) response_time: ResponseTimeStats,
    pub(crate) cache_hits: u64,
    pub(crate) cache_misses: u64,
    pub(crate) cache_hit_ratio: f64,
    pub(crate) rate_limit_waits: u64,
    pub(crate) rate_limit_delay_ms: u64,
    pub(crate) error_rate: f64,
    pub(crate) health_score: f64,
    pub(crate) health_status: HealthStatus,
    pub(crate) uptime_secs: u64,
}

impl MetricsSnapshot {
    /// Error count for one category.
    pub fn errors_of(&self, kind: ErrorCategory) -> u64 {
        self.errors_by_kind.get(&kind).copied().unwrap_or(0)
    }
}
