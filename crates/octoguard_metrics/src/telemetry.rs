//! OpenTelemetry instruments for API client traffic.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;

static TELEMETRY: OnceLock<ApiTelemetry> = OnceLock::new();

/// OpenTelemetry instruments for API client traffic.
///
/// Labeled with HTTP method, status and error category.
#[derive(Clone)]
pub struct ApiTelemetry {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Network attempts
    pub requests: Counter<u64>,
    /// Failed attempts
    pub errors: Counter<u64>,
    /// Attempt duration in seconds
    pub duration: Histogram<f64>,
    /// Cache lookups, labeled hit/miss
    pub cache_lookups: Counter<u64>,
    /// Retries scheduled
    pub retries: Counter<u64>,
    /// Time spent waiting on the rate limiter, in seconds
    pub rate_limit_wait: Histogram<f64>,
}

impl ApiTelemetry {
    fn init() -> Self {
        let meter = global::meter("octoguard_client");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("api.requests")
                .with_description("Network attempts against the remote API")
                .build(),
            errors: meter
                .u64_counter("api.errors")
                .with_description("Failed attempts against the remote API")
                .build(),
            duration: meter
                .f64_histogram("api.duration")
                .with_unit("seconds")
                .with_description("Remote API attempt duration")
                .build(),
            cache_lookups: meter
                .u64_counter("api.cache.lookups")
                .with_description("Response cache lookups")
                .build(),
            retries: meter
                .u64_counter("api.retries")
                .with_description("Retries scheduled after transient failures")
                .build(),
            rate_limit_wait: meter
                .f64_histogram("api.rate_limit.wait")
                .with_unit("seconds")
                .with_description("Time spent waiting for rate limiter clearance")
                .build(),
        }
    }

    /// Get the process-wide instrument set.
    pub fn get() -> &'static Self {
        TELEMETRY.get_or_init(Self::init)
    }

    /// Record one network attempt.
    pub fn record_request(&self, method: &str) {
        self.requests
            .add(1, &[KeyValue::new("method", method.to_string())]);
    }

    /// Record a received response.
    pub fn record_response(&self, method: &str, status: u16, duration_secs: f64) {
        let labels = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", i64::from(status)),
        ];
        self.duration.record(duration_secs, labels);
    }

    /// Record a failed attempt.
    pub fn record_error(&self, category: &str) {
        self.errors
            .add(1, &[KeyValue::new("error_type", category.to_string())]);
    }

    /// Record a cache lookup.
    pub fn record_cache_lookup(&self, hit: bool) {
        let outcome = if hit { "hit" } else { "miss" };
        self.cache_lookups
            .add(1, &[KeyValue::new("outcome", outcome)]);
    }

    /// Record a scheduled retry.
    pub fn record_retry(&self) {
        self.retries.add(1, &[]);
    }

    /// Record time spent waiting for the rate limiter.
    pub fn record_rate_limit_wait(&self, wait_secs: f64) {
        self.rate_limit_wait.record(wait_secs, &[]);
    }
}
