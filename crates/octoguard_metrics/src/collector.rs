//! Metrics collection for API client traffic.

use crate::{ApiTelemetry, HealthStatus, MetricsSnapshot, ResponseTimeStats, health_score};
use octoguard_error::{ErrorCategory, ErrorClassification};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Number of most recent response times kept for percentiles.
const SAMPLE_WINDOW: usize = 1000;

/// Metrics collector for API client traffic.
///
/// Cheap to clone; clones share the same aggregates. Safe to record from any
/// number of concurrent requests.
///
/// # Example
///
/// ```
/// use octoguard_metrics::MetricsCollector;
/// use std::time::Duration;
///
/// let metrics = MetricsCollector::new();
/// metrics.record_request("GET");
/// metrics.record_response("GET", 200, Duration::from_millis(120));
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(*snapshot.total_requests(), 1);
/// assert_eq!(snapshot.responses_by_status()[&200], 1);
/// ```
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    requests: AtomicU64,
    responses: AtomicU64,
    errors: AtomicU64,
    retries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    rate_limit_waits: AtomicU64,
    rate_limit_delay_micros: AtomicU64,
    detail: Mutex<MetricsDetail>,
}

#[derive(Debug)]
struct MetricsDetail {
    started_at: Instant,
    requests_by_method: BTreeMap<String, u64>,
    responses_by_status: BTreeMap<u16, u64>,
    errors_by_kind: BTreeMap<ErrorCategory, u64>,
    response_times: ResponseTimes,
}

impl Default for MetricsDetail {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            requests_by_method: BTreeMap::new(),
            responses_by_status: BTreeMap::new(),
            errors_by_kind: BTreeMap::new(),
            response_times: ResponseTimes::default(),
        }
    }
}

#[derive(Debug, Default)]
struct ResponseTimes {
    count: u64,
    total: Duration,
    min: Option<Duration>,
    max: Duration,
    samples: VecDeque<Duration>,
}

impl ResponseTimes {
    fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.min = Some(self.min.map_or(elapsed, |m| m.min(elapsed)));
        self.max = self.max.max(elapsed);
        if self.samples.len() == SAMPLE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(elapsed);
    }

    fn stats(&self) -> ResponseTimeStats {
        if self.count == 0 {
            return ResponseTimeStats::default();
        }
        let mut sorted: Vec<Duration> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        ResponseTimeStats {
            count: self.count,
            avg_ms: millis(self.total) / self.count as f64,
            min_ms: millis(self.min.unwrap_or_default()),
            max_ms: millis(self.max),
            p50_ms: percentile(&sorted, 50.0),
            p95_ms: percentile(&sorted, 95.0),
            p99_ms: percentile(&sorted, 99.0),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                requests: AtomicU64::new(0),
                responses: AtomicU64::new(0),
                errors: AtomicU64::new(0),
                retries: AtomicU64::new(0),
                cache_hits: AtomicU64::new(0),
                cache_misses: AtomicU64::new(0),
                rate_limit_waits: AtomicU64::new(0),
                rate_limit_delay_micros: AtomicU64::new(0),
                detail: Mutex::new(MetricsDetail::default()),
            }),
        }
    }

    /// Records a network attempt.
    pub fn record_request(&self, method: &str) {
        self.inner.requests.fetch_add(1, Ordering::Relaxed);
        *self
            .inner
            .detail
            .lock()
            .requests_by_method
            .entry(method.to_string())
            .or_insert(0) += 1;
        ApiTelemetry::get().record_request(method);
    }

    /// Records a received response, successful or not.
    pub fn record_response(&self, method: &str, status: u16, elapsed: Duration) {
        self.inner.responses.fetch_add(1, Ordering::Relaxed);
        {
            let mut detail = self.inner.detail.lock();
            *detail.responses_by_status.entry(status).or_insert(0) += 1;
            detail.response_times.record(elapsed);
        }
        ApiTelemetry::get().record_response(method, status, elapsed.as_secs_f64());
    }

    /// Records a failed attempt.
    pub fn record_error(&self, classification: &ErrorClassification) {
        self.inner.errors.fetch_add(1, Ordering::Relaxed);
        *self
            .inner
            .detail
            .lock()
            .errors_by_kind
            .entry(classification.kind)
            .or_insert(0) += 1;
        ApiTelemetry::get().record_error(classification.kind.as_ref());
        tracing::debug!(kind = %classification.kind, status = ?classification.http_status, "Recorded error");
    }

    /// Records a cache hit.
    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
        ApiTelemetry::get().record_cache_lookup(true);
    }

    /// Records a cache miss.
    pub fn record_cache_miss(&self) {
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
        ApiTelemetry::get().record_cache_lookup(false);
    }

    /// Records a scheduled retry.
    pub fn record_retry(&self) {
        self.inner.retries.fetch_add(1, Ordering::Relaxed);
        ApiTelemetry::get().record_retry();
    }

    /// Records time spent waiting for rate limiter clearance.
    pub fn record_rate_limit_delay(&self, delay: Duration) {
        self.inner.rate_limit_waits.fetch_add(1, Ordering::Relaxed);
        self.inner
            .rate_limit_delay_micros
            .fetch_add(delay.as_micros() as u64, Ordering::Relaxed);
        ApiTelemetry::get().record_rate_limit_wait(delay.as_secs_f64());
    }

    /// Gets the network attempt count.
    pub fn total_requests(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    /// Gets the failed attempt count.
    pub fn total_errors(&self) -> u64 {
        self.inner.errors.load(Ordering::Relaxed)
    }

    /// Aggregates and health score at this moment.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.inner.requests.load(Ordering::Relaxed);
        let total_errors = self.inner.errors.load(Ordering::Relaxed);
        let cache_hits = self.inner.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.inner.cache_misses.load(Ordering::Relaxed);

        let detail = self.inner.detail.lock();
        let response_time = detail.response_times.stats();

        let error_rate = if total_requests == 0 {
            0.0
        } else {
            (total_errors as f64 / total_requests as f64).min(1.0)
        };
        let cache_lookups = cache_hits + cache_misses;
        let cache_hit_ratio = if cache_lookups == 0 {
            0.0
        } else {
            cache_hits as f64 / cache_lookups as f64
        };
        let score = health_score(error_rate, response_time.avg_ms, cache_hit_ratio, cache_lookups);

        MetricsSnapshot {
            total_requests,
            total_responses: self.inner.responses.load(Ordering::Relaxed),
            total_errors,
            retries: self.inner.retries.load(Ordering::Relaxed),
            requests_by_method: detail.requests_by_method.clone(),
            responses_by_status: detail.responses_by_status.clone(),
            errors_by_kind: detail.errors_by_kind.clone(),
            response_time,
            cache_hits,
            cache_misses,
            cache_hit_ratio,
            rate_limit_waits: self.inner.rate_limit_waits.load(Ordering::Relaxed),
            rate_limit_delay_ms: self.inner.rate_limit_delay_micros.load(Ordering::Relaxed) / 1000,
            error_rate,
            health_score: score,
            health_status: HealthStatus::from_score(score),
            uptime_secs: detail.started_at.elapsed().as_secs(),
        }
    }

    /// Zero every counter. Only for explicit operator action.
    pub fn reset(&self) {
        let mut detail = self.inner.detail.lock();
        for counter in [
            &self.inner.requests,
            &self.inner.responses,
            &self.inner.errors,
            &self.inner.retries,
            &self.inner.cache_hits,
            &self.inner.cache_misses,
            &self.inner.rate_limit_waits,
            &self.inner.rate_limit_delay_micros,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *detail = MetricsDetail::default();
        tracing::info!("Metrics reset");
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Nearest-rank percentile over sorted samples.
fn percentile(sorted: &[Duration], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    millis(sorted[index])
}
