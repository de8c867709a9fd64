use octoguard_error::{ErrorCategory, ErrorClassification};
use octoguard_metrics::{HealthStatus, MetricsCollector};
use std::time::Duration;

#[test]
fn test_fresh_collector_is_healthy() {
    let metrics = MetricsCollector::new();
    let snapshot = metrics.snapshot();

    assert_eq!(*snapshot.total_requests(), 0);
    assert_eq!(*snapshot.error_rate(), 0.0);
    assert_eq!(*snapshot.health_score(), 100.0);
    assert_eq!(*snapshot.health_status(), HealthStatus::Healthy);
}

#[test]
fn test_counts_by_method_status_and_kind() {
    let metrics = MetricsCollector::new();

    metrics.record_request("GET");
    metrics.record_request("GET");
    metrics.record_request("POST");
    metrics.record_response("GET", 200, Duration::from_millis(50));
    metrics.record_response("GET", 503, Duration::from_millis(80));
    metrics.record_response("POST", 422, Duration::from_millis(30));
    metrics.record_error(&ErrorClassification::from_status(503, false));
    metrics.record_error(&ErrorClassification::from_status(422, false));
    metrics.record_error(&ErrorClassification::network());

    let snapshot = metrics.snapshot();
    assert_eq!(*snapshot.total_requests(), 3);
    assert_eq!(*snapshot.total_responses(), 3);
    assert_eq!(*snapshot.total_errors(), 3);
    assert_eq!(snapshot.requests_by_method()["GET"], 2);
    assert_eq!(snapshot.requests_by_method()["POST"], 1);
    assert_eq!(snapshot.responses_by_status()[&503], 1);
    assert_eq!(snapshot.errors_of(ErrorCategory::Server), 1);
    assert_eq!(snapshot.errors_of(ErrorCategory::Client), 1);
    assert_eq!(snapshot.errors_of(ErrorCategory::Network), 1);
    assert_eq!(snapshot.errors_of(ErrorCategory::RateLimit), 0);
    assert_eq!(*snapshot.error_rate(), 1.0);
    assert_eq!(*snapshot.health_status(), HealthStatus::Unhealthy);
}

#[test]
fn test_health_degrades_with_errors() {
    let metrics = MetricsCollector::new();
    for _ in 0..10 {
        metrics.record_request("GET");
        metrics.record_response("GET", 200, Duration::from_millis(10));
    }
    let healthy = *metrics.snapshot().health_score();

    for _ in 0..5 {
        metrics.record_error(&ErrorClassification::from_status(500, false));
    }
    let degraded = *metrics.snapshot().health_score();

    assert!(degraded < healthy);
}

#[test]
fn test_cache_hit_ratio() {
    let metrics = MetricsCollector::new();
    metrics.record_cache_hit();
    metrics.record_cache_hit();
    metrics.record_cache_hit();
    metrics.record_cache_miss();

    let snapshot = metrics.snapshot();
    assert_eq!(*snapshot.cache_hits(), 3);
    assert_eq!(*snapshot.cache_misses(), 1);
    assert!((snapshot.cache_hit_ratio() - 0.75).abs() < f64::EPSILON);
}

#[test]
fn test_rate_limit_delay_and_retries() {
    let metrics = MetricsCollector::new();
    metrics.record_rate_limit_delay(Duration::from_millis(1500));
    metrics.record_rate_limit_delay(Duration::from_millis(500));
    metrics.record_retry();

    let snapshot = metrics.snapshot();
    assert_eq!(*snapshot.rate_limit_waits(), 2);
    assert_eq!(*snapshot.rate_limit_delay_ms(), 2000);
    assert_eq!(*snapshot.retries(), 1);
}

#[test]
fn test_reset_zeroes_everything() {
    let metrics = MetricsCollector::new();
    metrics.record_request("GET");
    metrics.record_response("GET", 200, Duration::from_millis(10));
    metrics.record_cache_miss();
    metrics.reset();

    let snapshot = metrics.snapshot();
    assert_eq!(*snapshot.total_requests(), 0);
    assert_eq!(*snapshot.cache_misses(), 0);
    assert!(snapshot.responses_by_status().is_empty());
    assert_eq!(*snapshot.response_time().count(), 0);
}

#[test]
fn test_snapshot_serializes() {
    let metrics = MetricsCollector::new();
    metrics.record_request("GET");
    metrics.record_error(&ErrorClassification::from_status(429, false));

    let json = serde_json::to_value(metrics.snapshot()).unwrap();
    assert_eq!(json["total_requests"], 1);
    assert_eq!(json["errors_by_kind"]["rate_limit"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_recording() {
    let metrics = MetricsCollector::new();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let metrics = metrics.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..250 {
                metrics.record_request("GET");
                metrics.record_response("GET", 200, Duration::from_millis(5));
                metrics.record_cache_hit();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let snapshot = metrics.snapshot();
    assert_eq!(*snapshot.total_requests(), 2000);
    assert_eq!(*snapshot.total_responses(), 2000);
    assert_eq!(*snapshot.cache_hits(), 2000);
    assert_eq!(*snapshot.response_time().count(), 2000);
}
