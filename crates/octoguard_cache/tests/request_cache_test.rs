//! Tests for response caching.

use octoguard_cache::{RequestCache, RequestCacheConfigBuilder, cache_key};
use serde_json::json;
use std::thread::sleep;
use std::time::Duration;

fn cache_with_size(max_size: usize) -> RequestCache {
    let config = RequestCacheConfigBuilder::default()
        .max_size(max_size)
        .build()
        .unwrap();
    RequestCache::new(config)
}

#[test]
fn test_set_then_get_returns_equal_copy() {
    let cache = RequestCache::default();
    let mut value = json!({"id": 1, "labels": ["bug"]});

    cache.set("GET /repos/x/y", &value);
    let mut fetched = cache.get("GET /repos/x/y").unwrap();
    assert_eq!(fetched, value);

    // mutating either side leaves the cached copy intact
    value["id"] = json!(2);
    fetched["labels"] = json!([]);
    assert_eq!(
        cache.get("GET /repos/x/y").unwrap(),
        json!({"id": 1, "labels": ["bug"]})
    );
}

#[test]
fn test_cache_miss() {
    let cache = RequestCache::default();
    assert!(cache.get("GET /nothing").is_none());
    assert_eq!(*cache.stats().misses(), 1);
}

#[test]
fn test_cache_expiration() {
    let cache = RequestCache::default();
    cache.set_with_ttl("k", &json!({"members": 100}), Duration::from_millis(100));

    assert!(cache.get("k").is_some());

    sleep(Duration::from_millis(200));

    assert!(cache.get("k").is_none());
    assert!(cache.is_empty());
    assert_eq!(*cache.stats().expirations(), 1);
}

#[test]
fn test_lru_evicts_least_recently_accessed() {
    let cache = cache_with_size(3);
    cache.set("a", &json!(1));
    cache.set("b", &json!(2));
    cache.set("c", &json!(3));

    // touch "a" so "b" becomes the oldest
    assert!(cache.get("a").is_some());

    cache.set("d", &json!(4));

    assert_eq!(cache.len(), 3);
    assert!(cache.get("b").is_none());
    assert!(cache.get("a").is_some());
    assert!(cache.get("c").is_some());
    assert!(cache.get("d").is_some());
    assert_eq!(*cache.stats().evictions(), 1);
}

#[test]
fn test_most_recent_entry_survives_pressure() {
    let cache = cache_with_size(2);
    for i in 0..10 {
        let key = format!("k{}", i);
        cache.set(&key, &json!(i));
        assert!(cache.get(&key).is_some(), "just-inserted {} was evicted", key);
    }
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_memory_bound_evicts_lru() {
    let probe = RequestCache::default();
    probe.set("a", &json!("0123456789"));
    let one_entry = *probe.stats().memory_estimate();

    let config = RequestCacheConfigBuilder::default()
        .max_memory_bytes(Some(one_entry * 2))
        .build()
        .unwrap();
    let cache = RequestCache::new(config);
    cache.set("a", &json!("0123456789"));
    cache.set("b", &json!("0123456789"));
    cache.set("c", &json!("0123456789"));

    assert_eq!(cache.len(), 2);
    assert!(cache.get("a").is_none());
    assert!(*cache.stats().memory_estimate() <= one_entry * 2);
}

#[test]
fn test_find_does_not_change_recency() {
    let cache = cache_with_size(2);
    cache.set("GET /repos/x/a", &json!("a"));
    cache.set("GET /repos/x/b", &json!("b"));

    let found = cache.find("^GET /repos/x/a").unwrap();
    assert_eq!(found, vec![("GET /repos/x/a".to_string(), json!("a"))]);

    // "a" is still the LRU entry despite the lookup
    cache.set("GET /repos/x/c", &json!("c"));
    assert!(cache.get("GET /repos/x/a").is_none());
    assert!(cache.get("GET /repos/x/b").is_some());
}

#[test]
fn test_find_leaves_hit_counters_alone() {
    let cache = RequestCache::default();
    cache.set("k", &json!(1));
    cache.find(".*").unwrap();
    assert_eq!(*cache.stats().hits(), 0);
    assert_eq!(*cache.stats().misses(), 0);
}

#[test]
fn test_invalidate_by_pattern() {
    let cache = RequestCache::default();
    cache.set(&cache_key("GET", "/repos/x/y/issues", None), &json!([]));
    cache.set(&cache_key("GET", "/repos/x/y/pulls", None), &json!([]));
    cache.set(&cache_key("GET", "/users/octocat", None), &json!({}));

    let removed = cache.invalidate("^GET /repos/x/y/").unwrap();
    assert_eq!(removed, 2);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_stats_hit_ratio() {
    let cache = RequestCache::default();
    cache.set("k", &json!(1));
    cache.get("k");
    cache.get("k");
    cache.get("k");
    cache.get("missing");

    let stats = cache.stats();
    assert_eq!(*stats.hits(), 3);
    assert_eq!(*stats.misses(), 1);
    assert_eq!(*stats.size(), 1);
    assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
}

#[test]
fn test_clear_keeps_counters_reset_zeroes_them() {
    let cache = RequestCache::default();
    cache.set("k", &json!(1));
    cache.get("k");

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(*cache.stats().hits(), 1);

    cache.reset();
    assert_eq!(*cache.stats().hits(), 0);
}

#[test]
fn test_cleanup_expired() {
    let cache = RequestCache::default();
    cache.set_with_ttl("short", &json!(1), Duration::from_millis(50));
    cache.set("long", &json!(2));

    sleep(Duration::from_millis(100));

    assert_eq!(cache.cleanup_expired(), 1);
    assert_eq!(cache.len(), 1);
}
