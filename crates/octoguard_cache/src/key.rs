//! Cache key derivation.

use serde_json::Value as JsonValue;

/// Derive the cache key for a request.
///
/// The key is the method, the path and the serialized payload. JSON objects
/// serialize with sorted keys, so payloads that differ only in field order
/// share a key.
///
/// # Example
///
/// ```
/// use octoguard_cache::cache_key;
/// use serde_json::json;
///
/// let key = cache_key("GET", "/repos/x/y", None);
/// assert_eq!(key, "GET /repos/x/y");
///
/// let key = cache_key("GET", "/search/issues", Some(&json!({"q": "bug", "page": 2})));
/// assert_eq!(key, r#"GET /search/issues {"page":2,"q":"bug"}"#);
/// ```
pub fn cache_key(method: &str, path: &str, payload: Option<&JsonValue>) -> String {
    match payload {
        None | Some(JsonValue::Null) => format!("{} {}", method, path),
        Some(payload) => format!("{} {} {}", method, path, payload),
    }
}
