//! Extraction of quota information from response headers.
//!
//! GitHub-style services report quota state on every response:
//! - `x-ratelimit-limit`: calls allowed in the current window
//! - `x-ratelimit-remaining`: calls remaining
//! - `x-ratelimit-reset`: Unix timestamp when the window resets
//! - `x-ratelimit-used`: calls used so far
//! - `x-ratelimit-resource`: which quota bucket the numbers apply to
//!
//! Throttled responses may also carry `retry-after`, either in seconds or as
//! an HTTP date.

use crate::RateLimitUpdate;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;
use tracing::debug;

/// Parse a quota report from response headers.
///
/// Returns `None` when the response carries no `x-ratelimit-remaining`
/// header; every other field is optional.
///
/// # Example
///
/// ```
/// use octoguard_rate_limit::parse_rate_limit_headers;
/// use reqwest::header::{HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4999"));
/// headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
///
/// let update = parse_rate_limit_headers(&headers).unwrap();
/// assert_eq!(*update.remaining(), 4999);
/// assert_eq!(update.reset_at().unwrap().timestamp(), 1_700_000_000);
/// ```
pub fn parse_rate_limit_headers(headers: &HeaderMap) -> Option<RateLimitUpdate> {
    let remaining = parse_header_u32(headers, "x-ratelimit-remaining")?;
    let reset_at = parse_header_i64(headers, "x-ratelimit-reset")
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    let mut update = RateLimitUpdate::new(remaining, reset_at);
    if let Some(limit) = parse_header_u32(headers, "x-ratelimit-limit") {
        update = update.with_limit(limit);
    }
    if let Some(used) = parse_header_u32(headers, "x-ratelimit-used") {
        update = update.with_used(used);
    }
    if let Some(resource) = headers
        .get("x-ratelimit-resource")
        .and_then(|v| v.to_str().ok())
    {
        update = update.with_resource(resource.to_string());
    }

    debug!(remaining, reset_at = ?reset_at, "Parsed rate limit headers");
    Some(update)
}

/// Parse a `retry-after` header.
///
/// Accepts delay seconds (`120`) or an HTTP date
/// (`Wed, 21 Oct 2015 07:28:00 GMT`). A date in the past yields zero.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    retry_after_from(value, Utc::now())
}

fn retry_after_from(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Helper to parse u32 from header value.
fn parse_header_u32(headers: &HeaderMap, key: &str) -> Option<u32> {
    headers.get(key)?.to_str().ok()?.trim().parse().ok()
}

/// Helper to parse i64 from header value.
fn parse_header_i64(headers: &HeaderMap, key: &str) -> Option<i64> {
    headers.get(key)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_missing_remaining_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        assert!(parse_rate_limit_headers(&headers).is_none());
    }

    #[test]
    fn test_full_report() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4990"));
        headers.insert("x-ratelimit-used", HeaderValue::from_static("10"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        headers.insert("x-ratelimit-resource", HeaderValue::from_static("core"));

        let update = parse_rate_limit_headers(&headers).unwrap();
        assert_eq!(*update.limit(), Some(5000));
        assert_eq!(*update.used(), Some(10));
        assert_eq!(update.resource().as_deref(), Some("core"));
    }

    #[test]
    fn test_garbage_values_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("12"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("soon"));
        let update = parse_rate_limit_headers(&headers).unwrap();
        assert_eq!(*update.remaining(), 12);
        assert!(update.reset_at().is_none());
    }

    #[test]
    fn test_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_retry_after_http_date() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:27:30 GMT")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            retry_after_from("Wed, 21 Oct 2015 07:28:00 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            retry_after_from("Wed, 21 Oct 2015 07:27:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(retry_after_from("whenever", now), None);
    }

    #[test]
    fn test_retry_after_header_date() {
        let at = Utc::now() + chrono::TimeDelta::seconds(90);
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(&at.to_rfc2822()).unwrap());
        let delay = parse_retry_after(&headers).unwrap();
        assert!(delay > Duration::from_secs(85) && delay <= Duration::from_secs(90));
    }
}
