//! Failure classification used to drive retry decisions.

use serde::{Deserialize, Serialize};

/// Broad category of a failed request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The request itself was rejected (4xx).
    Client,
    /// The remote service failed (5xx).
    Server,
    /// Connection-level failure: timeout, reset, DNS.
    Network,
    /// The remote quota is exhausted.
    RateLimit,
    /// Anything not covered above.
    Unknown,
}

/// Classification of a single failure.
///
/// Derived per failure and never persisted.
///
/// # Examples
///
/// ```
/// use octoguard_error::{ErrorCategory, ErrorClassification};
///
/// let c = ErrorClassification::from_status(503, false);
/// assert_eq!(c.kind, ErrorCategory::Server);
/// assert!(c.retryable);
///
/// let c = ErrorClassification::from_status(404, false);
/// assert_eq!(c.kind, ErrorCategory::Client);
/// assert!(!c.retryable);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{} (retryable: {}, status: {:?})", kind, retryable, http_status)]
pub struct ErrorClassification {
    /// Failure category
    pub kind: ErrorCategory,
    /// Whether the retry loop may try again
    pub retryable: bool,
    /// HTTP status, when the failure carried one
    pub http_status: Option<u16>,
}

impl ErrorClassification {
    /// Classify an HTTP error status.
    ///
    /// `quota_exhausted` is true when the response reported zero remaining
    /// calls. A 403 in that state is the remote primary rate limit rather than
    /// a permission failure.
    pub fn from_status(status: u16, quota_exhausted: bool) -> Self {
        let (kind, retryable) = match status {
            429 => (ErrorCategory::RateLimit, true),
            403 if quota_exhausted => (ErrorCategory::RateLimit, true),
            408 => (ErrorCategory::Client, true),
            400..=499 => (ErrorCategory::Client, false),
            500..=599 => (ErrorCategory::Server, true),
            _ => (ErrorCategory::Unknown, false),
        };
        Self {
            kind,
            retryable,
            http_status: Some(status),
        }
    }

    /// Connection-level failure.
    pub fn network() -> Self {
        Self {
            kind: ErrorCategory::Network,
            retryable: true,
            http_status: None,
        }
    }

    /// Unforeseen failure; never retried.
    pub fn unknown() -> Self {
        Self {
            kind: ErrorCategory::Unknown,
            retryable: false,
            http_status: None,
        }
    }

    /// True when the failure means the remote quota is spent.
    pub fn is_rate_limit(&self) -> bool {
        self.kind == ErrorCategory::RateLimit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_not_retryable() {
        for status in [400, 401, 403, 404, 422] {
            let c = ErrorClassification::from_status(status, false);
            assert_eq!(c.kind, ErrorCategory::Client, "status {status}");
            assert!(!c.retryable, "status {status}");
        }
    }

    #[test]
    fn test_timeout_and_too_many_requests_retryable() {
        let timeout = ErrorClassification::from_status(408, false);
        assert_eq!(timeout.kind, ErrorCategory::Client);
        assert!(timeout.retryable);

        let throttled = ErrorClassification::from_status(429, false);
        assert_eq!(throttled.kind, ErrorCategory::RateLimit);
        assert!(throttled.retryable);
    }

    #[test]
    fn test_forbidden_with_exhausted_quota_is_rate_limit() {
        let c = ErrorClassification::from_status(403, true);
        assert!(c.is_rate_limit());
        assert!(c.retryable);
    }

    #[test]
    fn test_server_errors_retryable() {
        for status in [500, 502, 503, 504] {
            let c = ErrorClassification::from_status(status, false);
            assert_eq!(c.kind, ErrorCategory::Server);
            assert!(c.retryable);
        }
    }

    #[test]
    fn test_unexpected_status_unknown() {
        let c = ErrorClassification::from_status(302, false);
        assert_eq!(c.kind, ErrorCategory::Unknown);
        assert!(!c.retryable);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(ErrorCategory::RateLimit.as_ref(), "rate_limit");
        assert_eq!(ErrorCategory::Network.to_string(), "network");
    }
}
