//! Retry eligibility trait.

/// Trait for errors that support retry logic.
///
/// Only eligibility lives here. How long to wait between attempts is the
/// client's backoff configuration, or the server's `retry-after`.
///
/// # Examples
///
/// ```
/// use octoguard_error::{ClientError, ClientErrorKind, ErrorClassification, RetryableError};
///
/// let err = ClientError::new(ClientErrorKind::Transient {
///     classification: ErrorClassification::from_status(502, false),
///     message: "bad gateway".to_string(),
/// });
/// assert!(err.is_retryable());
///
/// let err = ClientError::new(ClientErrorKind::RequestFailed {
///     classification: ErrorClassification::from_status(404, false),
///     message: "not found".to_string(),
/// });
/// assert!(!err.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors like 503 (service unavailable), 429 (rate limit),
    /// or network timeouts should return true. Permanent errors like 401
    /// (unauthorized) or 400 (bad request) should return false.
    fn is_retryable(&self) -> bool;
}
