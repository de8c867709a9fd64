//! Top-level client error types.

use crate::{CacheError, ConfigError, ErrorClassification, RetryableError, TransportError};

/// Terminal error conditions surfaced to callers of the API client.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ClientErrorKind {
    /// Credential failed format validation (construction time)
    #[display("Invalid credential: {}", _0)]
    InvalidCredential(String),
    /// Configuration rejected (construction time)
    #[display("Invalid configuration: {}", _0)]
    InvalidConfig(String),
    /// Request is malformed and was never sent
    #[display("Invalid request: {}", _0)]
    Validation(String),
    /// A retryable failure
    #[display("Transient failure ({}): {}", classification, message)]
    Transient {
        /// How the failure was classified
        classification: ErrorClassification,
        /// Response body or transport message
        message: String,
    },
    /// A non-retryable failure from the remote service or transport
    #[display("Request failed ({}): {}", classification, message)]
    RequestFailed {
        /// How the failure was classified
        classification: ErrorClassification,
        /// Response body or transport message
        message: String,
    },
    /// Retry budget spent on transient failures
    #[display("Retries exhausted after {} attempts, last failure {}: {}", attempts, last, message)]
    ExhaustedRetries {
        /// Attempts made
        attempts: u32,
        /// Classification of the last failure
        last: ErrorClassification,
        /// Message of the last failure
        message: String,
    },
    /// Caller cancelled the request
    #[display("Request cancelled")]
    Cancelled,
    /// The client has been shut down
    #[display("Client has been shut down")]
    Shutdown,
    /// Successful response body was not valid JSON
    #[display("Failed to decode response body: {}", _0)]
    Decode(String),
    /// Cache query failed
    #[display("{}", _0)]
    Cache(String),
}

impl ClientErrorKind {
    /// Classification carried by this error, if it came from a request failure.
    pub fn classification(&self) -> Option<ErrorClassification> {
        match self {
            ClientErrorKind::Transient { classification, .. }
            | ClientErrorKind::RequestFailed { classification, .. } => Some(*classification),
            ClientErrorKind::ExhaustedRetries { last, .. } => Some(*last),
            _ => None,
        }
    }
}

/// API client error with source location tracking.
///
/// # Examples
///
/// ```
/// use octoguard_error::{ClientError, ClientErrorKind};
///
/// let err = ClientError::new(ClientErrorKind::Cancelled);
/// assert!(format!("{}", err).contains("cancelled"));
/// assert!(err.is_cancelled());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Client Error: {} at line {} in {}", kind, line, file)]
pub struct ClientError {
    kind: ClientErrorKind,
    line: u32,
    file: &'static str,
}

impl ClientError {
    /// Create a new client error with caller location tracking.
    #[track_caller]
    pub fn new(kind: ClientErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ClientErrorKind {
        &self.kind
    }

    /// Classification carried by this error, if any.
    pub fn classification(&self) -> Option<ErrorClassification> {
        self.kind.classification()
    }

    /// True when the caller's cancellation signal ended the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ClientErrorKind::Cancelled)
    }

    /// Build a failure from a transport error, keeping its classification.
    #[track_caller]
    pub fn from_transport(err: &TransportError) -> Self {
        let classification = err.classification();
        let message = err.kind().to_string();
        if classification.retryable {
            Self::new(ClientErrorKind::Transient {
                classification,
                message,
            })
        } else {
            Self::new(ClientErrorKind::RequestFailed {
                classification,
                message,
            })
        }
    }
}

impl RetryableError for ClientError {
    fn is_retryable(&self) -> bool {
        matches!(self.kind, ClientErrorKind::Transient { .. })
    }
}

impl From<ConfigError> for ClientError {
    #[track_caller]
    fn from(err: ConfigError) -> Self {
        Self::new(ClientErrorKind::InvalidConfig(err.message))
    }
}

impl From<CacheError> for ClientError {
    #[track_caller]
    fn from(err: CacheError) -> Self {
        Self::new(ClientErrorKind::Cache(err.message))
    }
}

/// Result type for octoguard client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorCategory, TransportErrorKind};

    #[test]
    fn test_location_tracking() {
        let err = ClientError::new(ClientErrorKind::Shutdown);
        assert!(err.to_string().contains("client.rs"));
    }

    #[test]
    fn test_transport_conversion_keeps_classification() {
        let transport = TransportError::new(TransportErrorKind::Reset("peer closed".into()));
        let err = ClientError::from_transport(&transport);
        assert!(err.is_retryable());
        assert_eq!(err.classification().map(|c| c.kind), Some(ErrorCategory::Network));

        let transport = TransportError::new(TransportErrorKind::Other("bad url".into()));
        let err = ClientError::from_transport(&transport);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_exhausted_retries_not_retryable() {
        let err = ClientError::new(ClientErrorKind::ExhaustedRetries {
            attempts: 3,
            last: ErrorClassification::from_status(502, false),
            message: "bad gateway".into(),
        });
        assert!(!err.is_retryable());
        assert_eq!(err.classification().and_then(|c| c.http_status), Some(502));
    }
}
