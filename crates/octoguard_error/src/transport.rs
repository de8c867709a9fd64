//! Transport-level error types.

use crate::ErrorClassification;

/// Connection-level failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum TransportErrorKind {
    /// Request did not complete within the configured timeout
    #[display("Request timed out: {}", _0)]
    Timeout(String),
    /// Could not establish a connection (refused, DNS failure)
    #[display("Connection failed: {}", _0)]
    Connect(String),
    /// Connection dropped while the request was in flight
    #[display("Connection reset: {}", _0)]
    Reset(String),
    /// Response body could not be read
    #[display("Failed to read response body: {}", _0)]
    Body(String),
    /// Request could not be built or sent for another reason
    #[display("Transport failure: {}", _0)]
    Other(String),
}

/// Transport error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Transport Error: {} at line {} in {}", kind, line, file)]
pub struct TransportError {
    kind: TransportErrorKind,
    line: u32,
    file: &'static str,
}

impl TransportError {
    /// Create a new transport error with caller location tracking.
    #[track_caller]
    pub fn new(kind: TransportErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TransportErrorKind {
        &self.kind
    }

    /// Classify this failure for the retry loop.
    pub fn classification(&self) -> ErrorClassification {
        match self.kind {
            TransportErrorKind::Timeout(_)
            | TransportErrorKind::Connect(_)
            | TransportErrorKind::Reset(_)
            | TransportErrorKind::Body(_) => ErrorClassification::network(),
            TransportErrorKind::Other(_) => ErrorClassification::unknown(),
        }
    }
}
