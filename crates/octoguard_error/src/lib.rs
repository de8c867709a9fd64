//! Error types for the octoguard API client.
//!
//! This crate provides the error types shared by every octoguard crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Failures coming back from the remote service are additionally tagged with an
//! [`ErrorClassification`], which drives retry decisions and metrics labels.
//!
//! # Examples
//!
//! ```
//! use octoguard_error::{ClientError, ClientErrorKind, ClientResult};
//!
//! fn build() -> ClientResult<()> {
//!     Err(ClientError::new(ClientErrorKind::InvalidCredential(
//!         "token has an unknown prefix".to_string(),
//!     )))
//! }
//!
//! assert!(build().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod classification;
mod client;
mod config;
mod retryable;
mod transport;

pub use cache::CacheError;
pub use classification::{ErrorCategory, ErrorClassification};
pub use client::{ClientError, ClientErrorKind, ClientResult};
pub use config::ConfigError;
pub use retryable::RetryableError;
pub use transport::{TransportError, TransportErrorKind};
