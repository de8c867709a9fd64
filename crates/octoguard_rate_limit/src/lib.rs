//! Rate limiting for calls against a quota-limited REST service.
//!
//! Two budgets are tracked side by side:
//! - a local token bucket (governor GCRA) that defends against bursts before
//!   the remote service has reported anything
//! - the remote-reported budget parsed from `x-ratelimit-*` response headers,
//!   authoritative once observed
//!
//! A caller may proceed only when both budgets allow it. Concurrent waiters are
//! released in arrival order.
//!
//! ```rust,ignore
//! use octoguard_rate_limit::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::default())?;
//! limiter.wait_for_token().await;
//! // issue the request, then feed the response headers back
//! limiter.update_from_headers(response.headers());
//! ```

mod config;
mod detector;
mod error;
mod limiter;
mod state;

pub use config::{RateLimitConfig, RateLimitConfigBuilder};
pub use detector::{parse_rate_limit_headers, parse_retry_after};
pub use error::{RateLimitError, RateLimitErrorKind};
pub use limiter::RateLimiter;
pub use state::{RateLimitState, RateLimitStatus, RateLimitUpdate};
