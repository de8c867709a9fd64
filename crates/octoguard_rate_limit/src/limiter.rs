//! Rate limiter combining a governor token bucket with remote quota tracking.
//!
//! The local bucket uses governor's GCRA implementation. The remote budget is a
//! plain [`RateLimitState`] updated from response headers. Waiters queue on a
//! Tokio mutex, which hands out the lock in FIFO order, so the waiter at the
//! head of the queue is the only one consuming budget at any moment.

use crate::{
    RateLimitConfig, RateLimitError, RateLimitErrorKind, RateLimitState, RateLimitStatus,
    RateLimitUpdate, parse_rate_limit_headers,
};
use chrono::Utc;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use parking_lot::{Mutex, RwLock};
use reqwest::header::HeaderMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

// Type alias for our direct rate limiter
type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter gating calls on both the local and the remote budget.
///
/// One limiter belongs to one client. Clients that share a credential can
/// share a quota by handing the same `Arc<RateLimiter>` to each.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = RateLimiter::new(RateLimitConfig::default())?;
///
/// let waited = limiter.wait_for_token().await;
/// let response = http.get(url).send().await?;
/// limiter.update_from_headers(response.headers());
/// ```
pub struct RateLimiter {
    config: RateLimitConfig,
    local: RwLock<Arc<DirectRateLimiter>>,
    state: Mutex<RateLimitState>,
    queue: tokio::sync::Mutex<()>,
    grants: AtomicU64,
    waited_micros: AtomicU64,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration.
    ///
    /// The local bucket admits `window_capacity + burst_allowance` calls
    /// immediately and refills one call every `window / window_capacity`.
    #[instrument(skip(config), fields(capacity = config.window_capacity(), window_secs = config.window_secs()))]
    pub fn new(config: RateLimitConfig) -> Result<Self, RateLimitError> {
        config.validate()?;
        let local = build_local(&config)?;
        debug!("Creating rate limiter");
        Ok(Self {
            state: Mutex::new(RateLimitState::new(&config)),
            local: RwLock::new(Arc::new(local)),
            config,
            queue: tokio::sync::Mutex::new(()),
            grants: AtomicU64::new(0),
            waited_micros: AtomicU64::new(0),
        })
    }

    /// Get the limiter configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until both budgets allow one call, then consume it.
    ///
    /// Suspends without spinning. Concurrent callers are served in the order
    /// they started waiting. Dropping the returned future before it resolves
    /// leaves both budgets untouched.
    ///
    /// Returns how long the caller waited.
    #[instrument(skip(self))]
    pub async fn wait_for_token(&self) -> Duration {
        let started = Instant::now();
        let _turn = self.queue.lock().await;

        loop {
            let pending = self.state.lock().wait_needed(Utc::now());
            let Some(wait) = pending else { break };

            let max_wait = self.config.max_reset_wait();
            if wait > max_wait {
                warn!(
                    wait_secs = wait.as_secs(),
                    max_wait_secs = max_wait.as_secs(),
                    "Remote reset beyond maximum wait, proceeding after capped wait"
                );
                tokio::time::sleep(max_wait).await;
                break;
            }

            debug!(wait_ms = wait.as_millis() as u64, "Remote quota exhausted, waiting for reset");
            tokio::time::sleep(wait).await;
        }

        let local = self.local.read().clone();
        local.until_ready().await;
        self.state.lock().consume();

        let waited = started.elapsed();
        self.grants.fetch_add(1, Ordering::Relaxed);
        self.waited_micros
            .fetch_add(waited.as_micros() as u64, Ordering::Relaxed);
        debug!(waited_ms = waited.as_millis() as u64, "Token granted");
        waited
    }

    /// Like [`wait_for_token`](Self::wait_for_token), aborting when `cancel` fires.
    ///
    /// A cancelled waiter gives up its queue position and consumes nothing.
    pub async fn wait_for_token_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Duration, RateLimitError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Token wait cancelled");
                Err(RateLimitError::new(RateLimitErrorKind::Cancelled))
            }
            waited = self.wait_for_token() => Ok(waited),
        }
    }

    /// Try to take a token without waiting.
    ///
    /// Returns false if another caller is queued or either budget is empty.
    pub fn try_acquire(&self) -> bool {
        let Ok(_turn) = self.queue.try_lock() else {
            return false;
        };
        if self.state.lock().wait_needed(Utc::now()).is_some() {
            return false;
        }
        let local = self.local.read().clone();
        if local.check().is_err() {
            return false;
        }
        self.state.lock().consume();
        self.grants.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Apply a remote quota report.
    ///
    /// Idempotent, and monotonic in `reset_at`: a report older than the stored
    /// reset time changes nothing.
    #[instrument(skip(self, update), fields(remaining = update.remaining(), reset_at = ?update.reset_at()))]
    pub fn update_limits(&self, update: &RateLimitUpdate) {
        let changed = self.state.lock().apply(update);
        debug!(changed, "Applied rate limit report");
    }

    /// Parse quota headers from a response and apply them.
    ///
    /// Returns the parsed report, if the response carried one.
    pub fn update_from_headers(&self, headers: &HeaderMap) -> Option<RateLimitUpdate> {
        let update = parse_rate_limit_headers(headers)?;
        self.update_limits(&update);
        Some(update)
    }

    /// Current state of the limiter.
    pub fn status(&self) -> RateLimitStatus {
        let mut state = self.state.lock();
        state.refresh(Utc::now());
        RateLimitStatus {
            remaining: *state.remaining(),
            reset_at: *state.reset_at(),
            window_capacity: *state.window_capacity(),
            burst_allowance: *state.burst_allowance(),
            observed: *state.observed(),
            resource: state.resource().clone(),
            grants: self.grants.load(Ordering::Relaxed),
            total_wait: Duration::from_micros(self.waited_micros.load(Ordering::Relaxed)),
        }
    }

    /// Restore the full local budget and forget remote reports.
    #[instrument(skip(self))]
    pub fn reset(&self) {
        match build_local(&self.config) {
            Ok(local) => *self.local.write() = Arc::new(local),
            Err(e) => warn!(error = %e, "Could not rebuild local bucket, keeping current one"),
        }
        self.state.lock().reset(&self.config);
        self.grants.store(0, Ordering::Relaxed);
        self.waited_micros.store(0, Ordering::Relaxed);
        debug!("Rate limiter reset");
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .field("grants", &self.grants.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn build_local(config: &RateLimitConfig) -> Result<DirectRateLimiter, RateLimitError> {
    let invalid = |msg: &str| RateLimitError::new(RateLimitErrorKind::InvalidConfig(msg.to_string()));

    let capacity = NonZeroU32::new(*config.window_capacity())
        .ok_or_else(|| invalid("window_capacity must be greater than zero"))?;
    let burst = NonZeroU32::new(capacity.get().saturating_add(*config.burst_allowance()))
        .ok_or_else(|| invalid("burst size overflow"))?;
    let period = config.window() / capacity.get();
    let quota = Quota::with_period(period)
        .ok_or_else(|| invalid("window too short for the configured capacity"))?
        .allow_burst(burst);

    Ok(GovernorRateLimiter::direct(quota))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn limiter(capacity: u32, window_secs: u64, burst: u32) -> RateLimiter {
        let config = crate::RateLimitConfigBuilder::default()
            .window_capacity(capacity)
            .window_secs(window_secs)
            .burst_allowance(burst)
            .build()
            .unwrap();
        RateLimiter::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_grants_within_capacity() {
        let limiter = limiter(3, 60, 0);
        for _ in 0..3 {
            let waited = limiter.wait_for_token().await;
            assert!(waited < Duration::from_millis(50));
        }
        assert_eq!(*limiter.status().grants(), 3);
    }

    #[tokio::test]
    async fn test_try_acquire_respects_local_budget() {
        let limiter = limiter(2, 60, 0);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_burst_allowance_extends_bucket() {
        let limiter = limiter(2, 60, 1);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_remote_exhaustion_blocks_try_acquire() {
        let limiter = limiter(100, 60, 0);
        limiter.update_limits(&RateLimitUpdate::new(0, Some(Utc::now() + TimeDelta::seconds(60))));
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_remote_exhaustion_with_past_reset_does_not_block() {
        let limiter = limiter(100, 60, 0);
        limiter.update_limits(&RateLimitUpdate::new(0, Some(Utc::now() - TimeDelta::seconds(1))));
        let waited = limiter.wait_for_token().await;
        assert!(waited < Duration::from_millis(50));
        assert_eq!(*limiter.status().remaining(), 99);
    }

    #[tokio::test]
    async fn test_cancelled_wait_consumes_nothing() {
        let limiter = limiter(100, 60, 0);
        limiter.update_limits(&RateLimitUpdate::new(0, Some(Utc::now() + TimeDelta::seconds(60))));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = limiter.wait_for_token_cancellable(&cancel).await;
        assert!(matches!(result.unwrap_err().kind(), RateLimitErrorKind::Cancelled));
        assert_eq!(*limiter.status().grants(), 0);
        assert_eq!(*limiter.status().remaining(), 0);
    }

    #[tokio::test]
    async fn test_reset_restores_budget() {
        let limiter = limiter(1, 60, 0);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        limiter.reset();
        assert!(limiter.try_acquire());
        assert!(!limiter.status().observed());
    }
}
