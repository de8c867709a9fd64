//! Remote quota state.

use crate::RateLimitConfig;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Quota report extracted from a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_", strip_option)]
pub struct RateLimitUpdate {
    /// Calls remaining in the current window
    remaining: u32,
    /// When the remote window resets
    reset_at: Option<DateTime<Utc>>,
    /// Window size reported by the remote service
    limit: Option<u32>,
    /// Calls already used in the current window
    used: Option<u32>,
    /// Quota bucket the report applies to (e.g. `core`, `search`)
    resource: Option<String>,
}

impl RateLimitUpdate {
    /// Create an update with the two fields every quota report carries.
    pub fn new(remaining: u32, reset_at: Option<DateTime<Utc>>) -> Self {
        Self {
            remaining,
            reset_at,
            limit: None,
            used: None,
            resource: None,
        }
    }
}

/// Remote-reported budget plus the configured window shape.
///
/// `remaining` never goes below zero. Once `reset_at` has passed, an
/// exhausted budget counts as replenished to `window_capacity`.
///
/// One state tracks one quota bucket. The first report naming a resource
/// (`core`, `search`, ...) pins it; reports for other resources are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct RateLimitState {
    remaining: u32,
    reset_at: Option<DateTime<Utc>>,
    window_capacity: u32,
    burst_allowance: u32,
    /// Whether any remote report has been applied yet
    observed: bool,
    /// Quota bucket the state follows, once reported
    resource: Option<String>,
}

impl RateLimitState {
    /// Fresh state: full budget, nothing observed.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            remaining: *config.window_capacity(),
            reset_at: None,
            window_capacity: *config.window_capacity(),
            burst_allowance: *config.burst_allowance(),
            observed: false,
            resource: None,
        }
    }

    /// Replenish the budget if the reset time has passed.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        if let Some(reset_at) = self.reset_at {
            if now >= reset_at && self.remaining < self.window_capacity {
                debug!(%reset_at, capacity = self.window_capacity, "Remote window reset, replenishing budget");
                self.remaining = self.window_capacity;
            }
        }
    }

    /// How long a caller must wait for the remote budget, if at all.
    pub fn wait_needed(&mut self, now: DateTime<Utc>) -> Option<Duration> {
        self.refresh(now);
        if !self.observed || self.remaining > 0 {
            return None;
        }
        let reset_at = self.reset_at?;
        (reset_at - now).to_std().ok().filter(|d| !d.is_zero())
    }

    /// Account for one call granted locally.
    pub fn consume(&mut self) {
        if self.observed {
            self.remaining = self.remaining.saturating_sub(1);
        }
    }

    /// Apply a remote quota report.
    ///
    /// Reports older than the stored reset time, or for a different resource
    /// than the one being tracked, are ignored. Reports for the same window
    /// can only lower `remaining`, so applying one twice is a no-op. Returns
    /// whether the state changed.
    pub fn apply(&mut self, update: &RateLimitUpdate) -> bool {
        if let (Some(tracked), Some(incoming)) = (&self.resource, &update.resource) {
            if tracked != incoming {
                debug!(%tracked, %incoming, "Ignoring report for another quota resource");
                return false;
            }
        }
        let before = self.clone();
        match (self.reset_at, update.reset_at) {
            (Some(stored), Some(incoming)) if incoming < stored => {
                debug!(%stored, %incoming, "Ignoring stale rate limit report");
                return false;
            }
            (Some(stored), Some(incoming)) if incoming == stored && self.observed => {
                self.remaining = self.remaining.min(update.remaining);
            }
            (_, Some(incoming)) => {
                self.remaining = update.remaining;
                self.reset_at = Some(incoming);
            }
            (_, None) => {
                self.remaining = update.remaining;
            }
        }
        if let Some(limit) = update.limit {
            if limit > 0 {
                self.window_capacity = limit;
            }
        }
        if self.resource.is_none() {
            self.resource = update.resource.clone();
        }
        self.observed = true;
        *self != before
    }

    /// Forget everything observed from the remote service.
    pub fn reset(&mut self, config: &RateLimitConfig) {
        *self = Self::new(config);
    }
}

/// Point-in-time view of the limiter for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct RateLimitStatus {
    /// Remote calls remaining (configured capacity until a report arrives)
    pub(crate) remaining: u32,
    /// When the remote window resets, if reported
    pub(crate) reset_at: Option<DateTime<Utc>>,
    /// Window capacity in effect
    pub(crate) window_capacity: u32,
    /// Burst allowance of the local bucket
    pub(crate) burst_allowance: u32,
    /// Whether a remote report has been applied
    pub(crate) observed: bool,
    /// Quota resource being tracked, if reported
    pub(crate) resource: Option<String>,
    /// Tokens granted since construction or the last reset
    pub(crate) grants: u64,
    /// Total time callers spent waiting for tokens
    pub(crate) total_wait: Duration,
}
