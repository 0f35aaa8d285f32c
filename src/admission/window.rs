//! Counting window records and policy configuration.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
///
/// All window bookkeeping uses this one unit so that reset timestamps in
/// decisions and response headers line up with the retry computation.
pub(crate) fn epoch_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A counting window for one client key.
///
/// Created with a zero count the first time a key is observed (or the first
/// time after expiry) and incremented on every request inside the live
/// window. A record whose `reset_at_ms` has been reached is stale and must
/// be treated as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WindowRecord {
    /// Requests counted in the current window.
    pub count: u64,
    /// When the current window expires, in epoch milliseconds.
    pub reset_at_ms: u64,
}

impl WindowRecord {
    /// Create a fresh window starting at `now_ms`.
    pub fn new(now_ms: u64, window: Duration) -> Self {
        Self {
            count: 0,
            reset_at_ms: now_ms + window.as_millis() as u64,
        }
    }

    /// Whether this window has expired at `now_ms`.
    ///
    /// The exact boundary belongs to the fresh window: a request arriving at
    /// `now_ms == reset_at_ms` is counted against a new window.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.reset_at_ms
    }
}

/// Immutable configuration for one admission policy.
///
/// A policy is plain data constructed once at startup; the key deriver and
/// audit hook live on the [`Limiter`](super::Limiter) that enforces it.
#[derive(Debug, Clone)]
pub struct Policy {
    /// Duration of one counting window.
    pub window: Duration,
    /// Maximum admitted requests per key per window. A ceiling of zero
    /// denies every request.
    pub max_requests: u64,
    /// Retroactively uncount requests whose handler succeeded.
    pub skip_successful_requests: bool,
    /// Retroactively uncount requests whose handler failed.
    pub skip_failed_requests: bool,
}

impl Policy {
    /// Create a policy admitting `max_requests` per key per `window`.
    pub fn new(window: Duration, max_requests: u64) -> Self {
        Self {
            window,
            max_requests,
            skip_successful_requests: false,
            skip_failed_requests: false,
        }
    }

    /// Exclude requests whose handler reported success from the count.
    pub fn skip_successful(mut self) -> Self {
        self.skip_successful_requests = true;
        self
    }

    /// Exclude requests whose handler reported failure from the count.
    pub fn skip_failed(mut self) -> Self {
        self.skip_failed_requests = true;
        self
    }
}
