//! Core admission limiter implementation.

use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::error::{Result, TurnstileError};
use crate::request::RequestMeta;

use super::key::{KeyDeriver, RemoteAddrKey};
use super::window::{epoch_ms_now, Policy, WindowRecord};

/// Outcome of an admission check for one request.
///
/// A denial is a normal, expected outcome; the serving boundary translates
/// it into a structured rejection while an allowance becomes advisory
/// response headers (see [`crate::boundary`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed to its handler.
    Allowed {
        /// Requests left in the current window, never negative.
        remaining: u64,
        /// The configured ceiling.
        limit: u64,
        /// When the current window expires, in epoch milliseconds.
        reset_at_ms: u64,
    },
    /// The request must be rejected.
    Denied {
        /// Seconds until the window resets, rounded up.
        retry_after_secs: u64,
        /// The configured ceiling.
        limit: u64,
        /// When the current window expires, in epoch milliseconds.
        reset_at_ms: u64,
    },
}

impl Decision {
    /// Whether the request was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// Bridge to `?`-style control flow for callers that prefer a `Result`
    /// over matching on the decision.
    pub fn as_result(&self) -> Result<()> {
        match *self {
            Decision::Allowed { .. } => Ok(()),
            Decision::Denied {
                retry_after_secs,
                limit,
                reset_at_ms,
            } => Err(TurnstileError::RateLimitExceeded {
                retry_after_secs,
                limit,
                reset_at_ms,
            }),
        }
    }
}

/// Context handed to the audit hook for every denied request.
#[derive(Debug)]
pub struct LimitEvent<'a> {
    /// The client key whose window overflowed.
    pub key: &'a str,
    /// Observed count for the window, including the denied request.
    pub count: u64,
    /// The configured ceiling.
    pub limit: u64,
    /// The policy's window duration.
    pub window: Duration,
    /// The request that was denied.
    pub request: &'a RequestMeta,
}

type LimitHook = Box<dyn Fn(&LimitEvent<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Fixed-window admission limiter for one policy.
///
/// Owns the counting table for its key space. This struct is thread-safe
/// and is shared behind an `Arc` between the serving layer and the
/// [`Sweeper`](super::Sweeper).
pub struct Limiter {
    /// The policy this limiter enforces.
    policy: Policy,
    /// Maps a request to its counting key.
    key_deriver: Box<dyn KeyDeriver>,
    /// Optional audit hook, invoked once per denial.
    on_limit_reached: Option<LimitHook>,
    /// Counting windows indexed by client key.
    windows: DashMap<String, WindowRecord>,
}

impl Limiter {
    /// Create a limiter for `policy`, keyed by client IP.
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            key_deriver: Box::new(RemoteAddrKey),
            on_limit_reached: None,
            windows: DashMap::new(),
        }
    }

    /// Replace the default key deriver.
    pub fn with_key_deriver(mut self, deriver: impl KeyDeriver + 'static) -> Self {
        self.key_deriver = Box::new(deriver);
        self
    }

    /// Install an audit hook, invoked exactly once per denied request.
    ///
    /// Hook errors are logged and swallowed; they never change the decision.
    pub fn with_limit_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&LimitEvent<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_limit_reached = Some(Box::new(hook));
        self
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Check whether `request` may be admitted, counting it against its
    /// key's current window.
    pub fn check(&self, request: &RequestMeta) -> Decision {
        self.check_at(request, epoch_ms_now())
    }

    /// Clock-injected form of [`check`](Self::check).
    pub(crate) fn check_at(&self, request: &RequestMeta, now_ms: u64) -> Decision {
        let key = self.key_deriver.derive(request);

        trace!(key = %key, "Checking admission");

        // Read-or-create, stale replacement, increment and the threshold
        // read all happen under this key's entry guard: updates to one key
        // are linearizable, distinct keys never block each other.
        let (count, reset_at_ms) = {
            let mut entry = self.windows.entry(key.clone()).or_insert_with(|| {
                debug!(
                    key = %key,
                    limit = self.policy.max_requests,
                    window_ms = self.policy.window.as_millis() as u64,
                    "Creating new counting window"
                );
                WindowRecord::new(now_ms, self.policy.window)
            });

            let record = entry.value_mut();
            if record.is_expired(now_ms) {
                *record = WindowRecord::new(now_ms, self.policy.window);
            }
            record.count += 1;

            (record.count, record.reset_at_ms)
        };

        if count > self.policy.max_requests {
            let retry_after_secs = reset_at_ms.saturating_sub(now_ms).div_ceil(1000);
            let decision = Decision::Denied {
                retry_after_secs,
                limit: self.policy.max_requests,
                reset_at_ms,
            };
            self.audit_denial(&key, count, request);
            decision
        } else {
            Decision::Allowed {
                remaining: self.policy.max_requests.saturating_sub(count),
                limit: self.policy.max_requests,
                reset_at_ms,
            }
        }
    }

    /// Emit the structured audit event for a denial and run the hook.
    ///
    /// Failures here are isolated: neither a logging problem nor a hook
    /// error can prevent the decision from being returned.
    fn audit_denial(&self, key: &str, count: u64, request: &RequestMeta) {
        warn!(
            key = %key,
            count = count,
            limit = self.policy.max_requests,
            window_ms = self.policy.window.as_millis() as u64,
            method = %request.method,
            path = %request.path,
            user_agent = request.user_agent.as_deref().unwrap_or(""),
            "Rate limit exceeded"
        );

        if let Some(hook) = &self.on_limit_reached {
            let event = LimitEvent {
                key,
                count,
                limit: self.policy.max_requests,
                window: self.policy.window,
                request,
            };
            if let Err(error) = hook(&event) {
                warn!(key = %key, error = %error, "Limit hook failed");
            }
        }
    }

    /// Report the handler outcome for an already-admitted request.
    ///
    /// When the policy's matching skip flag is set, the request is
    /// retroactively uncounted from its key's live window. Windows that
    /// expired in the meantime are left alone.
    pub fn record_outcome(&self, request: &RequestMeta, success: bool) {
        self.record_outcome_at(request, success, epoch_ms_now())
    }

    /// Clock-injected form of [`record_outcome`](Self::record_outcome).
    pub(crate) fn record_outcome_at(&self, request: &RequestMeta, success: bool, now_ms: u64) {
        let skip = if success {
            self.policy.skip_successful_requests
        } else {
            self.policy.skip_failed_requests
        };
        if !skip {
            return;
        }

        let key = self.key_deriver.derive(request);
        if let Some(mut record) = self.windows.get_mut(&key) {
            if !record.is_expired(now_ms) {
                record.count = record.count.saturating_sub(1);
                trace!(key = %key, count = record.count, "Uncounted request after handler outcome");
            }
        }
    }

    /// Evict every expired window record.
    ///
    /// Returns the number of records removed. Removal takes the same shard
    /// locks as [`check`](Self::check), so eviction never interleaves with
    /// the admission sequence for a key.
    pub fn sweep(&self) -> usize {
        self.sweep_at(epoch_ms_now())
    }

    /// Clock-injected form of [`sweep`](Self::sweep).
    pub(crate) fn sweep_at(&self, now_ms: u64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, record| !record.is_expired(now_ms));
        before.saturating_sub(self.windows.len())
    }

    /// Get the current count for a key.
    ///
    /// Returns `None` if no window exists for the key.
    pub fn current_count(&self, key: &str) -> Option<u64> {
        self.windows.get(key).map(|record| record.count)
    }

    /// Number of keys with a tracked window.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drop every tracked window.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.windows.clear();
    }
}
