//! Serving-layer translation of admission decisions.
//!
//! The limiter itself never transmits anything. The serving layer takes the
//! [`Decision`] and, via this module, turns an allowance into advisory
//! response headers and a denial into a 429 rejection with a structured
//! body.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::admission::Decision;

/// Status code the serving layer pairs with a denial.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Advisory header naming the window ceiling.
pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
/// Advisory header naming the requests left in the window.
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
/// Advisory header naming the window reset time, in epoch milliseconds.
pub const HEADER_RESET: &str = "X-RateLimit-Reset";

/// Machine-readable error kind carried in every rejection body.
pub const ERROR_KIND_RATE_LIMITED: &str = "rate_limit_exceeded";

/// The three advisory rate-limit headers attached to responses.
///
/// Computed from either decision variant; a denial reports zero remaining.
/// The reset timestamp is epoch milliseconds, the same unit the limiter
/// uses internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// The configured ceiling.
    pub limit: u64,
    /// Requests left in the current window.
    pub remaining: u64,
    /// When the current window expires, in epoch milliseconds.
    pub reset_at_ms: u64,
}

impl RateLimitHeaders {
    /// Header name/value pairs, ready to copy onto a response.
    pub fn as_pairs(&self) -> [(&'static str, String); 3] {
        [
            (HEADER_LIMIT, self.limit.to_string()),
            (HEADER_REMAINING, self.remaining.to_string()),
            (HEADER_RESET, self.reset_at_ms.to_string()),
        ]
    }
}

impl From<&Decision> for RateLimitHeaders {
    fn from(decision: &Decision) -> Self {
        match *decision {
            Decision::Allowed {
                remaining,
                limit,
                reset_at_ms,
            } => Self {
                limit,
                remaining,
                reset_at_ms,
            },
            Decision::Denied {
                limit, reset_at_ms, ..
            } => Self {
                limit,
                remaining: 0,
                reset_at_ms,
            },
        }
    }
}

/// Structured body for a 429 rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionBody {
    /// Machine-readable error kind.
    pub error: String,
    /// Human-readable message naming the ceiling and window.
    pub message: String,
    /// Seconds until the client may retry.
    pub retry_after_secs: u64,
}

impl RejectionBody {
    /// Build the rejection body for a denial.
    ///
    /// Returns `None` for an allowed decision; `window` is the denying
    /// policy's window duration, used only for the message text.
    pub fn from_decision(decision: &Decision, window: Duration) -> Option<Self> {
        match *decision {
            Decision::Allowed { .. } => None,
            Decision::Denied {
                retry_after_secs,
                limit,
                ..
            } => Some(Self {
                error: ERROR_KIND_RATE_LIMITED.to_string(),
                message: format!(
                    "Rate limit of {} requests per {}s window exceeded, retry in {}s",
                    limit,
                    window.as_secs(),
                    retry_after_secs
                ),
                retry_after_secs,
            }),
        }
    }

    /// Serialize the body to its JSON wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
