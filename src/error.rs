//! Error types for the Turnstile crate.

use thiserror::Error;

/// Main error type for Turnstile operations.
#[derive(Error, Debug)]
pub enum TurnstileError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request was denied by admission control.
    ///
    /// This is a normal, expected outcome, never a process fault. The
    /// limiter reports it as [`Decision::Denied`](crate::admission::Decision);
    /// this variant exists so callers that prefer `?` over matching on the
    /// decision can convert via [`Decision::as_result`](crate::admission::Decision::as_result).
    #[error("Rate limit of {limit} exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Seconds until the client may retry.
        retry_after_secs: u64,
        /// The configured ceiling for the window.
        limit: u64,
        /// When the current window expires, in epoch milliseconds.
        reset_at_ms: u64,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Turnstile operations.
pub type Result<T> = std::result::Result<T, TurnstileError>;
