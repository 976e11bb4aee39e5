//! Retry-until-cancel policy for transfer failures.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying download errors and deciding whether a worker tries again.
//!
//! # Overview
//!
//! When a transfer attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - network, HTTP status and local I/O failures
//! - [`FailureType::Permanent`] - the derived file name is unusable
//! - [`FailureType::Cancelled`] - the run is winding down
//!
//! The default [`RetryPolicy`] retries every transient failure immediately
//! and without limit. A worker only stops on success, cancellation, or a
//! permanent failure.
//!
//! # Example
//!
//! ```
//! use abide_core::download::{
//!     DownloadError, FailureType, RetryDecision, RetryPolicy, classify_error,
//! };
//!
//! let policy = RetryPolicy::default();
//! let error = DownloadError::http_status("http://example.com/file.exe", 503);
//! let failure_type = classify_error(&error);
//! assert_eq!(failure_type, FailureType::Transient);
//!
//! match policy.should_retry(failure_type, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::DownloadError;

/// Classification of transfer failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// May succeed on another attempt.
    Transient,

    /// Will not succeed no matter how often it is retried.
    Permanent,

    /// Cancellation was observed; stop without error.
    Cancelled,
}

/// Decision on whether to retry a failed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the transfer after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the transfer.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior.
///
/// # Default Values
///
/// - `max_attempts`: unbounded
/// - `delay`: zero
///
/// The defaults retry a failed transfer immediately, forever, until it
/// succeeds or the run is cancelled.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first; `None` is unbounded.
    max_attempts: Option<u32>,

    /// Pause between a failure and the next attempt.
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// A bounded `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: Option<u32>, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.map(|max| max.max(1)),
            delay,
        }
    }

    /// Creates the unbounded, zero-delay policy.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Creates a bounded policy with zero delay.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(Some(max_attempts), Duration::ZERO)
    }

    /// Returns the attempt limit, or `None` when unbounded.
    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Returns the delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Determines whether to retry a failed transfer.
    ///
    /// # Arguments
    ///
    /// * `failure_type` - Classification of the failure
    /// * `attempt` - The attempt number that just failed (1-indexed)
    #[instrument(level = "debug", skip(self), fields(max_attempts = ?self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Cancelled => {
                return RetryDecision::DoNotRetry {
                    reason: "cancelled".to_string(),
                };
            }
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::Transient => {}
        }

        if let Some(max) = self.max_attempts
            && attempt >= max
        {
            debug!(attempt, max, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({max}) exhausted"),
            };
        }

        debug!(
            attempt,
            next_attempt = attempt.saturating_add(1),
            delay_ms = self.delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt.saturating_add(1),
        }
    }
}

/// Classifies a transfer error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Network, Timeout | Transient |
/// | HttpStatus (any) | Transient |
/// | Io | Transient |
/// | UnsafePath | Permanent |
/// | Cancelled | Cancelled |
///
/// HTTP statuses are not split into permanent and transient: mirrors come
/// and go, so every status is worth another attempt.
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::Network { .. }
        | DownloadError::Timeout { .. }
        | DownloadError::HttpStatus { .. }
        | DownloadError::Io { .. } => FailureType::Transient,
        DownloadError::UnsafePath { .. } => FailureType::Permanent,
        DownloadError::Cancelled { .. } => FailureType::Cancelled,
    }
}
