//! Error types used by the dispatcher runtime and providers.
//!
//! This module defines the error taxonomy:
//!
//! - [`ProviderError`] — failures of individual provider executions.
//! - [`SelectError`] — provider selection against an empty candidate set.
//! - [`SubmitError`] — submission rejected by the dispatcher.
//! - [`QueryError`] — status queries against unknown request ids.
//! - [`DispatchError`] — errors raised by the dispatcher runtime itself.
//!
//! The types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics and [`ProviderError::is_retryable`] which gates the
//! retry-or-fail transition. Transient errors under the retry ceiling are
//! recovered internally and never surfaced to callers; expected conditions
//! (empty queue, full concurrency, exhausted retries) are state, not panics.

use std::time::Duration;
use thiserror::Error;

use crate::requests::RequestId;

/// # Errors produced by provider execution.
///
/// These represent failures of a single execution attempt against a provider.
/// Some errors are retryable (`Timeout`, `Fail`), others are terminal.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider call exceeded its configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable error; the request fails without consuming retries.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The provider call failed but may succeed if retried.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The request was cancelled while the provider call was in flight.
    #[error("request cancelled")]
    Canceled,
}

impl ProviderError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskrouter::ProviderError;
    /// use std::time::Duration;
    ///
    /// let err = ProviderError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "provider_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProviderError::Timeout { .. } => "provider_timeout",
            ProviderError::Fatal { .. } => "provider_fatal",
            ProviderError::Fail { .. } => "provider_failed",
            ProviderError::Canceled => "provider_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ProviderError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            ProviderError::Fatal { error } => format!("fatal: {error}"),
            ProviderError::Fail { error } => format!("error: {error}"),
            ProviderError::Canceled => "request cancelled".to_string(),
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// Returns `true` for [`ProviderError::Fail`] and
    /// [`ProviderError::Timeout`], `false` otherwise.
    ///
    /// # Example
    /// ```
    /// use taskrouter::ProviderError;
    ///
    /// let retryable = ProviderError::Fail { error: "boom".into() };
    /// assert!(retryable.is_retryable());
    ///
    /// let fatal = ProviderError::Fatal { error: "nope".into() };
    /// assert!(!fatal.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Fail { .. } | ProviderError::Timeout { .. }
        )
    }
}

/// Error returned by provider selection.
///
/// Fatal to the specific dispatch attempt only: the dispatcher requeues the
/// request and retries selection on a later tick.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectError {
    /// The candidate list was empty; no provider can handle the request.
    #[error("no provider available")]
    NoProviderAvailable,
}

/// Error returned by [`Dispatcher::submit`](crate::Dispatcher::submit).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The dispatcher has begun shutting down and accepts no new work.
    #[error("dispatcher shutting down")]
    ShuttingDown,
}

/// Error returned by status and cancellation queries.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    /// The request id is unknown or was evicted.
    #[error("request {id} not found")]
    NotFound {
        /// The id that failed to resolve.
        id: RequestId,
    },
}

/// # Errors produced by the dispatcher runtime.
///
/// These represent failures in the dispatch machinery itself, such as a
/// shutdown sequence exceeding its grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Shutdown grace period was exceeded; some requests were still processing.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Requests that were still in flight when the grace period ran out.
        stuck: Vec<RequestId>,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::GraceExceeded { .. } => "dispatch_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DispatchError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck requests={stuck:?}")
            }
        }
    }
}
