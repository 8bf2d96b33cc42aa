//! # Retry policy for failed requests.
//!
//! [`RetryPolicy`] bundles the retry ceiling with the backoff shape. The
//! ceiling is fixed at request creation: a request whose retry counter has
//! reached `max_retries` transitions to `Failed` on its next error instead of
//! requeueing.

use crate::policies::BackoffPolicy;

/// Retry policy applied to failed provider calls.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Maximum number of requeues before a request fails terminally.
    pub max_retries: u32,
    /// Delay shape between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    /// Returns a policy with `max_retries = 3` and the default exponential
    /// backoff.
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}
