//! # Backoff policy for requeued requests.
//!
//! [`BackoffPolicy`] controls how the delay before a requeue grows as a
//! request accumulates retries. It is parameterized by:
//! - [`BackoffPolicy::first`] the delay before the first retry;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay for retry `n` is `first × factor^n`, clamped to `max`, then
//! jitter is applied. The base delay is derived purely from the retry count,
//! so jitter output never feeds back into subsequent calculations and delays
//! cannot drift downward over time.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use taskrouter::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! // Retry 0 uses 'first'
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! // Retry 1: first × factor
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! // Far out: capped at max
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Requeue backoff policy.
///
/// With `factor >= 1.0` the delay sequence is monotonically non-decreasing
/// across retries, which is what the dispatcher's retry path assumes.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter policy to prevent thundering herd.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 100ms`;
    /// - `factor = 2.0` (exponential);
    /// - `max = 30s`;
    /// - no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            jitter: JitterPolicy::None,
            factor: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given retry count (0-indexed).
    ///
    /// The base delay is `first × factor^retry`, clamped to
    /// [`BackoffPolicy::max`]. Jitter is applied to the clamped base; the
    /// result is never fed back into subsequent calculations.
    ///
    /// # Notes
    /// - `factor = 1.0` keeps the delay constant at `first` (up to `max`).
    /// - `factor > 1.0` grows delays exponentially up to `max`.
    /// - Overflowing or non-finite intermediate values clamp to `max`.
    pub fn next(&self, retry: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let clamped_exp = retry.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(clamped_exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }
}
