//! # Global dispatcher configuration.
//!
//! [`Config`] defines the dispatcher's behavior: concurrency budget, retry
//! policy, load-balancing strategy, per-attempt timeout, dispatch tick
//! interval, shutdown grace period, and event bus capacity.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use taskrouter::{BalanceStrategy, Config};
//!
//! let mut cfg = Config::default();
//! cfg.max_concurrent = 4;
//! cfg.timeout = Duration::from_secs(30);
//! cfg.strategy = BalanceStrategy::LeastLoaded;
//!
//! assert_eq!(cfg.max_concurrent, 4);
//! ```

use std::time::Duration;

use crate::balance::BalanceStrategy;
use crate::policies::RetryPolicy;

/// Global configuration for the dispatcher.
///
/// Controls the concurrency budget, retries, provider selection, timeouts,
/// the dispatch tick, shutdown grace, and event bus capacity.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of requests processing concurrently.
    ///
    /// Clamped to at least 1 when the dispatcher is constructed.
    pub max_concurrent: usize,
    /// Retry policy applied to failed provider calls.
    pub retry: RetryPolicy,
    /// Load-balancing strategy for provider selection.
    pub strategy: BalanceStrategy,
    /// Per-attempt provider call timeout (0 = no timeout).
    pub timeout: Duration,
    /// Dispatch tick interval; the safety net behind the wake signal.
    pub tick: Duration,
    /// Maximum time to wait for in-flight requests to drain on shutdown.
    pub grace: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `max_concurrent = 4`
    /// - `retry = RetryPolicy::default()` (3 retries, exponential backoff)
    /// - `strategy = BalanceStrategy::RoundRobin`
    /// - `timeout = 0s` (no timeout)
    /// - `tick = 100ms`
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            retry: RetryPolicy::default(),
            strategy: BalanceStrategy::default(),
            timeout: Duration::from_secs(0),
            tick: Duration::from_millis(100),
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
        }
    }
}

impl Config {
    /// Returns the per-attempt timeout, treating `0s` as `None`.
    pub fn attempt_timeout(&self) -> Option<Duration> {
        if self.timeout > Duration::ZERO {
            Some(self.timeout)
        } else {
            None
        }
    }
}
