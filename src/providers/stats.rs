//! # Per-provider rolling performance snapshot.
//!
//! [`ProviderStats`] is mutated after every execution attempt against its
//! provider; [`record_success`](ProviderStats::record_success) and
//! [`record_failure`](ProviderStats::record_failure) are the only mutators.
//!
//! ## Rules
//! - Success rate is recomputed from cumulative success/failure counts on
//!   every update, so it always lands in `[0, 1]`.
//! - Average latency is smoothed as `(old + new) / 2`; the first observation
//!   uses the raw latency.

use std::time::{Duration, SystemTime};

use serde::Serialize;

/// Rolling performance snapshot for one provider.
///
/// One instance per registered provider, created at registry construction,
/// never deleted while the dispatcher is alive.
#[derive(Clone, Debug, Serialize)]
pub struct ProviderStats {
    /// Provider name.
    pub name: String,
    /// Cumulative execution attempts (successes + failures).
    pub requests: u64,
    /// Cumulative successful attempts.
    pub successes: u64,
    /// Cumulative failed attempts.
    pub failures: u64,
    /// Fraction of successful attempts, in `[0, 1]`. 1.0 before any attempt.
    pub success_rate: f64,
    /// Smoothed average latency in milliseconds.
    pub avg_latency_ms: f64,
    /// Estimated cost per request, advertised by the provider.
    pub cost_per_request: f64,
    /// When the stats were last mutated.
    pub last_updated: SystemTime,
}

impl ProviderStats {
    /// Creates fresh stats for a provider.
    pub fn new(name: impl Into<String>, cost_per_request: f64) -> Self {
        Self {
            name: name.into(),
            requests: 0,
            successes: 0,
            failures: 0,
            success_rate: 1.0,
            avg_latency_ms: 0.0,
            cost_per_request,
            last_updated: SystemTime::now(),
        }
    }

    /// Records a successful attempt with its observed latency.
    pub fn record_success(&mut self, latency: Duration) {
        self.requests += 1;
        self.successes += 1;
        let observed = latency.as_secs_f64() * 1000.0;
        self.avg_latency_ms = if self.successes == 1 {
            observed
        } else {
            (self.avg_latency_ms + observed) / 2.0
        };
        self.recompute_rate();
    }

    /// Records a failed attempt.
    pub fn record_failure(&mut self) {
        self.requests += 1;
        self.failures += 1;
        self.recompute_rate();
    }

    fn recompute_rate(&mut self) {
        if self.requests > 0 {
            self.success_rate = self.successes as f64 / self.requests as f64;
        }
        self.last_updated = SystemTime::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_stats() {
        let s = ProviderStats::new("alpha", 0.02);
        assert_eq!(s.requests, 0);
        assert_eq!(s.success_rate, 1.0);
        assert_eq!(s.avg_latency_ms, 0.0);
        assert_eq!(s.cost_per_request, 0.02);
    }

    #[test]
    fn test_first_success_uses_raw_latency() {
        let mut s = ProviderStats::new("alpha", 0.0);
        s.record_success(Duration::from_millis(80));
        assert_eq!(s.requests, 1);
        assert_eq!(s.avg_latency_ms, 80.0);
        assert_eq!(s.success_rate, 1.0);
    }

    #[test]
    fn test_latency_smoothed_as_simple_moving_average() {
        let mut s = ProviderStats::new("alpha", 0.0);
        s.record_success(Duration::from_millis(100));
        s.record_success(Duration::from_millis(300));
        // (100 + 300) / 2
        assert_eq!(s.avg_latency_ms, 200.0);
        s.record_success(Duration::from_millis(0));
        assert_eq!(s.avg_latency_ms, 100.0);
    }

    #[test]
    fn test_rate_recomputed_from_cumulative_counts() {
        let mut s = ProviderStats::new("alpha", 0.0);
        s.record_success(Duration::from_millis(10));
        s.record_failure();
        assert_eq!(s.success_rate, 0.5);
        s.record_failure();
        assert!((s.success_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.requests, 3);
    }

    #[test]
    fn test_rate_stays_in_unit_interval() {
        let mut s = ProviderStats::new("alpha", 0.0);
        for _ in 0..50 {
            s.record_failure();
        }
        assert_eq!(s.success_rate, 0.0);
        for _ in 0..50 {
            s.record_success(Duration::from_millis(1));
        }
        assert!(s.success_rate > 0.0 && s.success_rate <= 1.0);
    }
}
