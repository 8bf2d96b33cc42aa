//! # Provider selection strategies.
//!
//! [`BalanceStrategy::select`] is a pure function of the stats snapshot and
//! the dispatch counter: no side effects, deterministic tie-breaks (first in
//! list order wins). Selection against an empty candidate list fails with
//! [`SelectError::NoProviderAvailable`]; callers must not invoke execution in
//! that case.

use serde::{Deserialize, Serialize};

use crate::error::SelectError;
use crate::providers::ProviderStats;

/// Strategy for choosing which provider handles a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BalanceStrategy {
    /// Cycle through the provider list in dispatch order:
    /// `providers[total_dispatched mod len]`.
    RoundRobin,
    /// Pick the provider with the smallest cumulative request count.
    LeastLoaded,
    /// Pick the provider with the smallest smoothed average latency.
    FastestResponse,
    /// Pick the provider with the smallest cost per request.
    CostOptimized,
}

impl Default for BalanceStrategy {
    /// Returns [`BalanceStrategy::RoundRobin`].
    fn default() -> Self {
        BalanceStrategy::RoundRobin
    }
}

impl BalanceStrategy {
    /// Short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BalanceStrategy::RoundRobin => "round_robin",
            BalanceStrategy::LeastLoaded => "least_loaded",
            BalanceStrategy::FastestResponse => "fastest_response",
            BalanceStrategy::CostOptimized => "cost_optimized",
        }
    }

    /// Picks a provider index from the stats snapshot.
    ///
    /// `total_dispatched` is the monotonic count of execution attempts
    /// dispatched so far; only `RoundRobin` consumes it.
    ///
    /// Ties break toward the earlier list position, so selection is
    /// deterministic for any given snapshot.
    pub fn select(
        &self,
        candidates: &[ProviderStats],
        total_dispatched: u64,
    ) -> Result<usize, SelectError> {
        if candidates.is_empty() {
            return Err(SelectError::NoProviderAvailable);
        }

        let idx = match self {
            BalanceStrategy::RoundRobin => (total_dispatched % candidates.len() as u64) as usize,
            BalanceStrategy::LeastLoaded => {
                min_index(candidates, |s| s.requests as f64)
            }
            BalanceStrategy::FastestResponse => {
                min_index(candidates, |s| s.avg_latency_ms)
            }
            BalanceStrategy::CostOptimized => {
                min_index(candidates, |s| s.cost_per_request)
            }
        };
        Ok(idx)
    }
}

/// Index of the smallest key; first occurrence wins ties.
fn min_index(candidates: &[ProviderStats], key: impl Fn(&ProviderStats) -> f64) -> usize {
    let mut best = 0;
    let mut best_key = key(&candidates[0]);
    for (i, stats) in candidates.iter().enumerate().skip(1) {
        let k = key(stats);
        if k < best_key {
            best = i;
            best_key = k;
        }
    }
    best
}
