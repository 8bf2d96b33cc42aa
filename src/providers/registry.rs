//! # Provider registry: backend list plus rolling stats.
//!
//! The registry owns the static provider list (fixed at construction) and
//! one [`ProviderStats`] per provider. Stats are guarded by a single
//! `RwLock`; [`record_success`](ProviderRegistry::record_success) and
//! [`record_failure`](ProviderRegistry::record_failure) are the only
//! mutators.
//!
//! ## Rules
//! - Providers are addressed by list index; selection tie-breaks rely on
//!   stable list order.
//! - `snapshot()` clones the stats so strategy selection stays a pure
//!   function over an immutable slice.

use std::time::Duration;

use tokio::sync::RwLock;

use crate::providers::{Provider, ProviderRef, ProviderStats};

/// Static list of execution backends and their rolling statistics.
pub struct ProviderRegistry {
    providers: Vec<ProviderRef>,
    stats: RwLock<Vec<ProviderStats>>,
}

impl ProviderRegistry {
    /// Creates a registry over the given providers.
    ///
    /// Stats start fresh: zero requests, success rate 1.0, the cost copied
    /// from [`Provider::cost_per_request`](crate::Provider::cost_per_request).
    pub fn new(providers: Vec<ProviderRef>) -> Self {
        let stats = providers
            .iter()
            .map(|p| ProviderStats::new(p.name(), p.cost_per_request()))
            .collect();
        Self {
            providers,
            stats: RwLock::new(stats),
        }
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true when no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns the provider at `idx`.
    ///
    /// Indices come from strategy selection over a snapshot of the same
    /// registry, so they are always in range.
    pub fn provider(&self, idx: usize) -> &ProviderRef {
        &self.providers[idx]
    }

    /// Clones the current stats for strategy selection or observers.
    pub async fn snapshot(&self) -> Vec<ProviderStats> {
        self.stats.read().await.clone()
    }

    /// Records a successful attempt against the provider at `idx`.
    pub async fn record_success(&self, idx: usize, latency: Duration) {
        let mut stats = self.stats.write().await;
        if let Some(s) = stats.get_mut(idx) {
            s.record_success(latency);
        }
    }

    /// Records a failed attempt against the provider at `idx`.
    pub async fn record_failure(&self, idx: usize) {
        let mut stats = self.stats.write().await;
        if let Some(s) = stats.get_mut(idx) {
            s.record_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::providers::ProviderFn;
    use serde_json::Value;

    fn provider(name: &'static str, cost: f64) -> ProviderRef {
        std::sync::Arc::new(
            ProviderFn::new(name, |_payload, _ctx| async move {
                Ok::<Value, ProviderError>(Value::Null)
            })
            .with_cost(cost),
        )
    }

    #[tokio::test]
    async fn test_stats_initialized_per_provider() {
        let reg = ProviderRegistry::new(vec![provider("a", 0.0), provider("b", 0.0)]);
        let snap = reg.snapshot().await;
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].name, "a");
        assert_eq!(snap[1].name, "b");
        assert_eq!(snap[0].requests, 0);
    }

    #[tokio::test]
    async fn test_record_success_updates_only_target() {
        let reg = ProviderRegistry::new(vec![provider("a", 0.0), provider("b", 0.0)]);
        reg.record_success(1, Duration::from_millis(40)).await;

        let snap = reg.snapshot().await;
        assert_eq!(snap[0].requests, 0);
        assert_eq!(snap[1].requests, 1);
        assert_eq!(snap[1].avg_latency_ms, 40.0);
    }

    #[tokio::test]
    async fn test_record_failure_lowers_rate() {
        let reg = ProviderRegistry::new(vec![provider("a", 0.0)]);
        reg.record_success(0, Duration::from_millis(5)).await;
        reg.record_failure(0).await;

        let snap = reg.snapshot().await;
        assert_eq!(snap[0].requests, 2);
        assert_eq!(snap[0].success_rate, 0.5);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let reg = ProviderRegistry::new(vec![provider("a", 0.0)]);
        let before = reg.snapshot().await;
        reg.record_failure(0).await;
        assert_eq!(before[0].requests, 0);
        assert_eq!(reg.snapshot().await[0].requests, 1);
    }
}
