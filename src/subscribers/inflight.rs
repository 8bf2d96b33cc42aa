//! # In-flight request tracker with sequence-based ordering.
//!
//! Maintains the authoritative set of requests currently processing, using
//! event sequence numbers to handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! executor ──► Bus ──► dispatcher listener ──► InflightTracker::on_event()
//!                                                      │
//!                                                      ▼
//!                                       HashMap<RequestId, {seq, in_flight}>
//! ```
//!
//! ## Rules
//! - `RequestStarting` marks a request in flight; `RequestCompleted`,
//!   `RetryScheduled`, `RequestExhausted`, and `RequestCancelled` clear it.
//! - `AttemptFailed` does **not** clear the flag: the retry decision that
//!   follows it does.
//! - Events with `seq <= last_seq` for a request are rejected (stale).
//! - Reads (`snapshot`, `is_in_flight`) are eventually consistent.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::{Event, EventKind};
use crate::requests::RequestId;
use crate::subscribers::Subscribe;

/// Per-request state for ordering validation.
#[derive(Debug, Clone)]
struct TrackState {
    last_seq: u64,
    in_flight: bool,
}

/// Thread-safe tracker of processing requests.
///
/// Feeds the stuck-request list reported when a shutdown overruns its grace
/// period.
pub struct InflightTracker {
    state: RwLock<HashMap<RequestId, TrackState>>,
}

impl InflightTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Applies an event if it is newer than the last seen for its request.
    ///
    /// Returns true when the in-flight flag changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let id = match ev.request {
            Some(id) => id,
            None => return false,
        };

        let mut state = self.state.write().await;
        let entry = state.entry(id).or_insert(TrackState {
            last_seq: 0,
            in_flight: false,
        });

        if ev.seq <= entry.last_seq {
            return false;
        }
        match ev.kind {
            EventKind::RequestStarting => {
                entry.last_seq = ev.seq;
                entry.in_flight = true;
                true
            }
            EventKind::RequestCompleted
            | EventKind::RetryScheduled
            | EventKind::RequestExhausted
            | EventKind::RequestCancelled => {
                entry.last_seq = ev.seq;
                entry.in_flight = false;
                true
            }
            _ => {
                entry.last_seq = ev.seq;
                false
            }
        }
    }

    /// Returns the sorted list of request ids currently in flight.
    pub async fn snapshot(&self) -> Vec<RequestId> {
        let state = self.state.read().await;
        let mut ids: Vec<RequestId> = state
            .iter()
            .filter(|(_, ts)| ts.in_flight)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Returns true if the request is currently in flight.
    pub async fn is_in_flight(&self, id: RequestId) -> bool {
        self.state
            .read()
            .await
            .get(&id)
            .map(|ts| ts.in_flight)
            .unwrap_or(false)
    }

    /// Drops tracking state for a request (after eviction).
    pub async fn forget(&self, id: RequestId) {
        self.state.write().await.remove(&id);
    }
}

impl Default for InflightTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Subscribe for InflightTracker {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn name(&self) -> &'static str {
        "inflight_tracker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(kind: EventKind, id: RequestId) -> Event {
        Event::now(kind).with_request(id)
    }

    #[tokio::test]
    async fn test_starting_marks_in_flight() {
        let t = InflightTracker::new();
        let id = RequestId::next();
        t.update(&ev(EventKind::RequestStarting, id)).await;
        assert!(t.is_in_flight(id).await);
        assert_eq!(t.snapshot().await, vec![id]);
    }

    #[tokio::test]
    async fn test_terminal_events_clear_in_flight() {
        let t = InflightTracker::new();
        for kind in [
            EventKind::RequestCompleted,
            EventKind::RetryScheduled,
            EventKind::RequestExhausted,
            EventKind::RequestCancelled,
        ] {
            let id = RequestId::next();
            t.update(&ev(EventKind::RequestStarting, id)).await;
            t.update(&ev(kind, id)).await;
            assert!(!t.is_in_flight(id).await, "{kind:?} should clear");
        }
    }

    #[tokio::test]
    async fn test_attempt_failed_does_not_clear() {
        let t = InflightTracker::new();
        let id = RequestId::next();
        t.update(&ev(EventKind::RequestStarting, id)).await;
        t.update(&ev(EventKind::AttemptFailed, id)).await;
        assert!(t.is_in_flight(id).await);
    }

    #[tokio::test]
    async fn test_stale_events_rejected() {
        let t = InflightTracker::new();
        let id = RequestId::next();
        let stop = ev(EventKind::RequestCompleted, id);
        let start = ev(EventKind::RequestStarting, id);
        // Deliver out of order: the later-seq event wins.
        assert!(t.update(&start).await);
        assert!(!t.update(&stop).await);
        assert!(t.is_in_flight(id).await);
    }
}
