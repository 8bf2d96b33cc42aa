//! # Runtime events emitted by the dispatcher.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Request lifecycle**: submission, dispatch, completion, retries,
//!   terminal failure, cancellation
//! - **Selection**: provider pool exhaustion
//! - **Shutdown**: request/drained/grace-exceeded phases
//!
//! The [`Event`] struct carries optional metadata: request id, provider
//! name, priority, attempt number, delays and latencies, reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```
//! use taskrouter::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::AttemptFailed)
//!     .with_provider("gpu-1")
//!     .with_reason("connection refused")
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, EventKind::AttemptFailed);
//! assert_eq!(ev.provider.as_deref(), Some("gpu-1"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::queue::Priority;
use crate::requests::RequestId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Request lifecycle ===
    /// Request accepted into the priority queue.
    ///
    /// Sets: `request`, `priority`, `at`, `seq`.
    RequestSubmitted,

    /// Request admitted; a provider call is starting.
    ///
    /// Sets: `request`, `provider`, `attempt` (1-based), `at`, `seq`.
    RequestStarting,

    /// Provider returned a result; request is terminal `Completed`.
    ///
    /// Sets: `request`, `provider`, `latency_ms`, `at`, `seq`.
    RequestCompleted,

    /// One execution attempt failed (retry decision not yet reflected).
    ///
    /// Sets: `request`, `provider`, `attempt`, `reason`, `at`, `seq`.
    AttemptFailed,

    /// Requeue scheduled after a retryable failure.
    ///
    /// Sets: `request`, `attempt` (the failed attempt), `delay_ms`,
    /// `reason`, `at`, `seq`.
    RetryScheduled,

    /// Retry ceiling reached (or fatal error); request is terminal `Failed`.
    ///
    /// Sets: `request`, `attempt`, `reason`, `at`, `seq`.
    RequestExhausted,

    /// Request cancelled by the caller.
    ///
    /// Sets: `request`, `at`, `seq`.
    RequestCancelled,

    // === Selection ===
    /// Dispatch attempt found no provider; request requeued for a later tick.
    ///
    /// Sets: `request`, `at`, `seq`.
    ProvidersUnavailable,

    // === Shutdown ===
    /// Shutdown requested; the dispatch loop stops admitting work.
    ///
    /// Sets: `at`, `seq`.
    ShutdownRequested,

    /// All in-flight requests drained within the grace period.
    ///
    /// Sets: `at`, `seq`.
    Drained,

    /// Grace period exceeded; some requests were still processing.
    ///
    /// Sets: `at`, `seq`.
    GraceExceeded,

    // === Subscriber plumbing ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`, `at`, `seq`.
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason`, `at`, `seq`.
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Request id, if applicable.
    pub request: Option<RequestId>,
    /// Provider name, if applicable.
    pub provider: Option<Arc<str>>,
    /// Priority class, if applicable.
    pub priority: Option<Priority>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay before the requeue, in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Observed provider latency, in milliseconds (compact).
    pub latency_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            request: None,
            provider: None,
            priority: None,
            attempt: None,
            delay_ms: None,
            latency_ms: None,
            reason: None,
        }
    }

    /// Attaches a request id.
    #[inline]
    pub fn with_request(mut self, id: RequestId) -> Self {
        self.request = Some(id);
        self
    }

    /// Attaches a provider name.
    #[inline]
    pub fn with_provider(mut self, provider: impl Into<Arc<str>>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attaches a priority class.
    #[inline]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches an observed latency (stored as milliseconds).
    #[inline]
    pub fn with_latency(mut self, d: Duration) -> Self {
        self.latency_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::now(EventKind::RequestSubmitted);
        let b = Event::now(EventKind::RequestSubmitted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::now(EventKind::RetryScheduled)
            .with_attempt(3)
            .with_delay(Duration::from_millis(250))
            .with_reason("boom");
        assert_eq!(ev.attempt, Some(3));
        assert_eq!(ev.delay_ms, Some(250));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }

    #[test]
    fn test_compact_ms_saturates() {
        let huge = Duration::from_secs(u64::MAX / 2);
        assert_eq!(compact_ms(huge), u32::MAX);
    }
}
