//! # Request identity, lifecycle states, and snapshots.
//!
//! [`RequestId`] is the opaque handle returned by submission and accepted by
//! every status/cancel call. [`RequestStatus`] is the lifecycle state machine:
//!
//! ```text
//! Pending ──► Processing ──► Completed
//!    ▲             │
//!    └── requeue ──┤ (retry budget remaining)
//!                  └──────► Failed (retry ceiling reached)
//!
//! any non-terminal state ──► Cancelled (external request)
//! ```
//!
//! Terminal states (`Completed`, `Failed`, `Cancelled`) are immutable; the
//! dispatcher makes no further state changes for such a request.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::queue::Priority;

/// Global allocator for request ids.
static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique request identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocates the next id. Monotonic within a process.
    pub(crate) fn next() -> Self {
        Self(REQUEST_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Returns the raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Lifecycle state of a queued request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting in the priority queue (or waiting out a retry backoff).
    Pending,
    /// Admitted; a provider call is in flight.
    Processing,
    /// The provider returned a result. Terminal.
    Completed,
    /// Retries exhausted or a fatal error occurred. Terminal.
    Failed,
    /// Cancelled by the caller. Terminal.
    Cancelled,
}

impl RequestStatus {
    /// Returns true for `Completed`, `Failed`, and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Failed | RequestStatus::Cancelled
        )
    }
}

/// Point-in-time view of a request, returned by
/// [`Dispatcher::status`](crate::Dispatcher::status).
///
/// Reading a snapshot has no side effects; repeated reads without intervening
/// state changes return identical results.
#[derive(Clone, Debug, Serialize)]
pub struct RequestSnapshot {
    /// The request id.
    pub id: RequestId,
    /// Task name from the payload.
    pub task: String,
    /// Priority class assigned at submission.
    pub priority: Priority,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// When the request was submitted.
    pub created_at: SystemTime,
    /// When the first provider call started (set once, on first dispatch).
    pub started_at: Option<SystemTime>,
    /// Retries consumed so far.
    pub retry_count: u32,
    /// Retry ceiling fixed at creation.
    pub max_retries: u32,
    /// Provider result, present once `Completed`.
    pub result: Option<Value>,
    /// Final error message, present once `Failed`.
    pub error: Option<String>,
}
