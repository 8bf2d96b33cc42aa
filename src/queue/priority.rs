//! # Dispatch precedence classes.
//!
//! [`Priority`] orders requests in the queue: `Critical` dispatches before
//! `High`, `High` before `Normal`, `Normal` before `Low`. Priority affects
//! only queue-exit order; an admitted lower-priority request is never
//! preempted once processing.

use serde::{Deserialize, Serialize};

/// Priority class of a request.
///
/// Lower rank dispatches first. Within one class, requests dispatch in
/// submission order (FIFO).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Dispatched before everything else.
    Critical,
    /// Dispatched before normal traffic.
    High,
    /// Default class.
    Normal,
    /// Dispatched only when nothing else is queued.
    Low,
}

impl Default for Priority {
    /// Returns [`Priority::Normal`].
    fn default() -> Self {
        Priority::Normal
    }
}

impl Priority {
    /// Numeric rank; lower dispatches first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }

    /// Short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}
