//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos; implement a custom [`Subscribe`] for
//! structured logging or metrics collection.
//!
//! ## Example output
//! ```text
//! [submitted] request=req-1 priority=high
//! [starting] request=req-1 provider="gpu-1" attempt=1
//! [failed] request=req-1 provider="gpu-1" err="connection refused" attempt=1
//! [retry] request=req-1 delay=200ms after_attempt=1
//! [completed] request=req-1 provider="gpu-1" latency=84ms
//! [exhausted] request=req-1 err="connection refused"
//! [shutdown-requested]
//! [drained]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Constructs a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::RequestSubmitted => {
                if let (Some(req), Some(prio)) = (e.request, e.priority) {
                    println!("[submitted] request={req} priority={}", prio.as_label());
                }
            }
            EventKind::RequestStarting => {
                if let (Some(req), Some(att)) = (e.request, e.attempt) {
                    println!(
                        "[starting] request={req} provider={:?} attempt={att}",
                        e.provider
                    );
                }
            }
            EventKind::RequestCompleted => {
                println!(
                    "[completed] request={:?} provider={:?} latency={:?}ms",
                    e.request, e.provider, e.latency_ms
                );
            }
            EventKind::AttemptFailed => {
                println!(
                    "[failed] request={:?} provider={:?} err={:?} attempt={:?}",
                    e.request, e.provider, e.reason, e.attempt
                );
            }
            EventKind::RetryScheduled => {
                println!(
                    "[retry] request={:?} delay={:?}ms after_attempt={:?} err={:?}",
                    e.request, e.delay_ms, e.attempt, e.reason
                );
            }
            EventKind::RequestExhausted => {
                println!("[exhausted] request={:?} err={:?}", e.request, e.reason);
            }
            EventKind::RequestCancelled => {
                println!("[cancelled] request={:?}", e.request);
            }
            EventKind::ProvidersUnavailable => {
                println!("[no-providers] request={:?}", e.request);
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::Drained => {
                println!("[drained]");
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded]");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                println!("[subscriber-warning] reason={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
