//! # Event subscribers for the dispatcher runtime.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling runtime events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   executor ── publish(Event) ──► Bus ──► dispatcher listener ──► SubscriberSet
//!                                                                      │
//!                                                      ┌───────────────┼───────────┐
//!                                                      ▼               ▼           ▼
//!                                               InflightTracker    LogWriter    custom
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** - observe and react (logging, metrics, alerts)
//! - **Stateful subscribers** - maintain state from events (InflightTracker)
//!
//! ## Implementing custom subscribers
//! ```
//! use async_trait::async_trait;
//! use taskrouter::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::AttemptFailed {
//!             // increment failure counter
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure_counter" }
//! }
//! ```

mod inflight;
#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

pub use inflight::InflightTracker;
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
