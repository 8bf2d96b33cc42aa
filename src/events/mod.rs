//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the dispatcher, the
//! dispatch loop, the executor, and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Dispatcher` (submit/cancel/shutdown), the dispatch
//!   loop, `core::executor`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the dispatcher's subscriber listener, which fans out to
//!   `SubscriberSet` (including the built-in `InflightTracker`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
