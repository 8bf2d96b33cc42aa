//! # Priority queue for not-yet-started requests.
//!
//! This module provides:
//! - [`Priority`] - dispatch precedence classes
//! - [`PriorityQueue`] - ordered holding area, priority class then FIFO

mod priority;
#[allow(clippy::module_inception)]
mod queue;

pub use priority::Priority;
pub use queue::PriorityQueue;
