//! # Request data model.
//!
//! This module provides the request-related types:
//! - [`RequestId`] - opaque handle returned by submission
//! - [`TaskPayload`] - task name plus opaque JSON input and options
//! - [`RequestStatus`] - lifecycle state machine
//! - [`RequestSnapshot`] - point-in-time view returned by status queries

mod payload;
mod request;

pub use payload::TaskPayload;
pub use request::{RequestId, RequestSnapshot, RequestStatus};
