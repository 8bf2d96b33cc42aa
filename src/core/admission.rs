//! # Admission control: the bounded-concurrency gate.
//!
//! [`Admission`] gates the transfer of requests from the queue to execution.
//! It wraps a [`tokio::sync::Semaphore`] sized to the configured maximum
//! concurrency; [`try_admit`](Admission::try_admit) hands out RAII
//! [`AdmissionPermit`]s.
//!
//! ## Rules
//! - `try_admit` succeeds iff in-flight < max concurrency; no side effect on
//!   refusal.
//! - Dropping the permit is the release; it happens exactly once per grant on
//!   every exit path (success, failure, requeue, cancellation discard), so
//!   the in-flight count can never leak or go negative.
//! - A refusal is internal control flow ("try again next tick"), never an
//!   error surfaced to callers.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded-concurrency gate.
pub(crate) struct Admission {
    sem: Arc<Semaphore>,
    max: usize,
}

/// RAII admission grant; dropping it releases the slot.
pub(crate) struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl Admission {
    /// Creates a gate with the given concurrency budget (clamped to >= 1).
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            sem: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Grants a permit iff a slot is free.
    pub fn try_admit(&self) -> Option<AdmissionPermit> {
        self.sem
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| AdmissionPermit { _permit: permit })
    }

    /// Number of requests currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.max - self.sem.available_permits()
    }

    /// The configured concurrency budget.
    pub fn max(&self) -> usize {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_clamped_to_one() {
        let gate = Admission::new(0);
        assert_eq!(gate.max(), 1);
    }

    #[test]
    fn test_admits_up_to_budget_then_refuses() {
        let gate = Admission::new(2);
        let a = gate.try_admit();
        let b = gate.try_admit();
        assert!(a.is_some());
        assert!(b.is_some());
        assert!(gate.try_admit().is_none());
        assert_eq!(gate.in_flight(), 2);
    }

    #[test]
    fn test_drop_releases_exactly_one_slot() {
        let gate = Admission::new(1);
        let permit = gate.try_admit().expect("free slot");
        assert_eq!(gate.in_flight(), 1);
        drop(permit);
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.try_admit().is_some());
    }

    #[test]
    fn test_in_flight_never_exceeds_budget() {
        let gate = Admission::new(3);
        let mut held = Vec::new();
        for _ in 0..10 {
            if let Some(p) = gate.try_admit() {
                held.push(p);
            }
            assert!(gate.in_flight() <= gate.max());
        }
        assert_eq!(held.len(), 3);
    }
}
