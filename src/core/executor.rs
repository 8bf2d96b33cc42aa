//! # Execute one admitted request against a selected provider.
//!
//! One call of [`execute`] corresponds to one `Processing` request holding
//! one admission permit. The flow:
//!
//! ```text
//! select provider (strategy over stats snapshot)
//!   │
//!   ├─ NoProviderAvailable ──► requeue as Pending, release permit
//!   │                          (retried on a later tick, no wake)
//!   ▼
//! publish RequestStarting ──► provider.execute() with optional timeout
//!   │
//!   ├─ Ok(value) ──► stats success ──► Completed, publish RequestCompleted
//!   ├─ Err(retryable), budget left ──► stats failure ──► retry_count += 1,
//!   │       Pending; publish AttemptFailed + RetryScheduled; detached
//!   │       backoff sleep, then requeue at the original priority
//!   ├─ Err(other/exhausted) ──► stats failure ──► Failed,
//!   │       publish AttemptFailed + RequestExhausted
//!   └─ cancelled mid-flight ──► discard: no further state changes
//! ```
//!
//! ## Rules
//! - The permit is released on **every** exit path; the backoff delay never
//!   holds a concurrency slot (the sleep runs in a detached task).
//! - Stats are recorded for every real attempt; a cancelled attempt records
//!   nothing.
//! - Timeouts cancel the attempt's child token and count as retryable
//!   failures.
//! - A request found cancelled when the outcome is applied is discarded
//!   without further observable changes.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use serde_json::Value;
use tokio::time;

use crate::core::admission::AdmissionPermit;
use crate::core::dispatcher::{ClaimedRequest, Dispatcher};
use crate::error::ProviderError;
use crate::events::{Event, EventKind};
use crate::providers::Provider;
use crate::requests::RequestStatus;

/// Outcome applied to the status table, computed under the table lock.
enum Applied {
    Completed,
    Cancelled,
    Retry { delay: Duration, reason: String },
    Exhausted { reason: String },
    Discarded,
}

/// Runs one admitted request to an outcome. Spawned by the dispatch loop.
pub(crate) async fn execute(
    dispatcher: Arc<Dispatcher>,
    claimed: ClaimedRequest,
    permit: AdmissionPermit,
) {
    let n = dispatcher
        .dispatched
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

    let snapshot = dispatcher.registry.snapshot().await;
    let idx = match dispatcher.cfg.strategy.select(&snapshot, n) {
        Ok(idx) => idx,
        Err(_) => {
            dispatcher
                .bus
                .publish(Event::now(EventKind::ProvidersUnavailable).with_request(claimed.id));
            requeue_unstarted(&dispatcher, &claimed).await;
            drop(permit);
            return;
        }
    };
    let provider = Arc::clone(dispatcher.registry.provider(idx));
    let attempt = claimed.retry_count + 1;

    mark_started(&dispatcher, &claimed).await;
    dispatcher.bus.publish(
        Event::now(EventKind::RequestStarting)
            .with_request(claimed.id)
            .with_provider(provider.name())
            .with_attempt(attempt),
    );

    let child = claimed.cancel.child_token();
    let timer = Instant::now();
    let res = match dispatcher.cfg.attempt_timeout() {
        Some(dur) => match time::timeout(dur, provider.execute(&claimed.payload, child.clone()))
            .await
        {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                Err(ProviderError::Timeout { timeout: dur })
            }
        },
        None => provider.execute(&claimed.payload, child.clone()).await,
    };
    let latency = timer.elapsed();

    // Stats are provider-scoped: every real attempt counts, cancellations
    // record nothing.
    match &res {
        Ok(_) => dispatcher.registry.record_success(idx, latency).await,
        Err(ProviderError::Canceled) => {}
        Err(_) => dispatcher.registry.record_failure(idx).await,
    }

    let applied = apply_outcome(&dispatcher, &claimed, res).await;
    report(&dispatcher, &claimed, provider.name(), attempt, latency, applied);

    drop(permit);
    dispatcher.wake.notify_one();
}

/// Applies the attempt outcome to the status table.
async fn apply_outcome(
    dispatcher: &Arc<Dispatcher>,
    claimed: &ClaimedRequest,
    res: Result<Value, ProviderError>,
) -> Applied {
    let mut requests = dispatcher.requests.write().await;
    let Some(entry) = requests.get_mut(&claimed.id) else {
        return Applied::Discarded;
    };
    if entry.status != RequestStatus::Processing {
        // Cancelled mid-flight: no further observable changes for this id.
        return Applied::Discarded;
    }

    match res {
        Ok(value) => {
            entry.status = RequestStatus::Completed;
            entry.result = Some(value);
            Applied::Completed
        }
        Err(ProviderError::Canceled) => {
            entry.status = RequestStatus::Cancelled;
            Applied::Cancelled
        }
        Err(e) => {
            let reason = e.to_string();
            if e.is_retryable() && entry.retry_count < entry.max_retries {
                let delay = dispatcher.cfg.retry.backoff.next(entry.retry_count);
                entry.retry_count += 1;
                entry.status = RequestStatus::Pending;
                Applied::Retry { delay, reason }
            } else {
                entry.status = RequestStatus::Failed;
                entry.error = Some(reason.clone());
                Applied::Exhausted { reason }
            }
        }
    }
}

/// Publishes the outcome events and schedules the requeue when retrying.
fn report(
    dispatcher: &Arc<Dispatcher>,
    claimed: &ClaimedRequest,
    provider: &str,
    attempt: u32,
    latency: Duration,
    applied: Applied,
) {
    match applied {
        Applied::Completed => {
            dispatcher.bus.publish(
                Event::now(EventKind::RequestCompleted)
                    .with_request(claimed.id)
                    .with_provider(provider)
                    .with_latency(latency),
            );
        }
        Applied::Cancelled => {
            dispatcher
                .bus
                .publish(Event::now(EventKind::RequestCancelled).with_request(claimed.id));
        }
        Applied::Retry { delay, reason } => {
            dispatcher.bus.publish(
                Event::now(EventKind::AttemptFailed)
                    .with_request(claimed.id)
                    .with_provider(provider)
                    .with_attempt(attempt)
                    .with_reason(reason.clone()),
            );
            dispatcher.bus.publish(
                Event::now(EventKind::RetryScheduled)
                    .with_request(claimed.id)
                    .with_attempt(attempt)
                    .with_delay(delay)
                    .with_reason(reason),
            );
            schedule_requeue(dispatcher, claimed, delay);
        }
        Applied::Exhausted { reason } => {
            dispatcher.bus.publish(
                Event::now(EventKind::AttemptFailed)
                    .with_request(claimed.id)
                    .with_provider(provider)
                    .with_attempt(attempt)
                    .with_reason(reason.clone()),
            );
            dispatcher.bus.publish(
                Event::now(EventKind::RequestExhausted)
                    .with_request(claimed.id)
                    .with_attempt(attempt)
                    .with_reason(reason),
            );
        }
        Applied::Discarded => {}
    }
}

/// Waits out the backoff, then re-enqueues at the original priority.
///
/// Detached from the admission permit on purpose: the delay never holds a
/// concurrency slot. Shutdown short-circuits the sleep so the id is not
/// stranded outside both queue and table.
fn schedule_requeue(dispatcher: &Arc<Dispatcher>, claimed: &ClaimedRequest, delay: Duration) {
    let d = Arc::clone(dispatcher);
    let id = claimed.id;
    let priority = claimed.priority;
    tokio::spawn(async move {
        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        tokio::select! {
            _ = &mut sleep => {}
            _ = d.shutdown_token.cancelled() => {}
        }
        d.queue.push(id, priority);
        d.wake.notify_one();
    });
}

/// Records the execution-start timestamp, first dispatch only.
async fn mark_started(dispatcher: &Arc<Dispatcher>, claimed: &ClaimedRequest) {
    let mut requests = dispatcher.requests.write().await;
    if let Some(entry) = requests.get_mut(&claimed.id) {
        entry.started_at.get_or_insert_with(SystemTime::now);
    }
}

/// Returns a never-started request to the queue (selection failed).
///
/// Deliberately does not wake the loop: with no providers registered, the
/// retry happens on the next tick instead of spinning hot.
async fn requeue_unstarted(dispatcher: &Arc<Dispatcher>, claimed: &ClaimedRequest) {
    {
        let mut requests = dispatcher.requests.write().await;
        let Some(entry) = requests.get_mut(&claimed.id) else {
            return;
        };
        if entry.status != RequestStatus::Processing {
            return;
        }
        entry.status = RequestStatus::Pending;
    }
    dispatcher.queue.push(claimed.id, claimed.priority);
}
