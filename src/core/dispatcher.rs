//! # Dispatcher: the caller-facing owner of queue, registry, and execution.
//!
//! The [`Dispatcher`] owns the priority queue, the request status table, the
//! provider registry, the admission gate, the event bus, and a
//! [`SubscriberSet`]. It is constructed once by application startup code and
//! shared as `Arc<Dispatcher>`; there is no process-global instance.
//!
//! ## High-level architecture
//! ```text
//! submit(payload, priority) ──► status table + PriorityQueue ──► wake
//!                                                                 │
//!                  ┌──────────────────────────────────────────────┘
//!                  ▼
//!          dispatch loop (tick ∪ wake)
//!                  │  while queue non-empty && Admission grants
//!                  ▼
//!          executor::execute (one spawned task per admitted request)
//!                  │  select provider ► run ► classify ► stats
//!                  ▼
//!   Completed / requeue-with-backoff / Failed / cancelled discard
//!
//! Event flow:
//!   dispatcher/loop/executor ── publish ──► Bus ──► listener ──► SubscriberSet
//!                                                          (InflightTracker, LogWriter, ...)
//!
//! Shutdown path:
//!   shutdown():
//!     ├─ Bus.publish(ShutdownRequested), stop the dispatch loop
//!     ├─ TaskTracker::close() + wait, bounded by cfg.grace
//!     ├─ Ok (drained)      → Bus.publish(Drained)
//!     └─ grace exceeded    → Bus.publish(GraceExceeded)
//!                            (InflightTracker.snapshot() lists stuck ids)
//! ```
//!
//! ## Ordering guarantees
//! Within a priority class requests dispatch in submission order; across
//! classes the queue head is always the highest-priority pending request. An
//! admitted request is never preempted. Priority affects queue-exit order
//! only, never execution duration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use serde_json::Value;
use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::core::admission::Admission;
use crate::core::{dispatch, shutdown};
use crate::error::{DispatchError, QueryError, SubmitError};
use crate::events::{Bus, Event, EventKind};
use crate::providers::{ProviderRef, ProviderRegistry, ProviderStats};
use crate::queue::{Priority, PriorityQueue};
use crate::requests::{RequestId, RequestSnapshot, RequestStatus, TaskPayload};
use crate::subscribers::{InflightTracker, Subscribe, SubscriberSet};

/// Mutable per-request state, keyed by [`RequestId`] in the status table.
pub(crate) struct RequestEntry {
    pub payload: TaskPayload,
    pub priority: Priority,
    pub status: RequestStatus,
    pub created_at: SystemTime,
    pub started_at: Option<SystemTime>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub result: Option<Value>,
    pub error: Option<String>,
    /// Per-request cancellation token; child tokens are passed into provider
    /// calls so cancellation can reach an in-flight attempt cooperatively.
    pub cancel: CancellationToken,
}

/// Everything the executor needs to run one admitted request.
pub(crate) struct ClaimedRequest {
    pub id: RequestId,
    pub payload: TaskPayload,
    pub priority: Priority,
    pub retry_count: u32,
    pub cancel: CancellationToken,
}

/// Coordinates request intake, dispatch, provider execution, and shutdown.
pub struct Dispatcher {
    /// Global runtime configuration.
    pub(crate) cfg: Config,
    /// Event bus shared with the loop and executors.
    pub(crate) bus: Bus,
    /// Fan-out set for subscribers.
    pub(crate) subs: Arc<SubscriberSet>,
    /// In-flight tracker (same instance is in `subs`).
    pub(crate) inflight: Arc<InflightTracker>,
    /// Ordered holding area for pending requests.
    pub(crate) queue: PriorityQueue,
    /// Status table: every known request, active or terminal.
    pub(crate) requests: RwLock<HashMap<RequestId, RequestEntry>>,
    /// Provider list plus rolling stats.
    pub(crate) registry: ProviderRegistry,
    /// Bounded-concurrency gate.
    pub(crate) admission: Admission,
    /// Wake signal for the dispatch loop (submit, release, requeue).
    pub(crate) wake: Notify,
    /// Tracks spawned executor tasks for the shutdown drain.
    pub(crate) tracker: TaskTracker,
    /// Cancelled when shutdown begins; stops the dispatch loop.
    pub(crate) shutdown_token: CancellationToken,
    /// Monotonic count of dispatched execution attempts (round-robin input).
    pub(crate) dispatched: AtomicU64,
    started: AtomicBool,
}

impl Dispatcher {
    /// Creates a new dispatcher over the given providers.
    ///
    /// Must be called from within a Tokio runtime: subscriber workers are
    /// spawned here. The built-in [`InflightTracker`] is appended to the
    /// subscriber set automatically. `cfg.max_concurrent` is clamped to at
    /// least 1.
    pub fn new(
        cfg: Config,
        providers: Vec<ProviderRef>,
        mut subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity);
        let inflight = Arc::new(InflightTracker::new());
        subscribers.push(inflight.clone());
        let subs = Arc::new(SubscriberSet::new(subscribers));
        let admission = Admission::new(cfg.max_concurrent);

        Arc::new(Self {
            cfg,
            bus,
            subs,
            inflight,
            queue: PriorityQueue::new(),
            requests: RwLock::new(HashMap::new()),
            registry: ProviderRegistry::new(providers),
            admission,
            wake: Notify::new(),
            tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
            dispatched: AtomicU64::new(0),
            started: AtomicBool::new(false),
        })
    }

    /// Starts the dispatch loop and the subscriber listener.
    ///
    /// Idempotent; only the first call spawns anything.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, AtomicOrdering::SeqCst) {
            return;
        }
        self.subscriber_listener();
        let me = Arc::clone(self);
        tokio::spawn(dispatch::run_loop(me));
    }

    /// Enqueues one unit of work; returns immediately with its id.
    ///
    /// Fails only once shutdown has begun. The request enters the queue as
    /// `Pending` and is picked up by the dispatch loop when capacity allows.
    pub async fn submit(
        &self,
        payload: TaskPayload,
        priority: Priority,
    ) -> Result<RequestId, SubmitError> {
        if self.shutdown_token.is_cancelled() {
            return Err(SubmitError::ShuttingDown);
        }

        let id = RequestId::next();
        let entry = RequestEntry {
            payload,
            priority,
            status: RequestStatus::Pending,
            created_at: SystemTime::now(),
            started_at: None,
            retry_count: 0,
            max_retries: self.cfg.retry.max_retries,
            result: None,
            error: None,
            cancel: CancellationToken::new(),
        };
        self.requests.write().await.insert(id, entry);
        self.queue.push(id, priority);

        self.bus.publish(
            Event::now(EventKind::RequestSubmitted)
                .with_request(id)
                .with_priority(priority),
        );
        self.wake.notify_one();
        Ok(id)
    }

    /// Returns a point-in-time snapshot of a request.
    ///
    /// Idempotent: repeated calls without intervening state changes return
    /// identical results. Unknown ids yield [`QueryError::NotFound`].
    pub async fn status(&self, id: RequestId) -> Result<RequestSnapshot, QueryError> {
        let requests = self.requests.read().await;
        let entry = requests.get(&id).ok_or(QueryError::NotFound { id })?;
        Ok(RequestSnapshot {
            id,
            task: entry.payload.task().to_string(),
            priority: entry.priority,
            status: entry.status,
            created_at: entry.created_at,
            started_at: entry.started_at,
            retry_count: entry.retry_count,
            max_retries: entry.max_retries,
            result: entry.result.clone(),
            error: entry.error.clone(),
        })
    }

    /// Cancels a request (cooperative, best-effort).
    ///
    /// Returns `Ok(true)` if the request was newly cancelled, `Ok(false)` if
    /// it had already reached a terminal state. A pending entry is skipped
    /// when the queue pops it; a processing entry has its cancellation token
    /// cancelled, which reaches the provider call cooperatively. The
    /// in-flight call is not force-killed; the core only guarantees it makes
    /// no further observable state changes for this id.
    pub async fn cancel(&self, id: RequestId) -> Result<bool, QueryError> {
        let mut requests = self.requests.write().await;
        let entry = requests.get_mut(&id).ok_or(QueryError::NotFound { id })?;
        if entry.status.is_terminal() {
            return Ok(false);
        }
        entry.status = RequestStatus::Cancelled;
        entry.cancel.cancel();
        drop(requests);

        self.bus
            .publish(Event::now(EventKind::RequestCancelled).with_request(id));
        Ok(true)
    }

    /// Evicts a terminal request from the status table.
    ///
    /// Retention is caller discretion: the core keeps terminal entries until
    /// told otherwise. Returns `Ok(false)` (and keeps the entry) when the
    /// request has not finished yet.
    pub async fn forget(&self, id: RequestId) -> Result<bool, QueryError> {
        let mut requests = self.requests.write().await;
        let entry = requests.get(&id).ok_or(QueryError::NotFound { id })?;
        if !entry.status.is_terminal() {
            return Ok(false);
        }
        requests.remove(&id);
        drop(requests);
        self.inflight.forget(id).await;
        Ok(true)
    }

    /// Clones the current per-provider statistics.
    pub async fn stats(&self) -> Vec<ProviderStats> {
        self.registry.snapshot().await
    }

    /// Number of requests waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of requests currently processing.
    pub fn in_flight(&self) -> usize {
        self.admission.in_flight()
    }

    /// The effective concurrency budget (after clamping).
    pub fn max_concurrent(&self) -> usize {
        self.admission.max()
    }

    /// Stops dispatching and waits for in-flight requests to drain.
    ///
    /// New submissions are rejected from this point on. Queued requests stay
    /// `Pending`; only executions already admitted are awaited. If the drain
    /// exceeds `cfg.grace`, returns [`DispatchError::GraceExceeded`] listing
    /// the stuck request ids.
    pub async fn shutdown(&self) -> Result<(), DispatchError> {
        self.bus.publish(Event::now(EventKind::ShutdownRequested));
        self.shutdown_token.cancel();
        self.tracker.close();

        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                self.bus.publish(Event::now(EventKind::Drained));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::now(EventKind::GraceExceeded));
                let stuck = self.inflight.snapshot().await;
                Err(DispatchError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Convenience runner: starts the dispatcher, waits for an OS termination
    /// signal, then performs a graceful [`shutdown`](Self::shutdown).
    pub async fn run_until_signal(self: &Arc<Self>) -> Result<(), DispatchError> {
        self.start();
        let _ = shutdown::wait_for_shutdown_signal().await;
        self.shutdown().await
    }

    /// Subscribes to the bus and forwards events to the subscriber set
    /// (fire-and-forget).
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        });
    }

    /// Claims a popped request for execution: `Pending -> Processing`.
    ///
    /// Returns `None` for entries that were cancelled (or evicted) after
    /// entering the queue; the caller skips them, which implements lazy
    /// queue removal.
    pub(crate) async fn claim(&self, id: RequestId) -> Option<ClaimedRequest> {
        let mut requests = self.requests.write().await;
        let entry = requests.get_mut(&id)?;
        if entry.status != RequestStatus::Pending {
            return None;
        }
        entry.status = RequestStatus::Processing;
        Some(ClaimedRequest {
            id,
            payload: entry.payload.clone(),
            priority: entry.priority,
            retry_count: entry.retry_count,
            cancel: entry.cancel.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::{json, Value};
    use tokio::time;

    use super::*;
    use crate::balance::BalanceStrategy;
    use crate::error::ProviderError;
    use crate::policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
    use crate::providers::ProviderFn;

    fn test_config() -> Config {
        let mut cfg = Config::default();
        cfg.tick = Duration::from_millis(10);
        cfg.retry = RetryPolicy {
            max_retries: 3,
            backoff: BackoffPolicy {
                first: Duration::from_millis(5),
                max: Duration::from_millis(50),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
        };
        cfg
    }

    fn ok_provider(name: &'static str) -> ProviderRef {
        ProviderFn::arc(name, |payload: TaskPayload, _ctx| async move {
            Ok::<Value, ProviderError>(json!({ "task": payload.task() }))
        })
    }

    fn payload(task: &'static str) -> TaskPayload {
        TaskPayload::new(task, Value::Null)
    }

    async fn wait_for(
        d: &Arc<Dispatcher>,
        id: RequestId,
        want: RequestStatus,
    ) -> RequestSnapshot {
        for _ in 0..400 {
            let snap = d.status(id).await.expect("known id");
            if snap.status == want {
                return snap;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        panic!("request {id} never reached {want:?}");
    }

    #[tokio::test]
    async fn test_priority_classes_dispatch_in_order() {
        let mut cfg = test_config();
        cfg.max_concurrent = 1;

        let order = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen = Arc::clone(&order);
        let provider: ProviderRef = ProviderFn::arc("recorder", move |p: TaskPayload, _ctx| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(p.task().to_string());
                Ok::<Value, ProviderError>(Value::Null)
            }
        });

        let d = Dispatcher::new(cfg, vec![provider], Vec::new());
        // Submit before starting so the first drain sees all three queued.
        let low = d.submit(payload("low"), Priority::Low).await.unwrap();
        let crit = d
            .submit(payload("critical"), Priority::Critical)
            .await
            .unwrap();
        let norm = d.submit(payload("normal"), Priority::Normal).await.unwrap();
        d.start();

        for id in [low, crit, norm] {
            wait_for(&d, id, RequestStatus::Completed).await;
        }
        assert_eq!(*order.lock().unwrap(), vec!["critical", "normal", "low"]);
        d.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrency_bound_holds() {
        let mut cfg = test_config();
        cfg.max_concurrent = 2;

        let gauge = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (g, p) = (Arc::clone(&gauge), Arc::clone(&peak));
        let provider: ProviderRef = ProviderFn::arc("slow", move |_pl: TaskPayload, _ctx| {
            let (g, p) = (Arc::clone(&g), Arc::clone(&p));
            async move {
                let now = g.fetch_add(1, AtomicOrdering::SeqCst) + 1;
                p.fetch_max(now, AtomicOrdering::SeqCst);
                time::sleep(Duration::from_millis(20)).await;
                g.fetch_sub(1, AtomicOrdering::SeqCst);
                Ok::<Value, ProviderError>(Value::Null)
            }
        });

        let d = Dispatcher::new(cfg, vec![provider], Vec::new());
        d.start();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(d.submit(payload("job"), Priority::Normal).await.unwrap());
        }
        for id in ids {
            wait_for(&d, id, RequestStatus::Completed).await;
        }

        assert!(peak.load(AtomicOrdering::SeqCst) <= 2);
        assert_eq!(d.in_flight(), 0, "all permits released");
        d.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_always_failing_provider_exhausts_retries() {
        let mut cfg = test_config();
        cfg.max_concurrent = 1;
        cfg.retry.max_retries = 2;

        let provider: ProviderRef = ProviderFn::arc("broken", |_pl: TaskPayload, _ctx| async {
            Err::<Value, ProviderError>(ProviderError::Fail {
                error: "connection refused".into(),
            })
        });

        let d = Dispatcher::new(cfg, vec![provider], Vec::new());
        d.start();
        let id = d.submit(payload("doomed"), Priority::Normal).await.unwrap();

        let snap = wait_for(&d, id, RequestStatus::Failed).await;
        assert_eq!(snap.retry_count, 2);
        assert_eq!(snap.max_retries, 2);
        assert!(snap.error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(d.in_flight(), 0);

        // 1 initial attempt + 2 retries, all recorded as failures.
        let stats = d.stats().await;
        assert_eq!(stats[0].requests, 3);
        assert_eq!(stats[0].failures, 3);
        assert_eq!(stats[0].success_rate, 0.0);
        d.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_provider_list_keeps_request_pending() {
        let mut cfg = test_config();
        cfg.strategy = BalanceStrategy::LeastLoaded;

        let d = Dispatcher::new(cfg, Vec::new(), Vec::new());
        d.start();
        let id = d.submit(payload("stranded"), Priority::Normal).await.unwrap();

        // Several ticks pass; the request cycles queue -> claim -> requeue
        // and must never reach a terminal state or be dropped.
        for _ in 0..10 {
            time::sleep(Duration::from_millis(8)).await;
            let snap = d.status(id).await.unwrap();
            assert!(!snap.status.is_terminal(), "got {:?}", snap.status);
        }

        d.shutdown().await.unwrap();
        let snap = d.status(id).await.unwrap();
        assert_eq!(snap.status, RequestStatus::Pending);
        assert_eq!(snap.retry_count, 0, "selection failure consumes no retry");
    }

    #[tokio::test]
    async fn test_status_on_unknown_id_is_not_found() {
        let d = Dispatcher::new(test_config(), vec![ok_provider("idle")], Vec::new());
        let other = Dispatcher::new(test_config(), vec![ok_provider("other")], Vec::new());
        let foreign = other.submit(payload("elsewhere"), Priority::Low).await.unwrap();

        assert_eq!(
            d.status(foreign).await.unwrap_err(),
            QueryError::NotFound { id: foreign }
        );
    }

    #[tokio::test]
    async fn test_status_reads_are_idempotent() {
        let d = Dispatcher::new(test_config(), vec![ok_provider("idle")], Vec::new());
        // Loop not started: nothing mutates the request between reads.
        let id = d.submit(payload("job"), Priority::High).await.unwrap();

        let a = d.status(id).await.unwrap();
        let b = d.status(id).await.unwrap();
        assert_eq!(a.status, b.status);
        assert_eq!(a.retry_count, b.retry_count);
        assert_eq!(a.created_at, b.created_at);
        assert_eq!(a.started_at, b.started_at);
    }

    #[tokio::test]
    async fn test_cancel_pending_request_skips_execution() {
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        let provider: ProviderRef = ProviderFn::arc("counter", move |_pl: TaskPayload, _ctx| {
            let r = Arc::clone(&r);
            async move {
                r.fetch_add(1, AtomicOrdering::SeqCst);
                Ok::<Value, ProviderError>(Value::Null)
            }
        });

        let d = Dispatcher::new(test_config(), vec![provider], Vec::new());
        let id = d.submit(payload("job"), Priority::Normal).await.unwrap();
        assert!(d.cancel(id).await.unwrap());
        d.start();

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(d.status(id).await.unwrap().status, RequestStatus::Cancelled);
        assert_eq!(ran.load(AtomicOrdering::SeqCst), 0);

        // Cancelling a terminal request is a no-op.
        assert!(!d.cancel(id).await.unwrap());
        d.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_processing_request_is_cooperative() {
        let provider: ProviderRef = ProviderFn::arc("obedient", |_pl: TaskPayload, ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err::<Value, ProviderError>(ProviderError::Canceled)
        });

        let d = Dispatcher::new(test_config(), vec![provider], Vec::new());
        d.start();
        let id = d.submit(payload("job"), Priority::Normal).await.unwrap();

        wait_for(&d, id, RequestStatus::Processing).await;
        assert!(d.cancel(id).await.unwrap());
        let snap = wait_for(&d, id, RequestStatus::Cancelled).await;
        assert_eq!(snap.retry_count, 0);

        // The unwound attempt records neither success nor failure.
        d.shutdown().await.unwrap();
        let stats = d.stats().await;
        assert_eq!(stats[0].successes, 0);
        assert_eq!(stats[0].failures, 0);
        assert_eq!(d.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_fatal_error_fails_without_consuming_retries() {
        let provider: ProviderRef = ProviderFn::arc("fatal", |_pl: TaskPayload, _ctx| async {
            Err::<Value, ProviderError>(ProviderError::Fatal {
                error: "bad payload".into(),
            })
        });

        let d = Dispatcher::new(test_config(), vec![provider], Vec::new());
        d.start();
        let id = d.submit(payload("job"), Priority::Normal).await.unwrap();

        let snap = wait_for(&d, id, RequestStatus::Failed).await;
        assert_eq!(snap.retry_count, 0);
        d.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_attempt_timeout_is_retried_then_fails() {
        let mut cfg = test_config();
        cfg.timeout = Duration::from_millis(15);
        cfg.retry.max_retries = 1;

        let provider: ProviderRef = ProviderFn::arc("stuck", |_pl: TaskPayload, ctx: CancellationToken| async move {
            // Never returns on its own; honors cancellation.
            ctx.cancelled().await;
            Err::<Value, ProviderError>(ProviderError::Canceled)
        });

        let d = Dispatcher::new(cfg, vec![provider], Vec::new());
        d.start();
        let id = d.submit(payload("job"), Priority::Normal).await.unwrap();

        let snap = wait_for(&d, id, RequestStatus::Failed).await;
        assert_eq!(snap.retry_count, 1);
        assert!(snap.error.as_deref().unwrap().contains("timed out"));
        d.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_round_robin_spreads_attempts() {
        let mut cfg = test_config();
        cfg.max_concurrent = 1;
        cfg.strategy = BalanceStrategy::RoundRobin;

        let d = Dispatcher::new(
            cfg,
            vec![ok_provider("alpha"), ok_provider("beta")],
            Vec::new(),
        );
        d.start();
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(d.submit(payload("job"), Priority::Normal).await.unwrap());
        }
        for id in ids {
            wait_for(&d, id, RequestStatus::Completed).await;
        }

        let stats = d.stats().await;
        assert_eq!(stats[0].requests, 2);
        assert_eq!(stats[1].requests, 2);
        d.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_completed_request_retains_result() {
        let d = Dispatcher::new(test_config(), vec![ok_provider("echo")], Vec::new());
        d.start();
        let id = d.submit(payload("render"), Priority::Normal).await.unwrap();

        let snap = wait_for(&d, id, RequestStatus::Completed).await;
        assert_eq!(snap.result, Some(json!({ "task": "render" })));
        assert!(snap.started_at.is_some());
        assert!(snap.error.is_none());
        d.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_in_flight_then_rejects_submissions() {
        let mut cfg = test_config();
        cfg.max_concurrent = 3;

        let provider: ProviderRef = ProviderFn::arc("slow", |_pl: TaskPayload, _ctx| async {
            time::sleep(Duration::from_millis(30)).await;
            Ok::<Value, ProviderError>(Value::Null)
        });

        let d = Dispatcher::new(cfg, vec![provider], Vec::new());
        d.start();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(d.submit(payload("job"), Priority::Normal).await.unwrap());
        }
        // Let the loop admit them before shutting down.
        time::sleep(Duration::from_millis(15)).await;

        d.shutdown().await.unwrap();
        for id in ids {
            assert_eq!(d.status(id).await.unwrap().status, RequestStatus::Completed);
        }
        assert_eq!(
            d.submit(payload("late"), Priority::Normal).await.unwrap_err(),
            SubmitError::ShuttingDown
        );
    }

    #[tokio::test]
    async fn test_forget_evicts_only_terminal_requests() {
        let d = Dispatcher::new(test_config(), vec![ok_provider("echo")], Vec::new());
        let id = d.submit(payload("job"), Priority::Normal).await.unwrap();

        // Still pending: kept.
        assert!(!d.forget(id).await.unwrap());

        d.start();
        wait_for(&d, id, RequestStatus::Completed).await;
        assert!(d.forget(id).await.unwrap());
        assert_eq!(
            d.status(id).await.unwrap_err(),
            QueryError::NotFound { id }
        );
        d.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_retry_requeue_keeps_original_priority() {
        let mut cfg = test_config();
        cfg.max_concurrent = 1;
        cfg.retry.max_retries = 1;

        let failures = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&failures);
        let provider: ProviderRef = ProviderFn::arc("flaky", move |_pl: TaskPayload, _ctx| {
            let f = Arc::clone(&f);
            async move {
                if f.fetch_add(1, AtomicOrdering::SeqCst) == 0 {
                    Err(ProviderError::Fail {
                        error: "first attempt fails".into(),
                    })
                } else {
                    Ok(Value::Null)
                }
            }
        });

        let d = Dispatcher::new(cfg, vec![provider], Vec::new());
        d.start();
        let id = d.submit(payload("job"), Priority::Critical).await.unwrap();

        let snap = wait_for(&d, id, RequestStatus::Completed).await;
        assert_eq!(snap.retry_count, 1);
        assert_eq!(snap.priority, Priority::Critical);
        d.shutdown().await.unwrap();
    }
}
