//! # taskrouter
//!
//! **Taskrouter** is a lightweight request-dispatch library for Rust.
//!
//! It accepts heterogeneous work items destined for external compute
//! providers, holds them in a priority queue, and releases them for execution
//! under a bounded concurrency budget, while load-balancing across providers,
//! tracking their live performance, and retrying failures with backoff. The
//! crate is designed as a building block: the surrounding application submits
//! work and polls status; everything else stays out of its way.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ TaskPayload  │   │ TaskPayload  │   │ TaskPayload  │
//!     │ (request #1) │   │ (request #2) │   │ (request #3) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ submit()         ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Dispatcher                                                       │
//! │  - PriorityQueue (priority class, then FIFO)                      │
//! │  - status table (RequestId → status/retries/result)               │
//! │  - Admission (bounded concurrency, RAII permits)                  │
//! │  - ProviderRegistry (backends + rolling stats)                    │
//! │  - Bus (broadcast events) + SubscriberSet (fan-out)               │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        ▼ dispatch loop (tick ∪ wake), greedy drain
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   executor   │   │   executor   │   │   executor   │
//!     │ (1 request)  │   │ (1 request)  │   │ (1 request)  │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ BalanceStrategy picks a provider per attempt
//!      ▼                  ▼                  ▼
//!   Provider A         Provider B         Provider C
//!      │                  │                  │
//!      └── record_success / record_failure ──┘   (ProviderStats)
//! ```
//!
//! ### Request lifecycle
//! ```text
//! submit(payload, priority) ──► Pending (queued)
//!
//! dispatch tick/wake:
//!   ├─► Admission.try_admit()  ── no permit ──► stays queued
//!   ├─► BalanceStrategy.select(stats)
//!   │     └─ NoProviderAvailable ─► requeued for a later tick
//!   ├─► Processing: provider.execute(payload, token), timed
//!   │       ├─ Ok        ─► Completed (result retained)
//!   │       ├─ Err, retry budget left
//!   │       │             ─► retry_count += 1, backoff sleep, requeue
//!   │       │                (permit released before the sleep)
//!   │       └─ Err, budget exhausted or fatal ─► Failed
//!   └─► cancel(id) at any non-terminal point ─► Cancelled (cooperative)
//!
//! shutdown(): stop the loop, drain in-flight within grace,
//!             report stuck ids if the grace period is exceeded
//! ```
//!
//! ## Features
//! | Area             | Description                                            | Key types / traits                       |
//! |------------------|--------------------------------------------------------|------------------------------------------|
//! | **Dispatch**     | Priority queue, bounded concurrency, greedy drain.     | [`Dispatcher`], [`Priority`]             |
//! | **Providers**    | Opaque async backends with rolling statistics.         | [`Provider`], [`ProviderFn`], [`ProviderStats`] |
//! | **Balancing**    | Strategy-driven provider selection.                    | [`BalanceStrategy`]                      |
//! | **Retries**      | Ceiling + exponential backoff with optional jitter.    | [`RetryPolicy`], [`BackoffPolicy`], [`JitterPolicy`] |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics).        | [`Subscribe`], [`SubscriberSet`]         |
//! | **Errors**       | Typed errors for providers, selection, and queries.    | [`ProviderError`], [`SelectError`], [`QueryError`] |
//! | **Configuration**| Centralized runtime settings.                          | [`Config`]                               |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use serde_json::{json, Value};
//! use taskrouter::{
//!     Config, Dispatcher, Priority, ProviderError, ProviderFn, ProviderRef,
//!     RequestStatus, TaskPayload,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.max_concurrent = 2;
//!     cfg.tick = Duration::from_millis(10);
//!
//!     // An opaque backend: taskrouter never inspects payload or result.
//!     let local: ProviderRef =
//!         ProviderFn::arc("local", |payload: TaskPayload, _ctx| async move {
//!             Ok::<Value, ProviderError>(json!({ "task": payload.task(), "ok": true }))
//!         });
//!
//!     let dispatcher = Dispatcher::new(cfg, vec![local], Vec::new());
//!     dispatcher.start();
//!
//!     let id = dispatcher
//!         .submit(TaskPayload::new("render", json!({ "frame": 1 })), Priority::High)
//!         .await?;
//!
//!     let mut done = false;
//!     for _ in 0..200 {
//!         if dispatcher.status(id).await?.status == RequestStatus::Completed {
//!             done = true;
//!             break;
//!         }
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!     }
//!     assert!(done);
//!
//!     dispatcher.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod balance;
mod config;
mod core;
mod error;
mod events;
mod policies;
mod providers;
mod queue;
mod requests;
mod subscribers;

// ---- Public re-exports ----

pub use balance::BalanceStrategy;
pub use config::Config;
pub use core::Dispatcher;
pub use error::{DispatchError, ProviderError, QueryError, SelectError, SubmitError};
pub use events::{Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use providers::{Provider, ProviderFn, ProviderRef, ProviderStats};
pub use queue::Priority;
pub use requests::{RequestId, RequestSnapshot, RequestStatus, TaskPayload};
pub use subscribers::{InflightTracker, Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
