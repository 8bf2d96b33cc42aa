//! # The dispatch loop: tick- and wake-driven queue drain.
//!
//! The loop wakes on whichever comes first:
//! - the fixed tick interval (`Config::tick`), the safety net;
//! - the wake signal, notified by `submit`, by permit release, and by retry
//!   requeue.
//!
//! Each firing drains greedily: while the queue is non-empty and the
//! admission gate grants a permit, pop the next request and spawn its
//! execution. The loop never awaits an execution; a single firing may admit
//! several requests, bounded only by the remaining concurrency budget and
//! queue depth.
//!
//! ## Rules
//! - An empty queue is a no-op, not an error.
//! - Pop-once semantics upstream guarantee no double dispatch.
//! - Entries cancelled while pending fail the claim and are skipped; their
//!   permit is released immediately.
//! - A `NoProviderAvailable` requeue does not wake the loop, so an empty
//!   provider list retries on ticks instead of spinning.

use std::sync::Arc;

use tokio::time::{self, MissedTickBehavior};

use crate::core::dispatcher::Dispatcher;
use crate::core::executor;

/// Runs until shutdown is requested. Spawned once by `Dispatcher::start`.
pub(crate) async fn run_loop(dispatcher: Arc<Dispatcher>) {
    let token = dispatcher.shutdown_token.clone();
    let mut tick = time::interval(dispatcher.cfg.tick);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tick.tick() => {}
            _ = dispatcher.wake.notified() => {}
        }
        drain(&dispatcher).await;
    }
}

/// Admits as many queued requests as the concurrency budget allows.
async fn drain(dispatcher: &Arc<Dispatcher>) {
    loop {
        if dispatcher.queue.is_empty() {
            break;
        }
        let Some(permit) = dispatcher.admission.try_admit() else {
            break;
        };
        let Some(id) = dispatcher.queue.pop() else {
            break;
        };
        let Some(claimed) = dispatcher.claim(id).await else {
            // Cancelled while pending; the permit drops here, releasing it.
            continue;
        };
        let d = Arc::clone(dispatcher);
        dispatcher
            .tracker
            .spawn(executor::execute(d, claimed, permit));
    }
}
