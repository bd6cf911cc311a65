// Drain Loop - the queue's single execution slot

use super::entry::Entry;
use super::panic_guard::{execute_guarded, PanicGuardResult};
use super::Shared;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Run entries one at a time, in admission order, until the queue is empty
///
/// Spawned by admission when it claims an idle slot; exits after marking
/// the slot idle again. At most one drain task exists per queue.
///
/// The slot guard is created before the future so that a task dropped
/// without ever being polled (spawn onto a runtime that is shutting down)
/// still gives the slot back.
pub(super) fn drain(shared: Arc<Shared>, first: Entry) -> impl Future<Output = ()> + Send {
    let slot = SlotGuard::new(shared);

    async move {
        let mut current = Some(first);

        while let Some(entry) = current.take() {
            let Entry {
                ticket,
                admitted_at,
                task,
            } = entry;
            let shared = &slot.shared;

            debug!(
                queue = %shared.name,
                ticket,
                waited_ms = admitted_at.elapsed().as_millis() as u64,
                "Dispatching entry"
            );
            let started = Instant::now();

            let settlement = task.await;

            // Free the slot (and claim the next entry) before the caller is woken
            current = shared.release(ticket, settlement.succeeded);

            debug!(
                queue = %shared.name,
                ticket,
                succeeded = settlement.succeeded,
                duration_ms = started.elapsed().as_millis() as u64,
                "Entry settled"
            );

            if let PanicGuardResult::Panicked(msg) =
                execute_guarded(AssertUnwindSafe(move || settlement.settle()))
            {
                error!(queue = %shared.name, ticket, panic_msg = %msg, "Result delivery panicked");
            }
        }

        slot.finish();
    }
}

/// Owns the claimed execution slot for the lifetime of one drain task
///
/// Dropped without `finish` (the runtime dropped the task mid-flight), it
/// marks the slot idle and discards every pending entry. Each discarded
/// caller then observes `TaskError::Aborted`.
struct SlotGuard {
    shared: Arc<Shared>,
    finished: bool,
}

impl SlotGuard {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            finished: false,
        }
    }

    /// Normal exit: `release` already marked the slot idle
    fn finish(mut self) {
        self.finished = true;
        self.shared.idle.notify_waiters();
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let abandoned = self.shared.abandon();
        warn!(
            queue = %self.shared.name,
            abandoned = abandoned.len() + 1,
            "Drain task dropped before the queue emptied, aborting remaining entries"
        );
        // Entries are dropped outside the lock: supervised ones call their handler
        drop(abandoned);
        self.shared.idle.notify_waiters();
    }
}
