// Bounded Sequential Queue - admission, state and accessors

mod drain;
pub(crate) mod entry;
mod panic_guard;

pub use entry::Ticket;

use crate::domain::queue::DEFAULT_QUEUE_NAME;
use crate::domain::{Capacity, QueueConfig, QueueName};
use crate::error::{QueueError, Result};
use entry::{Entry, Task};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Point-in-time view of a queue's bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub capacity: usize,
    /// Pending + executing entries
    pub occupied: usize,
    pub pending: usize,
    pub executing: bool,
    pub admitted: u64,
    pub rejected: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Bounded FIFO that runs at most one call at a time
///
/// Capacity counts the executing entry together with the pending ones: a
/// queue of capacity 1 rejects a second call while the first is running.
/// Calls over capacity fail immediately with
/// [`TaskError::QueueFull`](crate::error::TaskError::QueueFull) instead of
/// waiting.
///
/// Handles are cheap to clone; clones share one queue. Separate `new`
/// calls are fully isolated.
///
/// # Example
/// ```text
/// let queue = BoundedSequentialQueue::new(2)?;
/// let fetch = queue.bind(|id: u64| async move { api.fetch(id).await });
///
/// let first = fetch.call(1);   // runs now
/// let second = fetch.call(2);  // waits for `first`
/// let third = fetch.call(3);   // rejected: "Queue limit reached"
/// ```
#[derive(Clone)]
pub struct BoundedSequentialQueue {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    name: QueueName,
    capacity: Capacity,
    runtime: Handle,
    state: Mutex<QueueState>,
    idle: Notify,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Entry>,
    executing: bool,
    next_ticket: Ticket,
    admitted: u64,
    rejected: u64,
    succeeded: u64,
    failed: u64,
}

impl QueueState {
    fn occupied(&self) -> usize {
        self.pending.len() + usize::from(self.executing)
    }
}

impl BoundedSequentialQueue {
    /// Create an empty queue holding at most `capacity` calls
    ///
    /// Must be called from within a Tokio runtime; the drain loop is
    /// spawned onto it.
    ///
    /// # Errors
    /// - `QueueError::InvalidCapacity` if `capacity` is 0
    /// - `QueueError::NoRuntime` outside a Tokio runtime
    pub fn new(capacity: usize) -> Result<Self> {
        Self::build(DEFAULT_QUEUE_NAME.to_string(), Capacity::new(capacity)?)
    }

    /// Create a queue from configuration (validated)
    pub fn from_config(config: &QueueConfig) -> Result<Self> {
        config.validate()?;
        Self::build(config.name.clone(), config.capacity)
    }

    fn build(name: QueueName, capacity: Capacity) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        info!(queue = %name, capacity = %capacity, "Queue created");

        Ok(Self {
            shared: Arc::new(Shared {
                name,
                capacity,
                runtime,
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity.get()
    }

    /// Pending + executing entries right now
    pub fn occupied(&self) -> usize {
        self.shared.lock().occupied()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.shared.lock();
        QueueStats {
            capacity: self.capacity(),
            occupied: state.occupied(),
            pending: state.pending.len(),
            executing: state.executing,
            admitted: state.admitted,
            rejected: state.rejected,
            succeeded: state.succeeded,
            failed: state.failed,
        }
    }

    /// Wait until every admitted entry has settled
    pub async fn idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.occupied() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Admission check (atomic with the enqueue)
    ///
    /// `build` creates the entry's task; it is only called once the call
    /// is admitted. Returns `None` when the queue is full.
    pub(crate) fn admit<F>(&self, build: F) -> Option<Ticket>
    where
        F: FnOnce() -> Task,
    {
        let mut state = self.shared.lock();
        let occupied = state.occupied();
        let capacity = self.shared.capacity.get();

        if occupied >= capacity {
            state.rejected += 1;
            drop(state);
            warn!(
                queue = %self.shared.name,
                occupied,
                capacity,
                "Queue limit reached, rejecting call"
            );
            return None;
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.admitted += 1;
        let entry = Entry::new(ticket, build());

        if state.executing {
            state.pending.push_back(entry);
            debug!(
                queue = %self.shared.name,
                ticket,
                occupied = occupied + 1,
                "Entry queued"
            );
            return Some(ticket);
        }

        // Idle slot: hand the entry straight to a new drain task
        state.executing = true;
        drop(state);
        debug!(queue = %self.shared.name, ticket, "Entry admitted to idle slot");

        // Prefer the caller's runtime; the one the queue was built on may be gone
        let runtime = Handle::try_current().unwrap_or_else(|_| self.shared.runtime.clone());
        runtime.spawn(drain::drain(Arc::clone(&self.shared), entry));

        Some(ticket)
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Bookkeeping never panics mid-update, so a poisoned lock is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Account for a settled entry and pick the next one, if any
    ///
    /// Keeps the slot claimed when handing over to the next entry; marks it
    /// idle only when nothing is pending.
    fn release(&self, ticket: Ticket, succeeded: bool) -> Option<Entry> {
        let mut state = self.lock();
        if succeeded {
            state.succeeded += 1;
        } else {
            state.failed += 1;
        }

        let next = state.pending.pop_front();
        if next.is_none() {
            state.executing = false;
        }
        debug!(
            queue = %self.name,
            ticket,
            occupied = state.occupied(),
            "Slot released"
        );
        next
    }

    /// Give up the slot after its drain task was dropped mid-flight
    ///
    /// Counts the in-flight entry and every pending one as failed and hands
    /// the pending entries back so the caller can drop them outside the lock.
    fn abandon(&self) -> VecDeque<Entry> {
        let mut state = self.lock();
        let abandoned = std::mem::take(&mut state.pending);
        state.failed += abandoned.len() as u64 + 1;
        state.executing = false;
        abandoned
    }
}

impl std::fmt::Debug for BoundedSequentialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedSequentialQueue")
            .field("name", &self.shared.name)
            .field("capacity", &self.shared.capacity)
            .field("occupied", &self.occupied())
            .finish()
    }
}
