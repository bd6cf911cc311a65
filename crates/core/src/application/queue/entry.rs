// Queue Entry - one admitted call awaiting or undergoing execution

use super::panic_guard::panic_message;
use crate::error::TaskError;
use crate::port::Operation;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::time::Instant;

/// Monotonic per-queue admission number
pub type Ticket = u64;

/// Type-erased execution of one call; resolves once the operation settled
pub(crate) type Task = BoxFuture<'static, Settlement>;

pub(crate) struct Entry {
    pub(crate) ticket: Ticket,
    pub(crate) admitted_at: Instant,
    pub(crate) task: Task,
}

impl Entry {
    pub(crate) fn new(ticket: Ticket, task: Task) -> Self {
        Self {
            ticket,
            admitted_at: Instant::now(),
            task,
        }
    }
}

/// Outcome of a finished operation, not yet delivered to its caller
///
/// Delivery is deferred so the queue can release the slot first: a caller
/// woken by its result always sees the freed capacity.
pub(crate) struct Settlement {
    pub(crate) succeeded: bool,
    deliver: Box<dyn FnOnce() + Send>,
}

impl Settlement {
    pub(crate) fn new(succeeded: bool, deliver: impl FnOnce() + Send + 'static) -> Self {
        Self {
            succeeded,
            deliver: Box::new(deliver),
        }
    }

    /// Fulfill or reject the caller's result (exactly once)
    pub(crate) fn settle(self) {
        (self.deliver)()
    }
}

/// Run `op(args)` in its own task so a panic cannot take the drain loop down
pub(crate) async fn run_operation<O, A>(
    op: Arc<O>,
    args: A,
) -> Result<O::Output, TaskError<O::Error>>
where
    O: Operation<A> + 'static,
    A: Send + 'static,
    O::Output: Send + 'static,
    O::Error: Send + 'static,
{
    match tokio::spawn(async move { op.invoke(args).await }).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TaskError::Operation(e)),
        Err(join_err) if join_err.is_panic() => {
            Err(TaskError::Panicked(panic_message(join_err.into_panic().as_ref())))
        }
        Err(_) => Err(TaskError::Aborted),
    }
}
