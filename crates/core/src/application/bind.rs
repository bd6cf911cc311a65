// Strict binding - queue rejection and operation failure reach the caller

use super::queue::entry::{run_operation, Settlement, Ticket};
use super::queue::BoundedSequentialQueue;
use crate::error::TaskError;
use crate::port::Operation;
use futures::FutureExt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

impl BoundedSequentialQueue {
    /// Wrap `op` so every call goes through this queue
    ///
    /// Overflow fails the call immediately with `TaskError::QueueFull`;
    /// the operation's own errors come back as `TaskError::Operation`.
    pub fn bind<O, A>(&self, op: O) -> Bound<O, A>
    where
        O: Operation<A> + 'static,
    {
        Bound {
            queue: self.clone(),
            op: Arc::new(op),
            _args: PhantomData,
        }
    }
}

/// An operation bound to a queue in strict mode
pub struct Bound<O, A> {
    queue: BoundedSequentialQueue,
    op: Arc<O>,
    _args: PhantomData<fn(A)>,
}

impl<O, A> Clone for Bound<O, A> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            op: Arc::clone(&self.op),
            _args: PhantomData,
        }
    }
}

impl<O, A> Bound<O, A>
where
    O: Operation<A> + 'static,
    A: Send + 'static,
    O::Output: Send + 'static,
    O::Error: Send + 'static,
{
    /// Submit one call
    ///
    /// Admission is decided here, not when the result is first polled, so
    /// call order is execution order. Dropping the returned future does not
    /// cancel an admitted call.
    pub fn call(&self, args: A) -> Pending<O::Output, O::Error> {
        let (tx, rx) = oneshot::channel();
        let op = Arc::clone(&self.op);

        let admitted = self.queue.admit(move || {
            async move {
                let outcome = run_operation(op, args).await;
                Settlement::new(outcome.is_ok(), move || {
                    // Receiver gone means the caller stopped listening
                    let _ = tx.send(outcome);
                })
            }
            .boxed()
        });

        match admitted {
            Some(ticket) => Pending {
                inner: PendingInner::Admitted { ticket, rx },
            },
            None => Pending {
                inner: PendingInner::Rejected,
            },
        }
    }

    pub fn queue(&self) -> &BoundedSequentialQueue {
        &self.queue
    }
}

/// Result of a strict call
///
/// Resolves to the operation's outcome, or to `TaskError::QueueFull`
/// without suspending when the call was not admitted.
#[must_use = "dropping a Pending discards the call's result (the call still runs)"]
pub struct Pending<T, E> {
    inner: PendingInner<T, E>,
}

enum PendingInner<T, E> {
    Admitted {
        ticket: Ticket,
        rx: oneshot::Receiver<Result<T, TaskError<E>>>,
    },
    Rejected,
}

impl<T, E> Pending<T, E> {
    /// True when the call overflowed the queue (known synchronously)
    pub fn is_rejected(&self) -> bool {
        matches!(self.inner, PendingInner::Rejected)
    }

    /// Admission number, if admitted
    pub fn ticket(&self) -> Option<Ticket> {
        match self.inner {
            PendingInner::Admitted { ticket, .. } => Some(ticket),
            PendingInner::Rejected => None,
        }
    }
}

impl<T, E> Future for Pending<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            PendingInner::Admitted { rx, .. } => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or_else(|_| Err(TaskError::Aborted))),
            PendingInner::Rejected => Poll::Ready(Err(TaskError::QueueFull)),
        }
    }
}
