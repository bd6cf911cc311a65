// Supervised binding - failures go to an error handler, never to the caller

use super::queue::entry::{run_operation, Settlement, Ticket};
use super::queue::BoundedSequentialQueue;
use crate::error::TaskError;
use crate::port::{ErrorHandler, Operation};
use futures::FutureExt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::debug;

impl BoundedSequentialQueue {
    /// Wrap `op` so every call goes through this queue, diverting failures
    ///
    /// Overflow and operation failures (including panics) are handed to
    /// `handler` exactly once; the caller's future then resolves to `None`.
    /// Suited to fire-and-forget callers.
    pub fn bind_safe<O, A, H>(&self, op: O, handler: H) -> SafeBound<O, A, H>
    where
        O: Operation<A> + 'static,
        H: ErrorHandler<O::Error> + 'static,
    {
        SafeBound {
            queue: self.clone(),
            op: Arc::new(op),
            handler: Arc::new(handler),
            _args: PhantomData,
        }
    }
}

/// An operation bound to a queue in supervised mode
pub struct SafeBound<O, A, H> {
    queue: BoundedSequentialQueue,
    op: Arc<O>,
    handler: Arc<H>,
    _args: PhantomData<fn(A)>,
}

impl<O, A, H> Clone for SafeBound<O, A, H> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            op: Arc::clone(&self.op),
            handler: Arc::clone(&self.handler),
            _args: PhantomData,
        }
    }
}

impl<O, A, H> SafeBound<O, A, H>
where
    O: Operation<A> + 'static,
    A: Send + 'static,
    O::Output: Send + 'static,
    O::Error: Send + 'static,
    H: ErrorHandler<O::Error> + 'static,
{
    /// Submit one call
    ///
    /// On overflow the handler runs before this returns.
    pub fn call(&self, args: A) -> SafePending<O::Output> {
        let (tx, rx) = oneshot::channel();
        let op = Arc::clone(&self.op);
        let handler = Arc::clone(&self.handler);

        let admitted = self.queue.admit(move || {
            // Built outside the future so an entry dropped before its first
            // poll still reports `Aborted`
            let diversion = Diversion::<H, O::Error>::new(handler);
            async move {
                match run_operation(op, args).await {
                    Ok(value) => Settlement::new(true, move || {
                        diversion.disarm();
                        let _ = tx.send(Some(value));
                    }),
                    Err(error) => Settlement::new(false, move || {
                        diversion.divert(error);
                        let _ = tx.send(None);
                    }),
                }
            }
            .boxed()
        });

        match admitted {
            Some(ticket) => SafePending {
                inner: SafeInner::Admitted { ticket, rx },
            },
            None => {
                self.handler.handle(TaskError::QueueFull);
                SafePending {
                    inner: SafeInner::Rejected,
                }
            }
        }
    }

    pub fn queue(&self) -> &BoundedSequentialQueue {
        &self.queue
    }
}

/// Hands an entry's failure to the handler exactly once
///
/// If the entry is dropped before settling (runtime shutdown), the handler
/// receives `TaskError::Aborted` instead.
struct Diversion<H, E>
where
    H: ErrorHandler<E>,
{
    handler: Option<Arc<H>>,
    _error: PhantomData<fn(E)>,
}

impl<H, E> Diversion<H, E>
where
    H: ErrorHandler<E>,
{
    fn new(handler: Arc<H>) -> Self {
        Self {
            handler: Some(handler),
            _error: PhantomData,
        }
    }

    fn divert(mut self, error: TaskError<E>) {
        if let Some(handler) = self.handler.take() {
            handler.handle(error);
        }
    }

    fn disarm(mut self) {
        self.handler = None;
    }
}

impl<H, E> Drop for Diversion<H, E>
where
    H: ErrorHandler<E>,
{
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            debug!("Supervised entry dropped before settling");
            handler.handle(TaskError::Aborted);
        }
    }
}

/// Result of a supervised call: `Some(value)` on success, `None` when the
/// failure was diverted to the error handler
#[must_use = "dropping a SafePending discards the call's result (the call still runs)"]
pub struct SafePending<T> {
    inner: SafeInner<T>,
}

enum SafeInner<T> {
    Admitted {
        ticket: Ticket,
        rx: oneshot::Receiver<Option<T>>,
    },
    Rejected,
}

impl<T> SafePending<T> {
    /// True when the call overflowed the queue (already reported)
    pub fn is_rejected(&self) -> bool {
        matches!(self.inner, SafeInner::Rejected)
    }

    /// Admission number, if admitted
    pub fn ticket(&self) -> Option<Ticket> {
        match self.inner {
            SafeInner::Admitted { ticket, .. } => Some(ticket),
            SafeInner::Rejected => None,
        }
    }
}

impl<T> Future for SafePending<T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            // A dropped sender already reported `Aborted` through the diversion
            SafeInner::Admitted { rx, .. } => {
                Pin::new(rx).poll(cx).map(|received| received.ok().flatten())
            }
            SafeInner::Rejected => Poll::Ready(None),
        }
    }
}
