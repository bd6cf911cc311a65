// Operation Port
// The asynchronous work a queue serializes (network call, subprocess, ...)

use async_trait::async_trait;
use std::future::Future;

/// An asynchronous operation that can be bound to a queue
///
/// `A` is the call's argument; use a tuple for several arguments.
///
/// Implemented for every `Fn(A) -> impl Future<Output = Result<T, E>>`
/// closure, so plain async functions bind directly:
///
/// ```text
/// let fetch = queue.bind(|url: String| async move { client.get(url).await });
/// let body = fetch.call("https://example.com".into()).await?;
/// ```
#[async_trait]
pub trait Operation<A>: Send + Sync {
    type Output;
    type Error;

    /// Run the operation once with the given arguments
    async fn invoke(&self, args: A) -> Result<Self::Output, Self::Error>;
}

#[async_trait]
impl<A, F, Fut, T, E> Operation<A> for F
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    type Output = T;
    type Error = E;

    async fn invoke(&self, args: A) -> Result<T, E> {
        (self)(args).await
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Mock operation behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Echo the argument back
        Success,
        /// Always fail with message
        Fail(String),
        /// Fail on every n-th invocation (1-based), succeed otherwise
        FailEvery(usize),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock delayed operation
    ///
    /// Sleeps for `delay`, then behaves per [`MockBehavior`]. Tracks
    /// invocations, in-flight calls and the highest concurrency observed.
    #[derive(Clone)]
    pub struct MockOperation {
        delay: Duration,
        behavior: MockBehavior,
        call_count: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        peak_in_flight: Arc<AtomicUsize>,
    }

    impl MockOperation {
        pub fn new(delay: Duration, behavior: MockBehavior) -> Self {
            Self {
                delay,
                behavior,
                call_count: Arc::new(AtomicUsize::new(0)),
                in_flight: Arc::new(AtomicUsize::new(0)),
                peak_in_flight: Arc::new(AtomicUsize::new(0)),
            }
        }
        pub fn new_success(delay: Duration) -> Self {
            Self::new(delay, MockBehavior::Success)
        }
        pub fn new_fail(delay: Duration, message: impl Into<String>) -> Self {
            Self::new(delay, MockBehavior::Fail(message.into()))
        }
        pub fn new_panic_inducing(delay: Duration, message: impl Into<String>) -> Self {
            Self::new(delay, MockBehavior::Panic(message.into()))
        }
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
        pub fn peak_in_flight(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<A> Operation<A> for MockOperation
    where
        A: Send + 'static,
    {
        type Output = A;
        type Error = String;

        async fn invoke(&self, args: A) -> Result<A, String> {
            let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match &self.behavior {
                MockBehavior::Success => Ok(args),
                MockBehavior::Fail(msg) => Err(msg.clone()),
                MockBehavior::FailEvery(n) if *n > 0 && call % n == 0 => {
                    Err(format!("call {} failed", call))
                }
                MockBehavior::FailEvery(_) => Ok(args),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
            }
        }
    }
}
