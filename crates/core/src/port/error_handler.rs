// Error Handler Port
// Receives failures diverted by supervised (bind_safe) wrappers

use crate::error::TaskError;

/// Sink for failures a supervised wrapper does not return to its caller
///
/// Called exactly once per failing call: synchronously from `call` on
/// overflow, or from the drain task when the operation itself fails.
/// Must not block; hand heavy work off to another task.
pub trait ErrorHandler<E>: Send + Sync {
    fn handle(&self, error: TaskError<E>);
}

impl<E, F> ErrorHandler<E> for F
where
    F: Fn(TaskError<E>) + Send + Sync,
{
    fn handle(&self, error: TaskError<E>) {
        (self)(error)
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::fmt::Display;
    use std::sync::{Arc, Mutex};

    /// Records the message of every error it receives
    #[derive(Clone, Default)]
    pub struct RecordingErrorHandler {
        messages: Arc<Mutex<Vec<String>>>,
        queue_full: Arc<Mutex<usize>>,
    }

    impl RecordingErrorHandler {
        pub fn new() -> Self {
            Self::default()
        }
        pub fn call_count(&self) -> usize {
            self.messages.lock().unwrap().len()
        }
        pub fn queue_full_count(&self) -> usize {
            *self.queue_full.lock().unwrap()
        }
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl<E> ErrorHandler<E> for RecordingErrorHandler
    where
        E: Display,
    {
        fn handle(&self, error: TaskError<E>) {
            if error.is_queue_full() {
                *self.queue_full.lock().unwrap() += 1;
            }
            self.messages.lock().unwrap().push(error.to_string());
        }
    }
}
