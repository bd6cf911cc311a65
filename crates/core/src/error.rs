// Central Error Types for the Queue

use thiserror::Error;

/// Message carried by every overflow rejection
pub const QUEUE_FULL_MESSAGE: &str = "Queue limit reached";

/// Queue construction and configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Invalid capacity: {0} (must be a positive integer)")]
    InvalidCapacity(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No Tokio runtime available to drive the queue")]
    NoRuntime,
}

/// Result type alias using QueueError
pub type Result<T> = std::result::Result<T, QueueError>;

/// Failure of a single queued call
///
/// `E` is the wrapped operation's own error type; it is passed through
/// untouched and displayed unchanged.
#[derive(Error, Debug)]
pub enum TaskError<E> {
    /// Admission rejected: pending + executing entries already equal capacity
    #[error("Queue limit reached")]
    QueueFull,

    #[error("{0}")]
    Operation(E),

    #[error("Operation panicked: {0}")]
    Panicked(String),

    /// The runtime dropped the entry before it settled (e.g. shutdown)
    #[error("Task aborted before settling")]
    Aborted,
}

impl<E> TaskError<E> {
    pub fn is_queue_full(&self) -> bool {
        matches!(self, TaskError::QueueFull)
    }

    /// Recover the operation's own error, if that is what failed
    pub fn into_operation(self) -> Option<E> {
        match self {
            TaskError::Operation(e) => Some(e),
            _ => None,
        }
    }
}
