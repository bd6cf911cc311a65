// Domain Layer - Capacity and queue configuration

pub mod capacity;
pub mod queue;

// Re-exports
pub use capacity::Capacity;
pub use queue::{QueueConfig, QueueName};
