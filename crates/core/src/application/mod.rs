// Application Layer - the queue and its bind adapters

pub mod bind;
pub mod bind_safe;
pub mod queue;

// Re-exports
pub use bind::{Bound, Pending};
pub use bind_safe::{SafeBound, SafePending};
pub use queue::{BoundedSequentialQueue, QueueStats, Ticket};
