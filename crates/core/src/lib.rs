// Taskgate Core - Bounded sequential task queue
// NO infrastructure dependencies: callers supply the operations

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{Bound, BoundedSequentialQueue, Pending, QueueStats, SafeBound, SafePending};
pub use domain::{Capacity, QueueConfig};
pub use error::{QueueError, Result, TaskError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
