// Port Layer - Seams for caller-supplied collaborators

pub mod error_handler;
pub mod operation;

// Re-exports
pub use error_handler::ErrorHandler;
pub use operation::Operation;
