//! Types and utilities shared by the container and property layers.

// Submodule declarations
pub mod binary;
pub mod error;
pub mod time;

// Re-exports for convenience
pub use binary::{BinaryError, ByteCursor};
pub use error::{Error, Result};
