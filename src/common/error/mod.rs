//! Unified error type for the loquat library.
//!
//! Each layer reports its own error enum; this module folds them into one
//! [`Error`] for callers that work across layers.

// Submodule declarations
pub mod types;
pub mod conversions;

// Re-exports
pub use types::{Error, Result};
