//! Unified error type definitions.
use thiserror::Error;

/// Main error type for loquat operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Byte-level read past the end of a buffer or similar
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid container format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Broken sector chain or directory tree
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),

    /// Stream, storage or property not found
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    /// Entry name or path rejected by the writer
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Mutation of a read-only property store
    #[error("Read-only: {0}")]
    ReadOnly(String),

    /// Operation applied to the wrong kind of entry or store
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type for loquat operations.
pub type Result<T> = std::result::Result<T, Error>;
