//! Compound File Binary (OLE2) containers.
//!
//! [`OleFile`] parses a container image held in memory and resolves streams
//! and storages by path. [`OleWriter`] builds a new image from an in-memory
//! entry tree. The [`msg`] module decodes the MAPI property streams that
//! Outlook stores inside such containers.

/// Constants for OLE file format
pub mod consts;

/// Main OLE file parsing implementation
mod file;

/// Directory entry name ordering and validation
mod name;

/// On-disk header and directory entry layouts
mod raw;

/// OLE file writer
pub mod writer;

/// MAPI property streams of `.msg` files
#[cfg(feature = "msg")]
pub mod msg;

// Re-export public types for convenient access
pub use file::{DirectoryEntry, EntryKind, OleError, OleFile, is_ole_file, open_container};
pub use name::{compare_names, names_equal};
pub use raw::SectorSize;
pub use writer::{EntryData, EntryOptions, OleWriter};
