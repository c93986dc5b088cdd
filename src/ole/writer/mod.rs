//! OLE2 file writing module
//!
//! Builds compound documents from an in-memory entry tree.

/// FAT (File Allocation Table) generation
mod fat;

/// MiniFAT (Mini File Allocation Table) generation
mod minifat;

/// DIFAT (Double Indirect FAT) generation
mod difat;

/// Directory stream generation
mod directory;

/// OLE2 header generation
mod header;

/// Core OLE writer implementation
mod core;

/// Integration tests for OLE writer
#[cfg(test)]
mod tests;

pub use core::{EntryData, EntryOptions, OleWriter};
