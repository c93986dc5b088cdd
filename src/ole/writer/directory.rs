//! Directory stream generation for OLE2 files
//!
//! Entries are pushed in pre-order (root first, children in canonical
//! order), so each entry's index is its position in the stream.
//!
//! ## Sibling links
//!
//! Children of a storage are wired straight from their sorted list:
//! - the middle element becomes the storage's child
//! - elements before it chain through left links
//! - elements after it chain through right links
//!
//! Every node is black and no rebalancing is done.
//!
//! ```text
//! Sorted order: ["Z", "ab", "abc"]
//!
//!        Root Entry
//!             |
//!            ab (midpoint)
//!           /  \
//!          Z    abc
//! ```

use super::super::consts::*;
use super::super::file::EntryKind;
use super::super::raw::{RawDirectoryEntry, SectorSize};
use super::core::EntryOptions;
use zerocopy::{IntoBytes, U16, U32, U64};

/// Encode a name to UTF-16LE in a 64-byte buffer with terminator
///
/// Returns the buffer and the name length in bytes including the terminator.
fn encode_name(name: &str) -> ([u8; 64], u16) {
    let mut buffer = [0u8; 64];
    let mut units = 0;
    for (slot, unit) in buffer
        .chunks_exact_mut(2)
        .zip(name.encode_utf16().take(MAX_NAME_UNITS))
    {
        slot.copy_from_slice(&unit.to_le_bytes());
        units += 1;
    }
    (buffer, ((units + 1) * 2) as u16)
}

/// Directory stream builder
#[derive(Debug, Default)]
pub struct DirectoryBuilder {
    /// Directory entries; index is the SID
    entries: Vec<RawDirectoryEntry>,
}

impl DirectoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its SID
    pub fn push(
        &mut self,
        name: &str,
        kind: EntryKind,
        options: &EntryOptions,
        start_sector: u32,
        size: u64,
    ) -> u32 {
        let (name, name_len) = encode_name(name);
        self.entries.push(RawDirectoryEntry {
            name,
            name_len: U16::new(name_len),
            entry_type: kind.to_raw(),
            node_color: COLOR_BLACK,
            sid_left: U32::new(NOSTREAM),
            sid_right: U32::new(NOSTREAM),
            sid_child: U32::new(NOSTREAM),
            clsid: options.clsid,
            state_bits: U32::new(options.state_bits),
            creation_time: U64::new(options.created),
            modified_time: U64::new(options.modified),
            start_sector: U32::new(start_sector),
            stream_size: U64::new(size),
        });
        (self.entries.len() - 1) as u32
    }

    /// Link a parent's children from their canonically sorted SIDs
    pub fn link_children(&mut self, parent_sid: u32, sorted: &[u32]) {
        let Some(&midpoint_sid) = sorted.get(sorted.len() / 2) else {
            return;
        };
        let midpoint = sorted.len() / 2;
        self.entries[parent_sid as usize].sid_child = U32::new(midpoint_sid);

        // Left chain runs from the midpoint down to the first element
        for j in 1..=midpoint {
            self.entries[sorted[j] as usize].sid_left = U32::new(sorted[j - 1]);
        }
        // Right chain runs from the midpoint up to the last element
        for j in midpoint..sorted.len() - 1 {
            self.entries[sorted[j] as usize].sid_right = U32::new(sorted[j + 1]);
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of sectors the directory stream occupies
    pub fn sector_count(&self, sector_size: SectorSize) -> usize {
        (self.entries.len() * DIRENTRY_SIZE).div_ceil(sector_size.bytes())
    }

    /// Serialize all entries, padding the last sector with unused entries
    pub fn generate_directory_stream(&self, sector_size: SectorSize) -> Vec<u8> {
        let total = self.sector_count(sector_size) * sector_size.bytes() / DIRENTRY_SIZE;
        let unused = RawDirectoryEntry::unused();

        let mut data = Vec::with_capacity(total * DIRENTRY_SIZE);
        for entry in &self.entries {
            data.extend_from_slice(entry.as_bytes());
        }
        for _ in self.entries.len()..total {
            data.extend_from_slice(unused.as_bytes());
        }
        data
    }
}
