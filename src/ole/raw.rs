//! On-disk structures shared by the reader and the writer.
//!
//! Both are plain little-endian layouts with no padding, so they are
//! parsed with `FromBytes` and emitted with `IntoBytes` directly.

use super::consts::*;
use serde::{Deserialize, Serialize};
use zerocopy::{LE, U16, U32, U64};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Raw OLE header (first 512 bytes of the file)
#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub(crate) struct RawHeader {
    pub magic: [u8; 8],
    pub clsid: [u8; 16],
    pub minor_version: U16<LE>,
    pub major_version: U16<LE>,
    pub byte_order: U16<LE>,
    pub sector_shift: U16<LE>,
    pub mini_sector_shift: U16<LE>,
    pub reserved: [u8; 6],
    /// Number of directory sectors (always 0 for version 3)
    pub num_dir_sectors: U32<LE>,
    pub num_fat_sectors: U32<LE>,
    pub first_dir_sector: U32<LE>,
    pub transaction_signature: U32<LE>,
    pub mini_stream_cutoff: U32<LE>,
    pub first_minifat_sector: U32<LE>,
    pub num_minifat_sectors: U32<LE>,
    pub first_difat_sector: U32<LE>,
    pub num_difat_sectors: U32<LE>,
    /// First 109 FAT sector locations
    pub difat: [U32<LE>; HEADER_DIFAT_ENTRIES],
}

/// Raw OLE directory entry structure (128 bytes)
///
/// This represents the on-disk format of a directory entry.
/// Based on Microsoft OLE2 specification.
#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub(crate) struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    pub name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    pub name_len: U16<LE>,
    /// Entry type (1 = storage, 2 = stream, 5 = root)
    pub entry_type: u8,
    /// Node color (0 = red, 1 = black)
    pub node_color: u8,
    /// Left sibling SID
    pub sid_left: U32<LE>,
    /// Right sibling SID
    pub sid_right: U32<LE>,
    /// Child SID
    pub sid_child: U32<LE>,
    /// CLSID (16 bytes)
    pub clsid: [u8; 16],
    /// State bits
    pub state_bits: U32<LE>,
    /// Creation time (FILETIME)
    pub creation_time: U64<LE>,
    /// Modified time (FILETIME)
    pub modified_time: U64<LE>,
    /// Starting sector
    pub start_sector: U32<LE>,
    /// Stream size
    pub stream_size: U64<LE>,
}

impl RawDirectoryEntry {
    /// An unused slot, as written to pad the last directory sector
    pub fn unused() -> Self {
        Self {
            name: [0; 64],
            name_len: U16::new(0),
            entry_type: STGTY_EMPTY,
            node_color: 0,
            sid_left: U32::new(NOSTREAM),
            sid_right: U32::new(NOSTREAM),
            sid_child: U32::new(NOSTREAM),
            clsid: [0; 16],
            state_bits: U32::new(0),
            creation_time: U64::new(0),
            modified_time: U64::new(0),
            start_sector: U32::new(0),
            stream_size: U64::new(0),
        }
    }
}

/// Sector size class of a compound file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SectorSize {
    /// Version 3: 512-byte sectors
    #[default]
    V3,
    /// Version 4: 4096-byte sectors
    V4,
}

impl SectorSize {
    /// Sector size in bytes
    pub fn bytes(self) -> usize {
        match self {
            SectorSize::V3 => SECTOR_SIZE_V3,
            SectorSize::V4 => SECTOR_SIZE_V4,
        }
    }

    /// Sector shift stored in the header (9 or 12)
    pub fn shift(self) -> u16 {
        match self {
            SectorSize::V3 => 9,
            SectorSize::V4 => 12,
        }
    }

    /// Major (DLL) version stored in the header
    pub fn major_version(self) -> u16 {
        match self {
            SectorSize::V3 => 3,
            SectorSize::V4 => 4,
        }
    }

    /// Resolve a header's sector shift and major version
    pub fn from_header(shift: u16, major_version: u16) -> Option<Self> {
        match (shift, major_version) {
            (9, 3) => Some(SectorSize::V3),
            (12, 4) => Some(SectorSize::V4),
            _ => None,
        }
    }

    /// FAT entries that fit in one sector
    pub fn entries_per_sector(self) -> usize {
        self.bytes() / 4
    }
}
