//! OLE2 header generation
//!
//! Fills a [`RawHeader`] with magic bytes, version information and the
//! FAT/directory locations, then pads it to a full header sector.

use super::super::consts::*;
use super::super::raw::{RawHeader, SectorSize};
use zerocopy::{FromZeros, IntoBytes, U16, U32};

/// OLE2 header builder
pub struct HeaderBuilder {
    sector_size: SectorSize,
    first_dir_sector: u32,
    num_dir_sectors: u32,
    first_minifat_sector: u32,
    num_minifat_sectors: u32,
    first_difat_sector: u32,
    num_difat_sectors: u32,
    /// All FAT sector IDs; the first 109 go in the header
    fat_sectors: Vec<u32>,
}

impl HeaderBuilder {
    pub fn new(sector_size: SectorSize) -> Self {
        Self {
            sector_size,
            first_dir_sector: ENDOFCHAIN,
            num_dir_sectors: 0,
            first_minifat_sector: ENDOFCHAIN,
            num_minifat_sectors: 0,
            first_difat_sector: ENDOFCHAIN,
            num_difat_sectors: 0,
            fat_sectors: Vec::new(),
        }
    }

    /// Set the directory location
    ///
    /// The sector count (csectDir) is always 0 for 512-byte sector files.
    pub fn set_directory(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_dir_sector = first_sector;
        self.num_dir_sectors = match self.sector_size {
            SectorSize::V3 => 0,
            SectorSize::V4 => num_sectors,
        };
    }

    pub fn set_minifat(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_minifat_sector = first_sector;
        self.num_minifat_sectors = num_sectors;
    }

    pub fn set_difat(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_difat_sector = first_sector;
        self.num_difat_sectors = num_sectors;
    }

    pub fn set_fat_sectors(&mut self, sectors: &[u32]) {
        self.fat_sectors = sectors.to_vec();
    }

    /// Generate the header sector
    ///
    /// The on-disk header is 512 bytes; for 4096-byte sectors the first
    /// sector is zero-filled past it.
    pub fn generate(&self) -> Vec<u8> {
        let mut raw = RawHeader::new_zeroed();
        raw.magic = *MAGIC;
        raw.minor_version = U16::new(MINOR_VERSION);
        raw.major_version = U16::new(self.sector_size.major_version());
        raw.byte_order = U16::new(BYTE_ORDER_LE);
        raw.sector_shift = U16::new(self.sector_size.shift());
        raw.mini_sector_shift = U16::new(MINI_SECTOR_SHIFT);
        raw.num_dir_sectors = U32::new(self.num_dir_sectors);
        raw.num_fat_sectors = U32::new(self.fat_sectors.len() as u32);
        raw.first_dir_sector = U32::new(self.first_dir_sector);
        raw.mini_stream_cutoff = U32::new(MINI_STREAM_CUTOFF);
        raw.first_minifat_sector = U32::new(self.first_minifat_sector);
        raw.num_minifat_sectors = U32::new(self.num_minifat_sectors);
        raw.first_difat_sector = U32::new(self.first_difat_sector);
        raw.num_difat_sectors = U32::new(self.num_difat_sectors);

        for (slot, i) in raw.difat.iter_mut().zip(0..) {
            *slot = U32::new(self.fat_sectors.get(i).copied().unwrap_or(FREESECT));
        }

        let mut header = raw.as_bytes().to_vec();
        header.resize(self.sector_size.bytes(), 0);
        header
    }
}
