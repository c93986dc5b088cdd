//! DIFAT (Double Indirect FAT) generation for OLE2 files
//!
//! The header stores the first 109 FAT sector IDs; any further FAT sectors
//! are listed in DIFAT sectors. Each DIFAT sector holds
//! `sector_size / 4 - 1` IDs followed by the next DIFAT sector pointer
//! (127 IDs for 512-byte sectors, 1023 for 4096-byte sectors).

use super::super::consts::*;
use super::super::raw::SectorSize;

/// Number of DIFAT sectors needed to list `num_fat_sectors` FAT sectors
pub fn difat_sector_count(num_fat_sectors: u32, sector_size: SectorSize) -> u32 {
    let overflow = num_fat_sectors.saturating_sub(HEADER_DIFAT_ENTRIES as u32);
    overflow.div_ceil(sector_size.entries_per_sector() as u32 - 1)
}

/// DIFAT builder for large file support
#[derive(Debug)]
pub struct DifatBuilder {
    /// FAT sector IDs beyond the first 109
    fat_sector_ids: Vec<u32>,
    sector_size: SectorSize,
}

impl DifatBuilder {
    /// Build from the complete list of FAT sector IDs; the first 109 are skipped
    pub fn new(fat_sectors: &[u32], sector_size: SectorSize) -> Self {
        Self {
            fat_sector_ids: fat_sectors
                .get(HEADER_DIFAT_ENTRIES..)
                .map(<[u32]>::to_vec)
                .unwrap_or_default(),
            sector_size,
        }
    }

    /// Generate the DIFAT sectors, chained contiguously from `first_difat_sector`
    ///
    /// Unused ID slots are FREESECT; the last sector's next pointer is ENDOFCHAIN.
    pub fn generate_difat_sectors(&self, first_difat_sector: u32) -> Vec<u8> {
        let ids_per_sector = self.sector_size.entries_per_sector() - 1;
        let sector_bytes = self.sector_size.bytes();
        let num_difat_sectors = self.fat_sector_ids.len().div_ceil(ids_per_sector);

        let mut data = vec![0xFFu8; num_difat_sectors * sector_bytes];
        for (difat_idx, (sector, ids)) in data
            .chunks_exact_mut(sector_bytes)
            .zip(self.fat_sector_ids.chunks(ids_per_sector))
            .enumerate()
        {
            for (slot, &id) in sector.chunks_exact_mut(4).zip(ids) {
                slot.copy_from_slice(&id.to_le_bytes());
            }

            let next = if difat_idx + 1 < num_difat_sectors {
                first_difat_sector + difat_idx as u32 + 1
            } else {
                ENDOFCHAIN
            };
            sector[sector_bytes - 4..].copy_from_slice(&next.to_le_bytes());
        }

        data
    }
}
