//! FAT (File Allocation Table) generation for OLE2 files
//!
//! The FAT maps sector numbers to the next sector in a chain, enabling
//! variable-length streams to be stored in the compound file.
//!
//! - Regular sectors use positive chain values
//! - FAT sectors are marked with FATSECT (0xFFFFFFFD)
//! - DIFAT sectors are marked with DIFSECT (0xFFFFFFFC)
//! - End of chain is marked with ENDOFCHAIN (0xFFFFFFFE)
//! - Free sectors are marked with FREESECT (0xFFFFFFFF)

use super::super::consts::*;
use super::super::raw::SectorSize;
use fixedbitset::FixedBitSet;

/// FAT builder for sector allocation
///
/// Sectors are handed out in increasing order, so the order of allocation
/// calls is the physical order of the file.
#[derive(Debug)]
pub struct FatBuilder {
    /// The FAT table (maps sector ID to next sector in chain)
    fat: Vec<u32>,
    sector_size: SectorSize,
}

impl FatBuilder {
    pub fn new(sector_size: SectorSize) -> Self {
        Self {
            fat: Vec::new(),
            sector_size,
        }
    }

    /// Allocate a chain of sectors for `size` bytes
    ///
    /// Returns the starting sector, or ENDOFCHAIN when `size` is zero.
    pub fn allocate_chain(&mut self, size: usize) -> u32 {
        if size == 0 {
            return ENDOFCHAIN;
        }

        let num_sectors = size.div_ceil(self.sector_size.bytes());
        let start_sector = self.fat.len() as u32;
        self.fat.reserve(num_sectors);

        // Link sectors in a single pass; the last one ends the chain
        for i in 1..num_sectors {
            self.fat.push(start_sector + i as u32);
        }
        self.fat.push(ENDOFCHAIN);

        start_sector
    }

    /// Reserve a contiguous range of sectors marked with a special value
    ///
    /// This is used to reserve sectors for FAT (`FATSECT`) and DIFAT (`DIFSECT`).
    pub fn allocate_special(&mut self, count: u32, marker: u32) -> u32 {
        if count == 0 {
            return ENDOFCHAIN;
        }
        let start = self.fat.len() as u32;
        self.fat.resize(self.fat.len() + count as usize, marker);
        start
    }

    #[cfg(test)]
    pub fn fat(&self) -> &[u32] {
        &self.fat
    }

    /// Get the total number of sectors allocated
    pub fn total_sectors(&self) -> u32 {
        self.fat.len() as u32
    }

    /// Generate exactly `num_fat_sectors` FAT sectors, padding with FREESECT
    pub fn generate_fat_sectors(&self, num_fat_sectors: u32) -> Vec<u8> {
        let mut data = vec![0xFFu8; num_fat_sectors as usize * self.sector_size.bytes()];
        for (slot, &value) in data.chunks_exact_mut(4).zip(&self.fat) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
        data
    }

    /// Validate the FAT for consistency
    ///
    /// Every chain link must stay inside the table and no sector may be
    /// reachable from two places.
    pub fn validate(&self) -> Result<(), String> {
        let mut referenced = FixedBitSet::with_capacity(self.fat.len());

        for (sector, &next) in self.fat.iter().enumerate() {
            match next {
                ENDOFCHAIN | FREESECT | FATSECT | DIFSECT => {},
                _ if next as usize >= self.fat.len() => {
                    return Err(format!("Invalid next sector {} at sector {}", next, sector));
                },
                _ if next as usize <= sector => {
                    return Err(format!("Backward link {} at sector {}", next, sector));
                },
                _ => {
                    if referenced.put(next as usize) {
                        return Err(format!("Sector {} is linked twice", next));
                    }
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_chain() {
        let mut fat = FatBuilder::new(SectorSize::V3);

        // Allocate 1024 bytes with 512-byte sectors (2 sectors)
        let start = fat.allocate_chain(1024);
        assert_eq!(start, 0);
        assert_eq!(fat.total_sectors(), 2);

        assert_eq!(fat.fat()[0], 1);
        assert_eq!(fat.fat()[1], ENDOFCHAIN);
    }

    #[test]
    fn test_empty_chain() {
        let mut fat = FatBuilder::new(SectorSize::V3);
        assert_eq!(fat.allocate_chain(0), ENDOFCHAIN);
        assert_eq!(fat.total_sectors(), 0);
    }

    #[test]
    fn test_special_sectors_precede_chains() {
        let mut fat = FatBuilder::new(SectorSize::V3);
        assert_eq!(fat.allocate_special(2, FATSECT), 0);
        assert_eq!(fat.allocate_special(0, DIFSECT), ENDOFCHAIN);
        assert_eq!(fat.allocate_chain(600), 2);

        assert_eq!(fat.fat(), &[FATSECT, FATSECT, 3, ENDOFCHAIN]);
        assert!(fat.validate().is_ok());
    }

    #[test]
    fn test_generate_pads_with_free() {
        let mut fat = FatBuilder::new(SectorSize::V4);
        fat.allocate_special(1, FATSECT);
        let data = fat.generate_fat_sectors(1);
        assert_eq!(data.len(), 4096);
        assert_eq!(&data[0..4], &FATSECT.to_le_bytes());
        assert_eq!(&data[4..8], &FREESECT.to_le_bytes());
    }
}
