//! MiniFAT (Mini File Allocation Table) generation for OLE2 files
//!
//! Streams below the 4096-byte cutoff are packed into the mini stream in
//! 64-byte mini sectors. The mini stream itself is stored in regular sectors
//! referenced from the root entry; the MiniFAT chains the mini sectors.

use super::super::consts::*;
use super::super::raw::SectorSize;

/// MiniFAT builder for small stream allocation
#[derive(Debug, Default)]
pub struct MiniFatBuilder {
    /// The MiniFAT table (maps mini sector ID to next mini sector in chain)
    minifat: Vec<u32>,
    /// Ministream data (concatenated small streams, each padded to 64 bytes)
    ministream_data: Vec<u8>,
}

impl MiniFatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a chain of mini sectors for a small stream
    ///
    /// Returns the starting mini sector, or ENDOFCHAIN for empty data.
    pub fn allocate_mini_chain(&mut self, data: &[u8]) -> u32 {
        if data.is_empty() {
            return ENDOFCHAIN;
        }

        let num_mini_sectors = data.len().div_ceil(MINI_SECTOR_SIZE);
        let start_mini_sector = self.minifat.len() as u32;

        for i in 1..num_mini_sectors {
            self.minifat.push(start_mini_sector + i as u32);
        }
        self.minifat.push(ENDOFCHAIN);

        // Add data to ministream (padded to mini sector boundary)
        let offset = self.ministream_data.len();
        self.ministream_data
            .resize(offset + num_mini_sectors * MINI_SECTOR_SIZE, 0);
        self.ministream_data[offset..offset + data.len()].copy_from_slice(data);

        start_mini_sector
    }

    /// Get the ministream data
    pub fn ministream_data(&self) -> &[u8] {
        &self.ministream_data
    }

    /// Number of regular sectors the MiniFAT occupies
    pub fn sector_count(&self, sector_size: SectorSize) -> usize {
        self.minifat.len().div_ceil(sector_size.entries_per_sector())
    }

    /// Generate MiniFAT sectors as bytes, padded with FREESECT
    pub fn generate_minifat_sectors(&self, sector_size: SectorSize) -> Vec<u8> {
        let mut data = vec![0xFFu8; self.sector_count(sector_size) * sector_size.bytes()];
        for (slot, &value) in data.chunks_exact_mut(4).zip(&self.minifat) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
        data
    }

    /// Check if MiniFAT has any allocations
    pub fn is_empty(&self) -> bool {
        self.minifat.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_mini_chain() {
        let mut minifat = MiniFatBuilder::new();

        // 100 bytes = 2 mini sectors of 64 bytes
        let start = minifat.allocate_mini_chain(&[0xAAu8; 100]);

        assert_eq!(start, 0);
        assert_eq!(minifat.minifat, vec![1, ENDOFCHAIN]);
        assert_eq!(minifat.ministream_data().len(), 128);
        assert_eq!(minifat.ministream_data()[99], 0xAA);
        assert_eq!(minifat.ministream_data()[100], 0);
    }

    #[test]
    fn test_empty_mini_chain() {
        let mut minifat = MiniFatBuilder::new();
        assert_eq!(minifat.allocate_mini_chain(&[]), ENDOFCHAIN);
        assert!(minifat.is_empty());
        assert_eq!(minifat.sector_count(SectorSize::V3), 0);
    }

    #[test]
    fn test_multiple_allocations() {
        let mut minifat = MiniFatBuilder::new();

        let start1 = minifat.allocate_mini_chain(&[0xAAu8; 50]);
        let start2 = minifat.allocate_mini_chain(&[0xBBu8; 100]);

        assert_eq!(start1, 0);
        assert_eq!(start2, 1);
        assert_eq!(minifat.minifat, vec![ENDOFCHAIN, 2, ENDOFCHAIN]);
    }

    #[test]
    fn test_generate_minifat_sectors() {
        let mut minifat = MiniFatBuilder::new();
        minifat.allocate_mini_chain(&[0u8; 100]);

        let sectors = minifat.generate_minifat_sectors(SectorSize::V3);
        assert_eq!(sectors.len(), 512);
        assert_eq!(&sectors[0..4], &1u32.to_le_bytes());
        assert_eq!(&sectors[8..12], &FREESECT.to_le_bytes());
    }
}
