use super::consts::*;
use super::name::{compare_names, names_equal};
use super::raw::{RawDirectoryEntry, RawHeader, SectorSize};
use crate::common::binary::{BinaryError, read_u32_table};
use crate::common::time::filetime_to_datetime;
use chrono::{DateTime, Utc};
use fixedbitset::FixedBitSet;
use log::{debug, warn};
use serde::Serialize;
use std::io;
use thiserror::Error;
use zerocopy::FromBytes;

/// Error types for OLE container reading and writing
#[derive(Debug, Error)]
pub enum OleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Missing signature or inconsistent header/tables; fatal at open
    #[error("Invalid format: {0}")]
    Format(String),
    /// A sector chain cycles, leaves the table or ends before the declared size
    #[error("Corrupt sector chain: {0}")]
    CorruptChain(String),
    #[error("Entry not found: {0}")]
    NotFound(String),
    #[error("Not a stream: {0}")]
    NotAStream(String),
    #[error("Not a storage: {0}")]
    NotAStorage(String),
    #[error("Name longer than 31 UTF-16 units: {0}")]
    NameTooLong(String),
    #[error("Illegal character in name: {0}")]
    IllegalCharacter(String),
    #[error("Entry already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<BinaryError> for OleError {
    fn from(err: BinaryError) -> Self {
        OleError::InvalidData(err.to_string())
    }
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntryKind {
    Unused,
    Storage,
    Stream,
    Root,
}

impl EntryKind {
    fn from_raw(value: u8) -> Self {
        match value {
            STGTY_STORAGE => EntryKind::Storage,
            STGTY_STREAM => EntryKind::Stream,
            STGTY_ROOT => EntryKind::Root,
            STGTY_EMPTY => EntryKind::Unused,
            other => {
                warn!("Unsupported directory entry type {}, treating as unused", other);
                EntryKind::Unused
            },
        }
    }

    /// Object type byte written to disk
    pub fn to_raw(self) -> u8 {
        match self {
            EntryKind::Unused => STGTY_EMPTY,
            EntryKind::Storage => STGTY_STORAGE,
            EntryKind::Stream => STGTY_STREAM,
            EntryKind::Root => STGTY_ROOT,
        }
    }
}

/// Represents an OLE directory entry (stream or storage)
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    /// Storage ID (index in directory)
    pub sid: u32,
    /// Entry name (UTF-16 decoded to UTF-8)
    pub name: String,
    pub kind: EntryKind,
    /// Index of left sibling in red-black tree
    pub sid_left: u32,
    /// Index of right sibling in red-black tree
    pub sid_right: u32,
    /// Index of child node in red-black tree
    pub sid_child: u32,
    /// CLSID of this entry (root/storage only)
    pub clsid: [u8; 16],
    pub state_bits: u32,
    /// Creation time (FILETIME ticks, 0 when unset)
    pub creation_time: u64,
    /// Modification time (FILETIME ticks, 0 when unset)
    pub modified_time: u64,
    /// First sector (or mini sector) of the stream
    pub start_sector: u32,
    /// Size of the stream in bytes
    pub size: u64,
    /// Whether this stream is in MiniFAT
    pub is_minifat: bool,
    /// Child SIDs in canonical sibling order (storages and root only)
    pub children: Vec<u32>,
}

impl DirectoryEntry {
    pub fn is_stream(&self) -> bool {
        self.kind == EntryKind::Stream
    }

    /// True for storages and the root entry
    pub fn is_storage(&self) -> bool {
        matches!(self.kind, EntryKind::Storage | EntryKind::Root)
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        (self.creation_time != 0)
            .then(|| filetime_to_datetime(self.creation_time))
            .flatten()
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        (self.modified_time != 0)
            .then(|| filetime_to_datetime(self.modified_time))
            .flatten()
    }

    /// CLSID formatted as `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`, `None` if all zeros
    pub fn clsid_string(&self) -> Option<String> {
        format_clsid(&self.clsid)
    }
}

/// Main OLE file parser structure
///
/// Borrows the caller's buffer; all tables and directory entries are built
/// once in [`OleFile::open`] and never change afterwards, so a parsed file can
/// be shared freely between threads.
#[derive(Debug)]
pub struct OleFile<'a> {
    data: &'a [u8],
    sector_size: SectorSize,
    /// File Allocation Table - maps sector to next sector in chain
    fat: Vec<u32>,
    /// Mini FAT - for streams smaller than cutoff size
    minifat: Vec<u32>,
    /// All directory entries indexed by SID (unused slots included)
    entries: Vec<DirectoryEntry>,
    /// Regular sectors holding the mini stream, `None` if its chain is damaged
    ministream_sectors: Option<Vec<u32>>,
}

/// Parse a container from a byte buffer
pub fn open_container(data: &[u8]) -> Result<OleFile<'_>, OleError> {
    OleFile::open(data)
}

impl<'a> OleFile<'a> {
    /// Open and parse an OLE file held in memory
    ///
    /// # Errors
    ///
    /// [`OleError::Format`] if the signature is missing, the header is
    /// inconsistent, or the FAT, MiniFAT or directory cannot be loaded.
    pub fn open(data: &'a [u8]) -> Result<Self, OleError> {
        if data.len() < HEADER_SIZE {
            return Err(OleError::Format(format!(
                "file is {} bytes, smaller than a header",
                data.len()
            )));
        }
        if &data[0..8] != MAGIC {
            return Err(OleError::Format("missing OLE signature".to_string()));
        }

        let header = RawHeader::read_from_bytes(&data[..HEADER_SIZE])
            .map_err(|_| OleError::Format("failed to parse header".to_string()))?;

        if header.byte_order.get() != BYTE_ORDER_LE {
            return Err(OleError::Format("Invalid byte order".to_string()));
        }
        let sector_size =
            SectorSize::from_header(header.sector_shift.get(), header.major_version.get())
                .ok_or_else(|| {
                    OleError::Format(format!(
                        "sector shift {} does not match major version {}",
                        header.sector_shift.get(),
                        header.major_version.get()
                    ))
                })?;
        if header.mini_sector_shift.get() != MINI_SECTOR_SHIFT {
            return Err(OleError::Format(format!(
                "unsupported mini sector shift {}",
                header.mini_sector_shift.get()
            )));
        }
        if header.mini_stream_cutoff.get() != MINI_STREAM_CUTOFF {
            return Err(OleError::Format(format!(
                "unsupported mini stream cutoff {}",
                header.mini_stream_cutoff.get()
            )));
        }
        if data.len() < sector_size.bytes() {
            return Err(OleError::Format(
                "file is shorter than its header sector".to_string(),
            ));
        }

        let mut ole = OleFile {
            data,
            sector_size,
            fat: Vec::new(),
            minifat: Vec::new(),
            entries: Vec::new(),
            ministream_sectors: None,
        };

        ole.load_fat(&header)?;
        ole.load_directory(header.first_dir_sector.get())?;
        if header.num_minifat_sectors.get() > 0
            && header.first_minifat_sector.get() != ENDOFCHAIN
        {
            ole.load_minifat(header.first_minifat_sector.get())?;
        }
        ole.load_ministream();
        ole.build_storage_tree()?;

        debug!(
            "Opened OLE file: {} bytes, {:?} sectors, {} FAT entries, {} directory entries",
            data.len(),
            sector_size,
            ole.fat.len(),
            ole.entries.len()
        );

        Ok(ole)
    }

    /// Sector size class of this file
    pub fn sector_size(&self) -> SectorSize {
        self.sector_size
    }

    /// Borrow one regular sector; the last sector of a file may be short
    fn sector(&self, sector_id: u32) -> Option<&'a [u8]> {
        let size = self.sector_size.bytes();
        let start = (sector_id as usize).checked_add(1)?.checked_mul(size)?;
        if start >= self.data.len() {
            return None;
        }
        let end = (start + size).min(self.data.len());
        Some(&self.data[start..end])
    }

    /// Borrow one regular sector that must be present in full
    fn full_sector(&self, sector_id: u32, what: &str) -> Result<&'a [u8], OleError> {
        match self.sector(sector_id) {
            Some(bytes) if bytes.len() == self.sector_size.bytes() => Ok(bytes),
            _ => Err(OleError::Format(format!(
                "{} sector {} lies outside the file",
                what, sector_id
            ))),
        }
    }

    /// Load the File Allocation Table (FAT)
    ///
    /// First 109 FAT sector indexes are stored in the header, additional
    /// indexes are stored in DIFAT sectors.
    fn load_fat(&mut self, header: &RawHeader) -> Result<(), OleError> {
        let num_fat = header.num_fat_sectors.get() as usize;
        let mut fat_sectors: Vec<u32> = header
            .difat
            .iter()
            .take(num_fat.min(HEADER_DIFAT_ENTRIES))
            .map(|v| v.get())
            .collect();

        if fat_sectors.len() < num_fat {
            let ids_per_sector = self.sector_size.entries_per_sector() - 1;
            let mut visited =
                FixedBitSet::with_capacity(self.data.len() / self.sector_size.bytes() + 1);
            let mut difat_sector = header.first_difat_sector.get();

            for _ in 0..header.num_difat_sectors.get() {
                if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                    break;
                }
                if (difat_sector as usize) < visited.len() && visited.put(difat_sector as usize) {
                    return Err(OleError::Format(format!(
                        "DIFAT chain revisits sector {}",
                        difat_sector
                    )));
                }
                let table = read_u32_table(self.full_sector(difat_sector, "DIFAT")?);
                let remaining = num_fat - fat_sectors.len();
                fat_sectors.extend(table[..ids_per_sector].iter().take(remaining));
                difat_sector = table[ids_per_sector];
                if fat_sectors.len() == num_fat {
                    break;
                }
            }
        }

        if fat_sectors.len() < num_fat {
            return Err(OleError::Format(format!(
                "header declares {} FAT sectors but only {} could be located",
                num_fat,
                fat_sectors.len()
            )));
        }

        self.fat.reserve(num_fat * self.sector_size.entries_per_sector());
        for sector_id in fat_sectors {
            let bytes = self.full_sector(sector_id, "FAT")?;
            self.fat.extend(read_u32_table(bytes));
        }
        Ok(())
    }

    /// Follow an unbounded FAT chain, as used for internal tables
    fn table_chain(&self, start: u32) -> Result<Vec<u32>, OleError> {
        walk_chain(&self.fat, start, None)
    }

    /// Concatenate the sectors of an internal table chain
    fn read_table_stream(&self, start: u32, what: &str) -> Result<Vec<u8>, OleError> {
        let chain = self
            .table_chain(start)
            .map_err(|e| OleError::Format(format!("{} chain: {}", what, e)))?;
        let mut data = Vec::with_capacity(chain.len() * self.sector_size.bytes());
        for sector_id in chain {
            data.extend_from_slice(self.full_sector(sector_id, what)?);
        }
        Ok(data)
    }

    /// Load the Mini FAT (for small streams)
    fn load_minifat(&mut self, first_minifat_sector: u32) -> Result<(), OleError> {
        let minifat_data = self.read_table_stream(first_minifat_sector, "MiniFAT")?;
        self.minifat = read_u32_table(&minifat_data);
        Ok(())
    }

    /// Load directory entries
    fn load_directory(&mut self, first_dir_sector: u32) -> Result<(), OleError> {
        let dir_data = self.read_table_stream(first_dir_sector, "directory")?;

        self.entries = dir_data
            .chunks_exact(DIRENTRY_SIZE)
            .enumerate()
            .map(|(sid, chunk)| self.parse_directory_entry(chunk, sid as u32))
            .collect::<Result<_, _>>()?;

        match self.entries.first() {
            Some(root) if root.kind == EntryKind::Root => Ok(()),
            _ => Err(OleError::Format(
                "directory does not start with a root entry".to_string(),
            )),
        }
    }

    /// Parse a single directory entry from 128 bytes
    fn parse_directory_entry(&self, data: &[u8], sid: u32) -> Result<DirectoryEntry, OleError> {
        let raw = RawDirectoryEntry::read_from_bytes(data)
            .map_err(|_| OleError::Format("Failed to parse directory entry".to_string()))?;

        let kind = EntryKind::from_raw(raw.entry_type);
        let name_units = (raw.name_len.get() as usize / 2)
            .saturating_sub(1)
            .min(MAX_NAME_UNITS);
        let name = decode_utf16le(&raw.name[..name_units * 2]);

        // 512-byte sector files only use the low 32 bits of the size
        let size = match self.sector_size {
            SectorSize::V3 => raw.stream_size.get() & 0xFFFF_FFFF,
            SectorSize::V4 => raw.stream_size.get(),
        };

        Ok(DirectoryEntry {
            sid,
            name,
            kind,
            sid_left: raw.sid_left.get(),
            sid_right: raw.sid_right.get(),
            sid_child: raw.sid_child.get(),
            clsid: raw.clsid,
            state_bits: raw.state_bits.get(),
            creation_time: raw.creation_time.get(),
            modified_time: raw.modified_time.get(),
            start_sector: raw.start_sector.get(),
            size,
            is_minifat: kind == EntryKind::Stream && size < MINI_STREAM_CUTOFF as u64,
            children: Vec::new(),
        })
    }

    /// Locate the sectors of the mini stream; a damaged chain only disables mini reads
    fn load_ministream(&mut self) {
        let root = &self.entries[0];
        if root.size == 0 {
            self.ministream_sectors = Some(Vec::new());
            return;
        }
        let needed = (root.size as usize).div_ceil(self.sector_size.bytes());
        match walk_chain(&self.fat, root.start_sector, Some(needed)) {
            Ok(sectors) => self.ministream_sectors = Some(sectors),
            Err(e) => {
                warn!("Mini stream is unreadable, small streams will fail: {}", e);
                self.ministream_sectors = None;
            },
        }
    }

    /// Collect every storage's children and sort them in canonical order
    fn build_storage_tree(&mut self) -> Result<(), OleError> {
        let count = self.entries.len();
        let mut seen = FixedBitSet::with_capacity(count);
        seen.insert(0);
        let mut storages = vec![0usize];

        while let Some(parent) = storages.pop() {
            let mut children = Vec::new();
            let mut pending = vec![self.entries[parent].sid_child];

            while let Some(sid) = pending.pop() {
                if sid == NOSTREAM {
                    continue;
                }
                if sid > MAXREGSID {
                    return Err(OleError::Format(format!(
                        "directory entry {} links reserved id {:#X}",
                        parent, sid
                    )));
                }
                let idx = sid as usize;
                if idx >= count {
                    return Err(OleError::Format(format!(
                        "directory entry {} points to missing entry {}",
                        parent, sid
                    )));
                }
                if seen.put(idx) {
                    return Err(OleError::Format(format!(
                        "directory tree revisits entry {}",
                        sid
                    )));
                }
                let entry = &self.entries[idx];
                pending.push(entry.sid_left);
                pending.push(entry.sid_right);
                match entry.kind {
                    EntryKind::Unused => warn!("Storage {} links unused entry {}", parent, sid),
                    EntryKind::Root => {
                        return Err(OleError::Format(format!(
                            "root entry appears as a child at {}",
                            sid
                        )));
                    },
                    EntryKind::Storage => {
                        children.push(sid);
                        storages.push(idx);
                    },
                    EntryKind::Stream => children.push(sid),
                }
            }

            children.sort_by(|&a, &b| {
                compare_names(&self.entries[a as usize].name, &self.entries[b as usize].name)
            });
            self.entries[parent].children = children;
        }
        Ok(())
    }

    /// Root directory entry
    pub fn root(&self) -> &DirectoryEntry {
        &self.entries[0]
    }

    /// Get the root entry name
    pub fn root_name(&self) -> &str {
        &self.entries[0].name
    }

    /// Number of directory slots, unused ones included
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Entry at a directory index
    pub fn entry_by_sid(&self, sid: u32) -> Option<&DirectoryEntry> {
        self.entries.get(sid as usize)
    }

    /// Children of a storage in canonical sibling order
    pub fn children<'s>(
        &'s self,
        entry: &'s DirectoryEntry,
    ) -> impl Iterator<Item = &'s DirectoryEntry> + 's {
        entry
            .children
            .iter()
            .filter_map(move |&sid| self.entries.get(sid as usize))
    }

    /// Find a directory entry by path (case-insensitive per segment)
    ///
    /// An empty path resolves to the root entry.
    pub fn entry(&self, path: &[&str]) -> Result<&DirectoryEntry, OleError> {
        let mut current = self.root();
        for (depth, name) in path.iter().enumerate() {
            current = self
                .children(current)
                .find(|child| names_equal(&child.name, name))
                .ok_or_else(|| OleError::NotFound(path[..=depth].join("/")))?;
        }
        Ok(current)
    }

    /// Check if an entry exists
    pub fn exists(&self, path: &[&str]) -> bool {
        self.entry(path).is_ok()
    }

    /// Check if a storage exists at the given path
    pub fn is_storage(&self, path: &[&str]) -> bool {
        self.entry(path).is_ok_and(DirectoryEntry::is_storage)
    }

    /// Entries directly under a storage, in canonical order
    pub fn list_entries(&self, path: &[&str]) -> Result<Vec<&DirectoryEntry>, OleError> {
        let entry = self.entry(path)?;
        if !entry.is_storage() {
            return Err(OleError::NotAStorage(path.join("/")));
        }
        Ok(self.children(entry).collect())
    }

    /// List all streams in the OLE file
    ///
    /// Returns stream paths depth-first, siblings in canonical order.
    pub fn list_streams(&self) -> Vec<Vec<String>> {
        let mut streams = Vec::new();
        self.collect_streams(self.root(), &mut Vec::new(), &mut streams);
        streams
    }

    fn collect_streams(
        &self,
        storage: &DirectoryEntry,
        path: &mut Vec<String>,
        streams: &mut Vec<Vec<String>>,
    ) {
        for child in self.children(storage) {
            path.push(child.name.clone());
            if child.is_stream() {
                streams.push(path.clone());
            } else if child.is_storage() {
                self.collect_streams(child, path, streams);
            }
            path.pop();
        }
    }

    /// Open a stream by path and return its contents
    pub fn get_stream(&self, path: &[&str]) -> Result<Vec<u8>, OleError> {
        let entry = self.entry(path)?;
        self.read_stream(entry)
    }

    /// Read the contents of a stream entry
    ///
    /// # Errors
    ///
    /// [`OleError::CorruptChain`] if the chain cycles, points outside its table
    /// or the file, or ends before the declared size. Only this read fails.
    pub fn read_stream(&self, entry: &DirectoryEntry) -> Result<Vec<u8>, OleError> {
        if !entry.is_stream() {
            return Err(OleError::NotAStream(entry.name.clone()));
        }
        if entry.size == 0 {
            return Ok(Vec::new());
        }
        if entry.is_minifat {
            self.read_mini_stream(entry)
        } else {
            self.read_regular_stream(entry)
        }
    }

    fn read_regular_stream(&self, entry: &DirectoryEntry) -> Result<Vec<u8>, OleError> {
        let size = entry.size as usize;
        let sector_size = self.sector_size.bytes();
        let chain = walk_chain(&self.fat, entry.start_sector, Some(size.div_ceil(sector_size)))
            .map_err(|e| chain_error(entry, e))?;

        let mut data = Vec::with_capacity(size.min(self.data.len()));
        for sector_id in chain {
            let wanted = (size - data.len()).min(sector_size);
            let bytes = self
                .sector(sector_id)
                .filter(|bytes| bytes.len() >= wanted)
                .ok_or_else(|| {
                    OleError::CorruptChain(format!(
                        "{}: sector {} lies outside the file",
                        entry.name, sector_id
                    ))
                })?;
            data.extend_from_slice(&bytes[..wanted]);
        }
        Ok(data)
    }

    fn read_mini_stream(&self, entry: &DirectoryEntry) -> Result<Vec<u8>, OleError> {
        let ministream = self.ministream_sectors.as_ref().ok_or_else(|| {
            OleError::CorruptChain(format!("{}: mini stream is unreadable", entry.name))
        })?;
        let size = entry.size as usize;
        let sector_size = self.sector_size.bytes();
        let chain = walk_chain(
            &self.minifat,
            entry.start_sector,
            Some(size.div_ceil(MINI_SECTOR_SIZE)),
        )
        .map_err(|e| chain_error(entry, e))?;

        let mut data = Vec::with_capacity(size.min(self.data.len()));
        for mini_sector in chain {
            let offset = mini_sector as usize * MINI_SECTOR_SIZE;
            let wanted = (size - data.len()).min(MINI_SECTOR_SIZE);
            let within = offset % sector_size;
            let bytes = ministream
                .get(offset / sector_size)
                .and_then(|&sector_id| self.sector(sector_id))
                .and_then(|sector| sector.get(within..within + wanted))
                .ok_or_else(|| {
                    OleError::CorruptChain(format!(
                        "{}: mini sector {} lies outside the mini stream",
                        entry.name, mini_sector
                    ))
                })?;
            data.extend_from_slice(bytes);
        }
        Ok(data)
    }
}

fn chain_error(entry: &DirectoryEntry, err: OleError) -> OleError {
    match err {
        OleError::CorruptChain(msg) => OleError::CorruptChain(format!("{}: {}", entry.name, msg)),
        other => other,
    }
}

/// Follow a chain through a FAT or MiniFAT.
///
/// With `limit`, stops after that many links and fails if the chain ends
/// sooner; without it, follows the chain to ENDOFCHAIN.
fn walk_chain(table: &[u32], start: u32, limit: Option<usize>) -> Result<Vec<u32>, OleError> {
    let mut visited = FixedBitSet::with_capacity(table.len());
    let mut chain = Vec::with_capacity(limit.unwrap_or(0).min(table.len()));
    let mut sector = start;

    loop {
        if limit.is_some_and(|limit| chain.len() == limit) {
            return Ok(chain);
        }
        if sector == ENDOFCHAIN {
            return match limit {
                Some(limit) => Err(OleError::CorruptChain(format!(
                    "chain ended after {} of {} sectors",
                    chain.len(),
                    limit
                ))),
                None => Ok(chain),
            };
        }
        if sector > MAXREGSECT {
            return Err(OleError::CorruptChain(format!(
                "chain runs into reserved marker {:#X}",
                sector
            )));
        }
        let idx = sector as usize;
        if idx >= table.len() {
            return Err(OleError::CorruptChain(format!(
                "sector {:#X} is outside the allocation table",
                sector
            )));
        }
        if visited.put(idx) {
            return Err(OleError::CorruptChain(format!(
                "chain cycles back to sector {}",
                sector
            )));
        }
        chain.push(sector);
        sector = table[idx];
    }
}

/// Decode UTF-16LE bytes to String
fn decode_utf16le(bytes: &[u8]) -> String {
    let (text, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(bytes);
    text.trim_end_matches('\0').to_string()
}

/// Format CLSID as a human-readable string
fn format_clsid(bytes: &[u8; 16]) -> Option<String> {
    if bytes.iter().all(|&b| b == 0) {
        return None;
    }

    Some(format!(
        "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        u16::from_le_bytes([bytes[4], bytes[5]]),
        u16::from_le_bytes([bytes[6], bytes[7]]),
        bytes[8],
        bytes[9],
        bytes[10],
        bytes[11],
        bytes[12],
        bytes[13],
        bytes[14],
        bytes[15],
    ))
}

/// Check if a file/data is an OLE file by checking magic bytes
pub fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= MINIMAL_OLEFILE_SIZE && &data[0..8] == MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::writer::OleWriter;

    fn patch_u32(data: &mut [u8], offset: usize, value: u32) {
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn test_rejects_missing_signature() {
        let mut data = OleWriter::new().export().unwrap();
        data[0] = 0;
        assert!(matches!(OleFile::open(&data), Err(OleError::Format(_))));
        assert!(matches!(OleFile::open(&[0u8; 100]), Err(OleError::Format(_))));
    }

    #[test]
    fn test_rejects_inconsistent_header() {
        let mut data = OleWriter::new().export().unwrap();
        // sector shift 12 with major version 3
        data[30..32].copy_from_slice(&12u16.to_le_bytes());
        assert!(matches!(OleFile::open(&data), Err(OleError::Format(_))));

        let mut data = OleWriter::new().export().unwrap();
        patch_u32(&mut data, 56, 8192);
        assert!(matches!(OleFile::open(&data), Err(OleError::Format(_))));
    }

    #[test]
    fn test_empty_container() {
        let data = OleWriter::new().export().unwrap();
        assert!(is_ole_file(&data));
        let ole = OleFile::open(&data).unwrap();
        assert_eq!(ole.root_name(), ROOT_ENTRY_NAME);
        assert!(ole.list_streams().is_empty());
        assert_eq!(ole.sector_size(), SectorSize::V3);
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_reports_missing_segment() {
        let mut writer = OleWriter::new();
        writer.add_storage(&["Store"]).unwrap();
        writer.add_stream(&["Store", "Data"], b"payload".to_vec()).unwrap();
        let data = writer.export().unwrap();
        let ole = OleFile::open(&data).unwrap();

        assert_eq!(ole.get_stream(&["STORE", "data"]).unwrap(), b"payload");
        assert!(ole.is_storage(&["store"]));
        match ole.entry(&["Store", "Missing", "Deeper"]) {
            Err(OleError::NotFound(path)) => assert_eq!(path, "Store/Missing"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            ole.get_stream(&["Store"]),
            Err(OleError::NotAStream(_))
        ));
    }

    #[test]
    fn test_children_sorted_regardless_of_physical_order() {
        let mut writer = OleWriter::new();
        for name in ["abc", "Z", "ab"] {
            writer.add_stream(&[name], vec![1u8, 2, 3]).unwrap();
        }
        let data = writer.export().unwrap();
        let ole = OleFile::open(&data).unwrap();
        let names: Vec<&str> = ole.children(ole.root()).map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Z", "ab", "abc"]);
    }

    #[test]
    fn test_regular_chain_cycle_only_fails_that_stream() {
        let mut writer = OleWriter::new();
        writer.add_stream(&["Big"], vec![0x11u8; 5000]).unwrap();
        writer.add_stream(&["Small"], b"still fine".to_vec()).unwrap();
        let mut data = writer.export().unwrap();

        let ole = OleFile::open(&data).unwrap();
        let start = ole.entry(&["Big"]).unwrap().start_sector;
        drop(ole);

        // FAT sector 0 sits right after the header; point the second link back at the first
        patch_u32(&mut data, 512 + 4 * (start as usize + 1), start);
        let ole = OleFile::open(&data).unwrap();
        assert!(matches!(ole.get_stream(&["Big"]), Err(OleError::CorruptChain(_))));
        assert_eq!(ole.get_stream(&["Small"]).unwrap(), b"still fine");
    }

    #[test]
    fn test_truncated_chain_is_corrupt() {
        let mut writer = OleWriter::new();
        writer.add_stream(&["Big"], vec![0x22u8; 5000]).unwrap();
        let mut data = writer.export().unwrap();
        let start = OleFile::open(&data).unwrap().entry(&["Big"]).unwrap().start_sector;

        patch_u32(&mut data, 512 + 4 * (start as usize + 2), ENDOFCHAIN);
        let ole = OleFile::open(&data).unwrap();
        assert!(matches!(ole.get_stream(&["Big"]), Err(OleError::CorruptChain(_))));
    }

    #[test]
    fn test_chain_into_free_marker_is_corrupt() {
        let mut writer = OleWriter::new();
        writer.add_stream(&["Big"], vec![0x44u8; 5000]).unwrap();
        let mut data = writer.export().unwrap();
        let start = OleFile::open(&data).unwrap().entry(&["Big"]).unwrap().start_sector;

        patch_u32(&mut data, 512 + 4 * (start as usize + 1), FREESECT);
        let ole = OleFile::open(&data).unwrap();
        match ole.get_stream(&["Big"]) {
            Err(OleError::CorruptChain(msg)) => assert!(msg.contains("reserved marker")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_walk_chain_markers() {
        let table = [1, ENDOFCHAIN, DIFSECT];
        assert_eq!(walk_chain(&table, 0, None).unwrap(), vec![0, 1]);
        assert!(matches!(walk_chain(&table, 2, None), Err(OleError::CorruptChain(_))));
        assert!(matches!(walk_chain(&table, FATSECT, None), Err(OleError::CorruptChain(_))));
        assert!(matches!(walk_chain(&table, 0, Some(3)), Err(OleError::CorruptChain(_))));
    }

    #[test]
    fn test_entry_by_sid() {
        let mut writer = OleWriter::new();
        writer.add_stream(&["B"], vec![2u8]).unwrap();
        writer.add_stream(&["A"], vec![1u8]).unwrap();
        let data = writer.export().unwrap();
        let ole = OleFile::open(&data).unwrap();

        assert_eq!(ole.entry_by_sid(0).map(|e| e.kind), Some(EntryKind::Root));
        assert_eq!(ole.entry_by_sid(1).map(|e| e.name.as_str()), Some("A"));
        let b = ole.entry(&["B"]).unwrap();
        assert_eq!(ole.entry_by_sid(b.sid).map(|e| e.name.as_str()), Some("B"));
        assert!(ole.entry_by_sid(ole.entry_count() as u32).is_none());
    }

    #[test]
    fn test_reserved_sibling_id_is_format_error() {
        let mut writer = OleWriter::new();
        writer.add_stream(&["A"], vec![1u8]).unwrap();
        let mut data = writer.export().unwrap();

        // Entry 1 ("A") gets a right sibling id in the reserved range
        let entry_a = 2 * 512 + DIRENTRY_SIZE;
        patch_u32(&mut data, entry_a + 72, MAXREGSID + 1);
        assert!(matches!(OleFile::open(&data), Err(OleError::Format(_))));
    }

    #[test]
    fn test_minifat_cycle_is_corrupt() {
        let mut writer = OleWriter::new();
        writer.add_stream(&["Small"], vec![0x33u8; 100]).unwrap();
        let mut data = writer.export().unwrap();

        // Layout: FAT 0, directory 1, MiniFAT 2, mini stream 3
        let minifat_offset = (2 + 1) * 512;
        assert_eq!(
            u32::from_le_bytes(data[minifat_offset..minifat_offset + 4].try_into().unwrap()),
            1
        );
        // First mini sector now links to itself
        patch_u32(&mut data, minifat_offset, 0);
        let ole = OleFile::open(&data).unwrap();
        assert!(matches!(ole.get_stream(&["Small"]), Err(OleError::CorruptChain(_))));
    }

    #[test]
    fn test_directory_cycle_is_format_error() {
        let mut writer = OleWriter::new();
        writer.add_stream(&["A"], vec![1u8]).unwrap();
        writer.add_stream(&["B"], vec![2u8]).unwrap();
        let mut data = writer.export().unwrap();

        // Directory sector 1: root's child is "B" (entry 2) whose left sibling is "A" (entry 1).
        // Pointing A's left link back at B closes a loop.
        let dir_offset = 2 * 512;
        let entry_a = dir_offset + DIRENTRY_SIZE;
        let entry_b = dir_offset + 2 * DIRENTRY_SIZE;
        let b_left = u32::from_le_bytes(data[entry_b + 68..entry_b + 72].try_into().unwrap());
        assert_eq!(b_left, 1);
        patch_u32(&mut data, entry_a + 68, 2);
        assert!(matches!(OleFile::open(&data), Err(OleError::Format(_))));
    }

    #[test]
    fn test_clsid_format() {
        let clsid = [
            0x06, 0x09, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x46,
        ];
        assert_eq!(
            format_clsid(&clsid).as_deref(),
            Some("00020906-0000-0000-C000-000000000046")
        );
        assert_eq!(format_clsid(&[0; 16]), None);
    }
}
