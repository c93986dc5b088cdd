//! OLE file writer implementation
//!
//! Builds an in-memory tree of storages and streams and serializes it to a
//! complete compound file image.
//!
//! # Architecture
//!
//! The tree is an arena of nodes addressed by index; every mutation is
//! validated immediately, so an export never sees an invalid tree. Export
//! recomputes the whole layout from scratch and only returns bytes once all
//! sector accounting has succeeded.
//!
//! # Layout
//!
//! ```text
//! header | FAT | DIFAT | directory | MiniFAT | mini stream | streams...
//! ```
//!
//! Directory indices follow a pre-order walk of the tree with children in
//! canonical order, and regular streams are laid out in that same order.
//!
//! # Example
//!
//! ```rust
//! use loquat::ole::{OleFile, OleWriter};
//!
//! let mut writer = OleWriter::new();
//! writer.add_stream(&["MyStream"], b"Hello, World!".to_vec())?;
//! writer.add_storage(&["MyStorage"])?;
//! writer.add_stream(&["MyStorage", "NestedStream"], b"Nested content".to_vec())?;
//!
//! let bytes = writer.export()?;
//! let ole = OleFile::open(&bytes)?;
//! assert_eq!(ole.get_stream(&["MyStorage", "NestedStream"])?, b"Nested content");
//! # Ok::<(), loquat::ole::OleError>(())
//! ```
use super::super::consts::*;
use super::super::file::{EntryKind, OleError, OleFile};
use super::super::name::{compare_names, names_equal, validate_name};
use super::super::raw::SectorSize;
use super::difat::{DifatBuilder, difat_sector_count};
use super::directory::DirectoryBuilder;
use super::fat::FatBuilder;
use super::header::HeaderBuilder;
use super::minifat::MiniFatBuilder;
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Payload of a new entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryData {
    Stream(Vec<u8>),
    Storage,
}

/// Directory metadata stored alongside an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOptions {
    pub clsid: [u8; 16],
    pub state_bits: u32,
    /// Creation time (FILETIME ticks)
    pub created: u64,
    /// Modification time (FILETIME ticks)
    pub modified: u64,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Storage,
    Stream(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    kind: NodeKind,
    options: EntryOptions,
    /// Arena indices in insertion order
    children: Vec<usize>,
}

/// Where a stream's payload ends up
enum Placement {
    Empty,
    Mini(u32),
    Regular(usize),
}

/// OLE file writer
#[derive(Debug, Clone)]
pub struct OleWriter {
    sector_size: SectorSize,
    /// Node arena; deleted slots are `None`, index 0 is the root
    nodes: Vec<Option<Node>>,
}

impl OleWriter {
    /// Create a new empty OLE writer with 512-byte sectors
    pub fn new() -> Self {
        Self::with_sector_size(SectorSize::V3)
    }

    pub fn with_sector_size(sector_size: SectorSize) -> Self {
        OleWriter {
            sector_size,
            nodes: vec![Some(Node {
                name: ROOT_ENTRY_NAME.to_string(),
                kind: NodeKind::Root,
                options: EntryOptions::default(),
                children: Vec::new(),
            })],
        }
    }

    /// Copy the whole tree of a parsed container, metadata included
    pub fn from_container(ole: &OleFile<'_>) -> Result<Self, OleError> {
        let mut writer = Self::with_sector_size(ole.sector_size());
        let root = ole.root();
        if let Some(node) = writer.node_mut(0) {
            node.options = options_of(root);
        }

        let mut pending = vec![(root, Vec::<String>::new())];
        while let Some((storage, path)) = pending.pop() {
            for child in ole.children(storage) {
                let mut child_path = path.clone();
                child_path.push(child.name.clone());
                let segments: Vec<&str> = child_path.iter().map(String::as_str).collect();

                if child.is_storage() {
                    writer.add_entry_with(&segments, EntryData::Storage, options_of(child))?;
                    pending.push((child, child_path));
                } else if child.is_stream() {
                    let data = ole.read_stream(child)?;
                    writer.add_entry_with(&segments, EntryData::Stream(data), options_of(child))?;
                }
            }
        }

        Ok(writer)
    }

    pub fn sector_size(&self) -> SectorSize {
        self.sector_size
    }

    /// Set the CLSID (Class ID) for the root entry
    pub fn set_root_clsid(&mut self, clsid: [u8; 16]) {
        if let Some(root) = self.node_mut(0) {
            root.options.clsid = clsid;
        }
    }

    fn node(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node> {
        self.nodes.get_mut(idx).and_then(Option::as_mut)
    }

    fn find_child(&self, parent: usize, name: &str) -> Option<usize> {
        self.node(parent)?
            .children
            .iter()
            .copied()
            .find(|&idx| self.node(idx).is_some_and(|child| names_equal(&child.name, name)))
    }

    /// Resolve a path to an arena index; the empty path is the root
    fn resolve(&self, path: &[&str]) -> Result<usize, OleError> {
        let mut current = 0;
        for (depth, name) in path.iter().enumerate() {
            let in_stream =
                matches!(self.node(current).map(|n| &n.kind), Some(NodeKind::Stream(_)));
            if depth > 0 && in_stream {
                return Err(OleError::NotAStorage(path[..depth].join("/")));
            }
            current = self
                .find_child(current, name)
                .ok_or_else(|| OleError::NotFound(path[..=depth].join("/")))?;
        }
        Ok(current)
    }

    /// Check whether a path exists (case-insensitive)
    pub fn contains(&self, path: &[&str]) -> bool {
        self.resolve(path).is_ok()
    }

    /// Add a stream or storage at `path`
    ///
    /// # Errors
    ///
    /// - [`OleError::InvalidPath`] for an empty path or segment
    /// - [`OleError::NameTooLong`] for a segment over 31 UTF-16 units
    /// - [`OleError::IllegalCharacter`] for `/`, `\`, `:` or `!` in a segment
    /// - [`OleError::NotFound`] if an intermediate storage is missing
    /// - [`OleError::NotAStorage`] if an intermediate segment is a stream
    /// - [`OleError::AlreadyExists`] if the path is taken, ignoring case
    pub fn add_entry(&mut self, path: &[&str], data: EntryData) -> Result<(), OleError> {
        self.add_entry_with(path, data, EntryOptions::default())
    }

    /// Add an entry with explicit directory metadata
    pub fn add_entry_with(
        &mut self,
        path: &[&str],
        data: EntryData,
        options: EntryOptions,
    ) -> Result<(), OleError> {
        let Some((name, parent_path)) = path.split_last() else {
            return Err(OleError::InvalidPath("empty path".to_string()));
        };
        for segment in path {
            validate_name(segment)?;
        }

        let parent = self.resolve(parent_path)?;
        let parent_node = self
            .node(parent)
            .ok_or_else(|| OleError::NotFound(parent_path.join("/")))?;
        if let NodeKind::Stream(_) = parent_node.kind {
            return Err(OleError::NotAStorage(parent_path.join("/")));
        }
        if self.find_child(parent, name).is_some() {
            return Err(OleError::AlreadyExists(path.join("/")));
        }

        let kind = match data {
            EntryData::Stream(bytes) => NodeKind::Stream(bytes),
            EntryData::Storage => NodeKind::Storage,
        };
        let idx = self.nodes.len();
        self.nodes.push(Some(Node {
            name: (*name).to_string(),
            kind,
            options,
            children: Vec::new(),
        }));
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(idx);
        }
        Ok(())
    }

    /// Add a stream at `path`
    pub fn add_stream(&mut self, path: &[&str], data: impl Into<Vec<u8>>) -> Result<(), OleError> {
        self.add_entry(path, EntryData::Stream(data.into()))
    }

    /// Add an empty storage at `path`
    pub fn add_storage(&mut self, path: &[&str]) -> Result<(), OleError> {
        self.add_entry(path, EntryData::Storage)
    }

    /// Replace the payload of an existing stream
    pub fn edit_entry(&mut self, path: &[&str], data: impl Into<Vec<u8>>) -> Result<(), OleError> {
        let idx = self.resolve(path)?;
        match self.node_mut(idx) {
            Some(Node {
                kind: NodeKind::Stream(bytes),
                ..
            }) => {
                *bytes = data.into();
                Ok(())
            },
            _ => Err(OleError::NotAStream(path.join("/"))),
        }
    }

    /// Delete a stream, or a storage with everything below it
    pub fn delete_entry(&mut self, path: &[&str]) -> Result<(), OleError> {
        let Some((_, parent_path)) = path.split_last() else {
            return Err(OleError::InvalidPath("cannot delete the root entry".to_string()));
        };
        let idx = self.resolve(path)?;
        let parent = self.resolve(parent_path)?;
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.retain(|&child| child != idx);
        }

        let mut pending = vec![idx];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(current).and_then(Option::take) {
                pending.extend(node.children);
            }
        }
        Ok(())
    }

    /// Pre-order walk with children in canonical order
    fn flatten(&self) -> Vec<(usize, Vec<usize>)> {
        let mut order = Vec::new();
        let mut pending = vec![0usize];
        while let Some(idx) = pending.pop() {
            let Some(node) = self.node(idx) else {
                continue;
            };
            let mut children: Vec<usize> = node
                .children
                .iter()
                .copied()
                .filter(|&child| self.node(child).is_some())
                .collect();
            children.sort_by(|&a, &b| match (self.node(a), self.node(b)) {
                (Some(a), Some(b)) => compare_names(&a.name, &b.name),
                _ => std::cmp::Ordering::Equal,
            });
            // Push in reverse so the first child is visited next
            pending.extend(children.iter().rev());
            order.push((idx, children));
        }
        order
    }

    /// Serialize the tree to a complete container image
    pub fn export(&self) -> Result<Vec<u8>, OleError> {
        let sector_size = self.sector_size;
        let sector_bytes = sector_size.bytes();
        let order = self.flatten();

        // Place payloads: small ones into the mini stream, large ones into regular sectors
        let mut minifat = MiniFatBuilder::new();
        let mut regular: Vec<&[u8]> = Vec::new();
        let mut placements = Vec::with_capacity(order.len());
        for (idx, _) in &order {
            let placement = match self.node(*idx).map(|n| &n.kind) {
                Some(NodeKind::Stream(data)) if data.is_empty() => Placement::Empty,
                Some(NodeKind::Stream(data)) if data.len() < MINI_STREAM_CUTOFF as usize => {
                    Placement::Mini(minifat.allocate_mini_chain(data))
                },
                Some(NodeKind::Stream(data)) => {
                    regular.push(data);
                    Placement::Regular(regular.len() - 1)
                },
                _ => Placement::Empty,
            };
            placements.push(placement);
        }

        let ministream = minifat.ministream_data();
        let dir_sectors = (order.len() * DIRENTRY_SIZE).div_ceil(sector_bytes) as u32;
        let minifat_sectors = minifat.sector_count(sector_size) as u32;
        let ministream_sectors = ministream.len().div_ceil(sector_bytes) as u32;
        let regular_sectors: u32 = regular
            .iter()
            .map(|data| data.len().div_ceil(sector_bytes) as u32)
            .sum();
        let n_used = dir_sectors + minifat_sectors + ministream_sectors + regular_sectors;

        // The FAT has to describe its own sectors and the DIFAT's, so iterate to a fixed point
        let entries_per_fat_sector = sector_size.entries_per_sector() as u32;
        let mut n_fat: u32 = 0;
        let mut n_difat: u32 = 0;
        loop {
            let new_n_fat = (n_used + n_fat + n_difat).div_ceil(entries_per_fat_sector);
            let new_n_difat = difat_sector_count(new_n_fat, sector_size);
            if new_n_fat == n_fat && new_n_difat == n_difat {
                break;
            }
            n_fat = new_n_fat;
            n_difat = new_n_difat;
        }

        // Allocation order is physical order
        let mut fat = FatBuilder::new(sector_size);
        let fat_start = fat.allocate_special(n_fat, FATSECT);
        let difat_start = fat.allocate_special(n_difat, DIFSECT);
        let dir_start = fat.allocate_chain(dir_sectors as usize * sector_bytes);
        let minifat_start = fat.allocate_chain(minifat_sectors as usize * sector_bytes);
        let ministream_start = fat.allocate_chain(ministream.len());
        let regular_starts: Vec<u32> =
            regular.iter().map(|data| fat.allocate_chain(data.len())).collect();

        fat.validate()
            .map_err(|e| OleError::InvalidData(format!("FAT validation failed: {}", e)))?;

        // Directory entries in pre-order
        let mut directory = DirectoryBuilder::new();
        for ((idx, _), placement) in order.iter().zip(&placements) {
            let node = self
                .node(*idx)
                .ok_or_else(|| OleError::InvalidData(format!("dangling node {}", idx)))?;
            let (kind, start, size) = match (&node.kind, placement) {
                (NodeKind::Root, _) => (EntryKind::Root, ministream_start, ministream.len() as u64),
                (NodeKind::Storage, _) => (EntryKind::Storage, 0, 0),
                (NodeKind::Stream(_), Placement::Empty) => (EntryKind::Stream, ENDOFCHAIN, 0),
                (NodeKind::Stream(data), Placement::Mini(start)) => {
                    (EntryKind::Stream, *start, data.len() as u64)
                },
                (NodeKind::Stream(data), Placement::Regular(i)) => {
                    (EntryKind::Stream, regular_starts[*i], data.len() as u64)
                },
            };
            directory.push(&node.name, kind, &node.options, start, size);
        }

        // Children lists refer to arena indices; map them to directory SIDs
        let mut sid_of = vec![NOSTREAM; self.nodes.len()];
        for (sid, (idx, _)) in order.iter().enumerate() {
            sid_of[*idx] = sid as u32;
        }
        for (sid, (_, children)) in order.iter().enumerate() {
            let sorted: Vec<u32> = children.iter().map(|&child| sid_of[child]).collect();
            directory.link_children(sid as u32, &sorted);
        }

        let fat_sector_ids: Vec<u32> = (fat_start..fat_start + n_fat).collect();
        let mut header = HeaderBuilder::new(sector_size);
        header.set_directory(dir_start, dir_sectors);
        header.set_fat_sectors(&fat_sector_ids);
        if minifat_sectors > 0 {
            header.set_minifat(minifat_start, minifat_sectors);
        }
        if n_difat > 0 {
            header.set_difat(difat_start, n_difat);
        }

        // === Assemble the image ===
        let total_sectors = fat.total_sectors() as usize;
        let mut out = Vec::with_capacity((total_sectors + 1) * sector_bytes);
        out.extend_from_slice(&header.generate());
        out.extend_from_slice(&fat.generate_fat_sectors(n_fat));
        let difat = DifatBuilder::new(&fat_sector_ids, sector_size);
        out.extend_from_slice(&difat.generate_difat_sectors(difat_start));
        out.extend_from_slice(&directory.generate_directory_stream(sector_size));
        out.extend_from_slice(&minifat.generate_minifat_sectors(sector_size));
        write_padded(&mut out, ministream, sector_bytes);
        for data in &regular {
            write_padded(&mut out, data, sector_bytes);
        }

        if out.len() != (total_sectors + 1) * sector_bytes {
            return Err(OleError::InvalidData(format!(
                "layout produced {} bytes, expected {} sectors",
                out.len(),
                total_sectors + 1
            )));
        }

        debug!(
            "Exported OLE file: {} entries, {} sectors, {} FAT, {} DIFAT",
            directory.entry_count(),
            total_sectors,
            n_fat,
            n_difat
        );

        Ok(out)
    }

    /// Export and write the image to `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), OleError> {
        let bytes = self.export()?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Save the OLE file to a file path
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), OleError> {
        let bytes = self.export()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl Default for OleWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn options_of(entry: &super::super::file::DirectoryEntry) -> EntryOptions {
    EntryOptions {
        clsid: entry.clsid,
        state_bits: entry.state_bits,
        created: entry.creation_time,
        modified: entry.modified_time,
    }
}

/// Append `data` zero-padded to a whole number of sectors
fn write_padded(out: &mut Vec<u8>, data: &[u8], sector_bytes: usize) {
    out.extend_from_slice(data);
    let padded = data.len().div_ceil(sector_bytes) * sector_bytes;
    out.resize(out.len() + padded - data.len(), 0);
}
