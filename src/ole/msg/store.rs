//! Keyed collection decoded from a `__properties_version1.0` stream.
//!
//! The stream starts with a header whose size depends on the storage that
//! holds it, followed by an array of 16-byte descriptors:
//!
//! ```text
//! Message:          8 reserved | 4 x u32 counters | 8 reserved | records
//! Embedded message: 8 reserved | 4 x u32 counters | records
//! Attachment:       8 reserved | records
//! Recipient:        8 reserved | records
//! ```
//!
//! A store is read-only unless constructed writable. Mutation happens on a
//! writable copy obtained through [`PropertiesStore::make_writable`], never on
//! the original bytes.

use super::property::{PROPERTY_RECORD_SIZE, PropertyError, PropertyRecord};
use super::value::PropertyValue;
use crate::common::binary::{BinaryError, ByteCursor};
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, warn};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::HashMap;

const RESERVED_SIZE: usize = 8;

/// Keys consulted by [`PropertiesStore::date`], in priority order:
/// client submit time, last modification time, creation time.
const DATE_KEYS: [&str; 3] = ["00390040", "30080040", "30070040"];

/// Storage kind that owns a property stream; selects the header layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertiesKind {
    Message,
    MessageEmbedded,
    Attachment,
    Recipient,
}

impl PropertiesKind {
    /// Header size in bytes
    pub fn header_size(self) -> usize {
        match self {
            PropertiesKind::Message => 32,
            PropertiesKind::MessageEmbedded => 24,
            PropertiesKind::Attachment | PropertiesKind::Recipient => 8,
        }
    }

    /// Whether the header carries recipient/attachment counters
    pub fn has_counters(self) -> bool {
        matches!(self, PropertiesKind::Message | PropertiesKind::MessageEmbedded)
    }
}

/// Counters stored in message headers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCounters {
    pub next_recipient_id: u32,
    pub next_attachment_id: u32,
    pub recipient_count: u32,
    pub attachment_count: u32,
}

struct ParsedStream {
    reserved: [u8; RESERVED_SIZE],
    counters: HeaderCounters,
    trailing_reserved: [u8; RESERVED_SIZE],
    records: Vec<PropertyRecord>,
}

fn parse_stream(data: &[u8], kind: PropertiesKind) -> Result<ParsedStream, BinaryError> {
    let mut cursor = ByteCursor::new(data);
    let reserved = cursor.read_array::<RESERVED_SIZE>()?;

    let mut counters = HeaderCounters::default();
    let mut trailing_reserved = [0u8; RESERVED_SIZE];
    if kind.has_counters() {
        counters.next_recipient_id = cursor.read_u32()?;
        counters.next_attachment_id = cursor.read_u32()?;
        counters.recipient_count = cursor.read_u32()?;
        counters.attachment_count = cursor.read_u32()?;
    }
    if kind == PropertiesKind::Message {
        trailing_reserved = cursor.read_array::<RESERVED_SIZE>()?;
    }

    let body = cursor.read_rest();
    let chunks = body.chunks_exact(PROPERTY_RECORD_SIZE);
    if !chunks.remainder().is_empty() {
        warn!(
            "Property stream has {} trailing bytes after {} records; dropped",
            chunks.remainder().len(),
            chunks.len()
        );
    }
    let records = chunks
        .filter_map(|chunk| <&[u8; PROPERTY_RECORD_SIZE]>::try_from(chunk).ok())
        .map(PropertyRecord::decode)
        .collect();

    Ok(ParsedStream {
        reserved,
        counters,
        trailing_reserved,
        records,
    })
}

/// Property descriptors of one message, attachment or recipient
#[derive(Debug, Clone)]
pub struct PropertiesStore {
    kind: PropertiesKind,
    writable: bool,
    is_error: bool,
    original: Bytes,
    reserved: [u8; RESERVED_SIZE],
    counters: HeaderCounters,
    trailing_reserved: [u8; RESERVED_SIZE],
    records: IndexMap<String, PropertyRecord>,
    /// 4-hex property id to every key sharing it, in insertion order
    ids: HashMap<String, SmallVec<[String; 2]>>,
    date: OnceCell<Option<DateTime<Utc>>>,
}

impl PropertiesStore {
    /// Decode a property stream
    ///
    /// Never fails. Empty input gives an empty store that reports
    /// [`is_error`](Self::is_error) unless `writable` is set; input shorter
    /// than the header always reports an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use loquat::ole::msg::{PropertiesKind, PropertiesStore};
    ///
    /// let mut data = vec![0u8; 8];
    /// data.extend_from_slice(&[0x03, 0x00, 0x07, 0x0E, 0x02, 0, 0, 0, 0x11, 0, 0, 0, 0, 0, 0, 0]);
    /// let store = PropertiesStore::new(data, PropertiesKind::Attachment, false);
    /// assert_eq!(store.len(), 1);
    /// assert!(store.get("0e07").is_some());
    /// ```
    pub fn new(data: impl Into<Bytes>, kind: PropertiesKind, writable: bool) -> Self {
        let original: Bytes = data.into();
        let mut store = PropertiesStore {
            kind,
            writable,
            is_error: false,
            original: original.clone(),
            reserved: [0; RESERVED_SIZE],
            counters: HeaderCounters::default(),
            trailing_reserved: [0; RESERVED_SIZE],
            records: IndexMap::new(),
            ids: HashMap::new(),
            date: OnceCell::new(),
        };

        if original.is_empty() {
            store.is_error = !writable;
            return store;
        }

        match parse_stream(&original, kind) {
            Ok(parsed) => {
                store.reserved = parsed.reserved;
                store.counters = parsed.counters;
                store.trailing_reserved = parsed.trailing_reserved;
                for record in parsed.records {
                    let key = record.key();
                    if store.records.contains_key(&key) {
                        warn!("Duplicate property {} in stream; keeping the first", key);
                        continue;
                    }
                    store.index_id(&record, &key);
                    store.records.insert(key, record);
                }
                debug!("Decoded {} properties ({:?})", store.records.len(), kind);
            },
            Err(e) => {
                warn!(
                    "Property stream of {} bytes is shorter than the {:?} header: {}",
                    original.len(),
                    kind,
                    e
                );
                store.is_error = true;
            },
        }
        store
    }

    /// Empty writable store
    pub fn new_writable(kind: PropertiesKind) -> Self {
        Self::new(Bytes::new(), kind, true)
    }

    #[inline]
    pub fn kind(&self) -> PropertiesKind {
        self.kind
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether the input could not be decoded
    #[inline]
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header counters
    ///
    /// # Errors
    ///
    /// [`PropertyError::TypeMismatch`] for attachment and recipient stores.
    pub fn counters(&self) -> Result<HeaderCounters, PropertyError> {
        self.check_counters()?;
        Ok(self.counters)
    }

    pub fn next_recipient_id(&self) -> Result<u32, PropertyError> {
        Ok(self.counters()?.next_recipient_id)
    }

    pub fn next_attachment_id(&self) -> Result<u32, PropertyError> {
        Ok(self.counters()?.next_attachment_id)
    }

    pub fn recipient_count(&self) -> Result<u32, PropertyError> {
        Ok(self.counters()?.recipient_count)
    }

    pub fn attachment_count(&self) -> Result<u32, PropertyError> {
        Ok(self.counters()?.attachment_count)
    }

    pub fn set_next_recipient_id(&mut self, value: u32) -> Result<(), PropertyError> {
        self.counters_mut()?.next_recipient_id = value;
        Ok(())
    }

    pub fn set_next_attachment_id(&mut self, value: u32) -> Result<(), PropertyError> {
        self.counters_mut()?.next_attachment_id = value;
        Ok(())
    }

    pub fn set_recipient_count(&mut self, value: u32) -> Result<(), PropertyError> {
        self.counters_mut()?.recipient_count = value;
        Ok(())
    }

    pub fn set_attachment_count(&mut self, value: u32) -> Result<(), PropertyError> {
        self.counters_mut()?.attachment_count = value;
        Ok(())
    }

    /// Look up a record
    ///
    /// A 4-hex id returns the first record with that property id; an 8-hex
    /// key (`IIIITTTT`) must match exactly. Case-insensitive.
    pub fn get(&self, id: &str) -> Option<&PropertyRecord> {
        let id = id.to_ascii_uppercase();
        match id.len() {
            4 => self
                .ids
                .get(&id)
                .and_then(|keys| keys.first())
                .and_then(|key| self.records.get(key)),
            8 => self.records.get(&id),
            _ => None,
        }
    }

    /// Every type variant stored under a 4-hex property id
    pub fn get_all(&self, id: &str) -> Vec<&PropertyRecord> {
        let id = id.to_ascii_uppercase();
        self.ids
            .get(&id)
            .map(|keys| keys.iter().filter_map(|key| self.records.get(key)).collect())
            .unwrap_or_default()
    }

    /// Value of a fixed-length record
    pub fn value(&self, id: &str) -> Option<&PropertyValue> {
        self.get(id)
            .filter(|record| !record.is_variable())
            .map(PropertyRecord::value)
    }

    /// Value of a fixed-length record, or `default`
    pub fn value_or(&self, id: &str, default: PropertyValue) -> PropertyValue {
        self.value(id).cloned().unwrap_or(default)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyRecord)> {
        self.records.iter().map(|(key, record)| (key.as_str(), record))
    }

    /// Message date: submit time, else last modification, else creation
    pub fn date(&self) -> Option<DateTime<Utc>> {
        *self.date.get_or_init(|| {
            DATE_KEYS
                .iter()
                .find_map(|key| self.records.get(*key).and_then(|r| r.value().as_datetime()))
        })
    }

    /// Append a record
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotWritable`] on a read-only store,
    /// [`PropertyError::DuplicateKey`] if the key is already present.
    pub fn add_property(&mut self, record: PropertyRecord) -> Result<(), PropertyError> {
        self.check_writable()?;
        let key = record.key();
        if self.records.contains_key(&key) {
            return Err(PropertyError::DuplicateKey(key));
        }
        self.index_id(&record, &key);
        self.records.insert(key, record);
        self.date.take();
        Ok(())
    }

    /// Add or replace a record, keeping the position of a replaced key
    pub fn insert_property(
        &mut self,
        record: PropertyRecord,
    ) -> Result<Option<PropertyRecord>, PropertyError> {
        self.check_writable()?;
        let key = record.key();
        if !self.records.contains_key(&key) {
            self.index_id(&record, &key);
        }
        self.date.take();
        Ok(self.records.insert(key, record))
    }

    /// Remove the record with an exact 8-hex key
    pub fn remove_property(&mut self, key: &str) -> Result<Option<PropertyRecord>, PropertyError> {
        self.check_writable()?;
        let key = key.to_ascii_uppercase();
        let Some(record) = self.records.shift_remove(&key) else {
            return Ok(None);
        };

        let id = format!("{:04X}", record.property_id());
        if let Some(keys) = self.ids.get_mut(&id) {
            keys.retain(|k| *k != key);
            if keys.is_empty() {
                self.ids.remove(&id);
            }
        }
        self.date.take();
        Ok(Some(record))
    }

    /// Writable view: `self` when already writable, else an independent copy
    pub fn make_writable(&self) -> Cow<'_, PropertiesStore> {
        if self.writable {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(self.clone().into_writable())
        }
    }

    pub fn into_writable(mut self) -> Self {
        self.writable = true;
        self
    }

    /// Serialize the store
    ///
    /// Read-only stores return their input unchanged. Writable stores rebuild
    /// the header from the retained reserved blocks and counters, then append
    /// every record in insertion order.
    pub fn to_bytes(&self) -> Bytes {
        if !self.writable {
            return self.original.clone();
        }

        let mut out = BytesMut::with_capacity(
            self.kind.header_size() + self.records.len() * PROPERTY_RECORD_SIZE,
        );
        out.put_slice(&self.reserved);
        if self.kind.has_counters() {
            out.put_u32_le(self.counters.next_recipient_id);
            out.put_u32_le(self.counters.next_attachment_id);
            out.put_u32_le(self.counters.recipient_count);
            out.put_u32_le(self.counters.attachment_count);
        }
        if self.kind == PropertiesKind::Message {
            out.put_slice(&self.trailing_reserved);
        }
        for record in self.records.values() {
            out.put_slice(&record.encode());
        }
        out.freeze()
    }

    fn index_id(&mut self, record: &PropertyRecord, key: &str) {
        self.ids
            .entry(format!("{:04X}", record.property_id()))
            .or_default()
            .push(key.to_string());
    }

    fn check_writable(&self) -> Result<(), PropertyError> {
        if self.writable { Ok(()) } else { Err(PropertyError::NotWritable) }
    }

    fn check_counters(&self) -> Result<(), PropertyError> {
        if self.kind.has_counters() {
            Ok(())
        } else {
            Err(PropertyError::TypeMismatch(format!(
                "{:?} property streams have no header counters",
                self.kind
            )))
        }
    }

    fn counters_mut(&mut self) -> Result<&mut HeaderCounters, PropertyError> {
        self.check_writable()?;
        self.check_counters()?;
        Ok(&mut self.counters)
    }
}
