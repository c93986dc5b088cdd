//! MAPI property layer of Outlook `.msg` containers.
//!
//! Every message, attachment and recipient storage carries a
//! `__properties_version1.0` stream of fixed-size property descriptors.
//! Variable-length values live beside it in `__substg1.0_IIIITTTT` streams.
//!
//! # Example
//!
//! ```no_run
//! use loquat::ole::OleFile;
//! use loquat::ole::msg::PropertiesKind;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("message.msg")?;
//! let ole = OleFile::open(&data)?;
//! let props = ole.properties(&[], PropertiesKind::Message);
//!
//! if let Some(subject) = props.get("0037001F") {
//!     let payload = ole.variable_payload(&[], subject)?;
//!     println!("subject: {} bytes", payload.len());
//! }
//! println!("date: {:?}", props.date());
//! # Ok(())
//! # }
//! ```

/// MAPI error code table
mod error_code;

/// 16-byte property descriptors
mod property;

/// Keyed property collections
mod store;

/// Property types and decoded values
mod value;

pub use error_code::ErrorCode;
pub use property::{
    PROPERTY_RECORD_SIZE, PropertyError, PropertyFlags, PropertyRecord, property_key,
};
pub use store::{HeaderCounters, PropertiesKind, PropertiesStore};
pub use value::{PropertyType, PropertyValue, is_variable_tag, real_length};

use super::file::{OleError, OleFile};
use log::warn;
use once_cell::sync::OnceCell;

/// Name of the property stream inside every message, attachment and recipient storage
pub const PROPERTIES_STREAM: &str = "__properties_version1.0";

/// Prefix of variable-length payload streams
pub const SUBSTG_PREFIX: &str = "__substg1.0_";

impl OleFile<'_> {
    /// Decode the property stream of a storage
    ///
    /// `storage` is the path of the owning storage (empty for the root
    /// message). A missing or unreadable stream yields a read-only store that
    /// reports [`PropertiesStore::is_error`].
    pub fn properties(&self, storage: &[&str], kind: PropertiesKind) -> PropertiesStore {
        let mut path = storage.to_vec();
        path.push(PROPERTIES_STREAM);

        match self.get_stream(&path) {
            Ok(data) => PropertiesStore::new(data, kind, false),
            Err(e) => {
                warn!("Cannot read {}: {}", path.join("/"), e);
                PropertiesStore::new(Vec::new(), kind, false)
            },
        }
    }

    /// Read the payload stream of a variable-length record
    ///
    /// # Errors
    ///
    /// [`OleError::InvalidData`] for a fixed-length record, otherwise any
    /// error of [`OleFile::get_stream`].
    pub fn variable_payload(
        &self,
        storage: &[&str],
        record: &PropertyRecord,
    ) -> Result<Vec<u8>, OleError> {
        if !record.is_variable() {
            return Err(OleError::InvalidData(format!(
                "property {} is stored inline",
                record.key()
            )));
        }
        let name = record.stream_name();
        let mut path = storage.to_vec();
        path.push(&name);
        self.get_stream(&path)
    }
}

/// Property store decoded on first access
///
/// Holds a storage path and kind; [`LazyProperties::get`] decodes the stream
/// once and returns the cached store afterwards.
#[derive(Debug)]
pub struct LazyProperties {
    storage: Vec<String>,
    kind: PropertiesKind,
    store: OnceCell<PropertiesStore>,
}

impl LazyProperties {
    pub fn new(storage: &[&str], kind: PropertiesKind) -> Self {
        Self {
            storage: storage.iter().map(|s| s.to_string()).collect(),
            kind,
            store: OnceCell::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> PropertiesKind {
        self.kind
    }

    pub fn storage(&self) -> &[String] {
        &self.storage
    }

    /// Decode (once) and return the store
    pub fn get(&self, ole: &OleFile<'_>) -> &PropertiesStore {
        self.store.get_or_init(|| {
            let path: Vec<&str> = self.storage.iter().map(String::as_str).collect();
            ole.properties(&path, self.kind)
        })
    }

    /// Whether the store has already been decoded
    pub fn is_loaded(&self) -> bool {
        self.store.get().is_some()
    }
}
