//! Loquat - Compound File Binary (OLE2) containers and MAPI property streams
//!
//! This library reads and writes the compound document container used by
//! legacy Office formats and Outlook `.msg` files, and decodes the MAPI
//! property streams stored inside `.msg` containers.
//!
//! # Features
//!
//! - **OLE2 reader**: header, FAT, DIFAT, MiniFAT and directory tree parsing
//!   with path-addressed stream lookup over a borrowed buffer
//! - **OLE2 writer**: builds a byte-exact container image from an in-memory
//!   entry tree, with 512 or 4096 byte sectors
//! - **MAPI properties** (`msg` feature): 16-byte descriptor codec and a keyed
//!   store with per-kind headers, mutation and re-serialization
//!
//! # Example - Low-level OLE access
//!
//! ```no_run
//! use loquat::ole::OleFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("document.doc")?;
//! let ole = OleFile::open(&data)?;
//!
//! for path in ole.list_streams() {
//!     println!("{}", path.join("/"));
//! }
//! let word = ole.get_stream(&["WordDocument"])?;
//! println!("WordDocument: {} bytes", word.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Writing a container
//!
//! ```
//! use loquat::ole::{OleFile, OleWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut writer = OleWriter::new();
//! writer.add_storage(&["Folder"])?;
//! writer.add_stream(&["Folder", "Data"], b"payload".to_vec())?;
//! let image = writer.export()?;
//!
//! let ole = OleFile::open(&image)?;
//! assert_eq!(ole.get_stream(&["Folder", "Data"])?, b"payload");
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Reading message properties
//!
//! ```no_run
//! use loquat::ole::OleFile;
//! use loquat::ole::msg::PropertiesKind;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("message.msg")?;
//! let ole = OleFile::open(&data)?;
//! let props = ole.properties(&[], PropertiesKind::Message);
//! for (key, record) in props.iter() {
//!     println!("{}: {:?}", key, record.value());
//! }
//! # Ok(())
//! # }
//! ```

/// Shared binary helpers, time conversions and the unified error type
pub mod common;

/// OLE2 compound document reader and writer
#[cfg(feature = "ole")]
pub mod ole;

pub use common::{Error, Result};
