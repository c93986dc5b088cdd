//! Binary data parsing utilities shared across the container and property layers.
//!
//! This module provides little-endian reads at explicit offsets and a
//! [`ByteCursor`] that walks a borrowed buffer sequentially while still
//! allowing random access through [`ByteCursor::seek`].

use thiserror::Error;
use zerocopy::{FromBytes, LE, U16, U32, U64};

/// Binary parsing error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    #[error("Insufficient data: expected {expected}, got {available}")]
    InsufficientData { expected: usize, available: usize },
    /// Failed to parse the data
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

#[inline]
fn slice_at(data: &[u8], offset: usize, len: usize) -> BinaryResult<&[u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| BinaryError::ParseError("Offset overflow".to_string()))?;
    if end > data.len() {
        return Err(BinaryError::InsufficientData {
            expected: end,
            available: data.len(),
        });
    }
    Ok(&data[offset..end])
}

macro_rules! le_reader {
    ($(#[$meta:meta])* $name:ident, $wire:ty, $out:ty, $len:expr) => {
        $(#[$meta])*
        #[inline]
        pub fn $name(data: &[u8], offset: usize) -> BinaryResult<$out> {
            let bytes = slice_at(data, offset, $len)?;
            <$wire>::read_from_bytes(bytes)
                .map(|v| v.get())
                .map_err(|_| {
                    let what = concat!("Failed to read ", stringify!($out));
                    BinaryError::ParseError(what.to_string())
                })
        }
    };
}

le_reader!(
    /// Read a little-endian u16 from a byte slice at the given offset.
    ///
    /// # Examples
    ///
    /// ```
    /// use loquat::common::binary::read_u16_le;
    /// let data = [0x34, 0x12, 0x78, 0x56];
    /// assert_eq!(read_u16_le(&data, 0).unwrap(), 0x1234);
    /// assert_eq!(read_u16_le(&data, 2).unwrap(), 0x5678);
    /// ```
    read_u16_le, U16<LE>, u16, 2
);
le_reader!(
    /// Read a little-endian u32 from a byte slice at the given offset.
    ///
    /// # Examples
    ///
    /// ```
    /// use loquat::common::binary::read_u32_le;
    /// let data = [0x78, 0x56, 0x34, 0x12];
    /// assert_eq!(read_u32_le(&data, 0).unwrap(), 0x12345678);
    /// ```
    read_u32_le, U32<LE>, u32, 4
);
le_reader!(
    /// Read a little-endian u64 from a byte slice at the given offset.
    read_u64_le, U64<LE>, u64, 8
);

/// Read a table of little-endian u32 values (FAT, MiniFAT, DIFAT sectors).
///
/// Trailing bytes that do not fill a whole entry are ignored.
pub fn read_u32_table(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|chunk| {
            U32::<LE>::read_from_bytes(chunk)
                .map(|v| v.get())
                .unwrap_or(0)
        })
        .collect()
}

/// Sequential reader over a borrowed byte buffer.
///
/// Every read advances the position; [`seek`](Self::seek) and
/// [`peek_bytes`](Self::peek_bytes) give random access without copying.
///
/// # Examples
///
/// ```
/// use loquat::common::binary::ByteCursor;
/// let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00];
/// let mut cursor = ByteCursor::new(&data);
/// assert_eq!(cursor.read_u16().unwrap(), 1);
/// assert_eq!(cursor.read_u32().unwrap(), 2);
/// assert!(cursor.is_empty());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left after the current position
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute offset. Seeking to the end of the buffer is allowed.
    pub fn seek(&mut self, pos: usize) -> BinaryResult<()> {
        if pos > self.data.len() {
            return Err(BinaryError::InsufficientData {
                expected: pos,
                available: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> BinaryResult<()> {
        slice_at(self.data, self.pos, len)?;
        self.pos += len;
        Ok(())
    }

    /// Borrow the next `len` bytes without advancing.
    pub fn peek_bytes(&self, len: usize) -> BinaryResult<&'a [u8]> {
        slice_at(self.data, self.pos, len)
    }

    pub fn read_bytes(&mut self, len: usize) -> BinaryResult<&'a [u8]> {
        let bytes = slice_at(self.data, self.pos, len)?;
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> BinaryResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Everything from the current position to the end, consuming it.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos.min(self.data.len())..];
        self.pos = self.data.len();
        rest
    }

    pub fn read_u16(&mut self) -> BinaryResult<u16> {
        let value = read_u16_le(self.data, self.pos)?;
        self.pos += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> BinaryResult<u32> {
        let value = read_u32_le(self.data, self.pos)?;
        self.pos += 4;
        Ok(value)
    }

    pub fn read_u64(&mut self) -> BinaryResult<u64> {
        let value = read_u64_le(self.data, self.pos)?;
        self.pos += 8;
        Ok(value)
    }
}
