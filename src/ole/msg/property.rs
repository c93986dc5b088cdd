//! 16-byte MAPI property descriptors.
//!
//! Layout (all little-endian):
//!
//! ```text
//! 0..2   type tag
//! 2..4   property id
//! 4..8   flags
//! 8..16  value, or {length, reserved} for variable-length types
//! ```

use super::value::{PropertyType, PropertyValue, is_variable_tag, real_length};
use super::SUBSTG_PREFIX;
use crate::common::binary::BinaryError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of one property descriptor
pub const PROPERTY_RECORD_SIZE: usize = 16;

/// Error types for property records and stores
#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("Property store is read-only")]
    NotWritable,
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Duplicate property key: {0}")]
    DuplicateKey(String),
    #[error("Value cannot be encoded: {0}")]
    UnencodableValue(String),
    #[error("Binary error: {0}")]
    Binary(#[from] BinaryError),
}

bitflags! {
    /// Property descriptor flags; unknown bits are retained
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PropertyFlags: u32 {
        const MANDATORY = 0x0000_0001;
        const READABLE = 0x0000_0002;
        const WRITABLE = 0x0000_0004;
    }
}

/// One decoded property descriptor
///
/// The raw value bytes are kept alongside the decoded value so that
/// [`PropertyRecord::encode`] reproduces the input exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    type_tag: u16,
    property_id: u16,
    flags: PropertyFlags,
    raw_value: [u8; 8],
    value: PropertyValue,
}

impl PropertyRecord {
    /// Decode a 16-byte descriptor
    ///
    /// # Examples
    ///
    /// ```
    /// use loquat::ole::msg::{PropertyFlags, PropertyRecord, PropertyValue};
    ///
    /// let raw = [0x00, 0x00, 0x01, 0x02, 0x01, 0x00, 0x00, 0x00,
    ///            0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
    /// let record = PropertyRecord::decode(&raw);
    /// assert_eq!(record.key(), "02010000");
    /// assert_eq!(record.flags(), PropertyFlags::MANDATORY);
    /// assert_eq!(
    ///     record.value(),
    ///     &PropertyValue::Unspecified([0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF])
    /// );
    /// assert_eq!(record.encode(), raw);
    /// ```
    pub fn decode(raw: &[u8; PROPERTY_RECORD_SIZE]) -> Self {
        let type_tag = u16::from_le_bytes([raw[0], raw[1]]);
        let property_id = u16::from_le_bytes([raw[2], raw[3]]);
        let flags =
            PropertyFlags::from_bits_retain(u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]));
        let mut raw_value = [0u8; 8];
        raw_value.copy_from_slice(&raw[8..16]);

        PropertyRecord {
            type_tag,
            property_id,
            flags,
            raw_value,
            value: PropertyValue::decode(type_tag, &raw_value),
        }
    }

    /// Build a fixed-length record from a value
    pub fn fixed(
        property_id: u16,
        flags: PropertyFlags,
        value: PropertyValue,
    ) -> Result<Self, PropertyError> {
        let type_tag = value.type_tag().ok_or_else(|| {
            PropertyError::UnencodableValue(format!("{:?} has no fixed-length type", value))
        })?;
        let raw_value = value.encode()?;
        Ok(PropertyRecord {
            type_tag,
            property_id,
            flags,
            raw_value,
            value,
        })
    }

    /// Build a variable-length record whose payload stream holds `length` bytes
    pub fn variable(
        property_id: u16,
        type_tag: u16,
        flags: PropertyFlags,
        length: u32,
    ) -> Result<Self, PropertyError> {
        if !is_variable_tag(type_tag) {
            return Err(PropertyError::TypeMismatch(format!(
                "{:#06X} is not a variable-length type",
                type_tag
            )));
        }
        let value = PropertyValue::Variable { length, reserved: 0 };
        Ok(PropertyRecord {
            type_tag,
            property_id,
            flags,
            raw_value: value.encode()?,
            value,
        })
    }

    /// Encode back to 16 bytes
    pub fn encode(&self) -> [u8; PROPERTY_RECORD_SIZE] {
        let mut out = [0u8; PROPERTY_RECORD_SIZE];
        out[0..2].copy_from_slice(&self.type_tag.to_le_bytes());
        out[2..4].copy_from_slice(&self.property_id.to_le_bytes());
        out[4..8].copy_from_slice(&self.flags.bits().to_le_bytes());
        out[8..16].copy_from_slice(&self.raw_value);
        out
    }

    /// `IIIITTTT`: property id then type tag, uppercase hex
    pub fn key(&self) -> String {
        property_key(self.property_id, self.type_tag)
    }

    /// Stream holding the payload of a variable-length property
    pub fn stream_name(&self) -> String {
        format!("{}{}", SUBSTG_PREFIX, self.key())
    }

    #[inline]
    pub fn type_tag(&self) -> u16 {
        self.type_tag
    }

    pub fn property_type(&self) -> Option<PropertyType> {
        PropertyType::from_tag(self.type_tag)
    }

    #[inline]
    pub fn property_id(&self) -> u16 {
        self.property_id
    }

    #[inline]
    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    #[inline]
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn is_variable(&self) -> bool {
        self.value.is_variable()
    }

    /// Declared length field of a variable-length record
    pub fn length(&self) -> Option<u32> {
        match self.value {
            PropertyValue::Variable { length, .. } => Some(length),
            _ => None,
        }
    }

    /// Payload length (or element count) derived from the length field
    pub fn real_length(&self) -> Option<u32> {
        self.length().and_then(|length| real_length(self.type_tag, length))
    }
}

/// Format a store key from its parts
pub fn property_key(property_id: u16, type_tag: u16) -> String {
    format!("{:04X}{:04X}", property_id, type_tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unspecified_record() {
        let raw = [
            0x00, 0x00, 0x01, 0x02, 0x01, 0x00, 0x00, 0x00, 0x01, 0x23, 0x45, 0x67, 0x89, 0xAB,
            0xCD, 0xEF,
        ];
        let record = PropertyRecord::decode(&raw);
        assert_eq!(record.key(), "02010000");
        assert_eq!(record.type_tag(), 0);
        assert_eq!(record.flags(), PropertyFlags::MANDATORY);
        assert!(!record.is_variable());
        assert_eq!(record.encode(), raw);
    }

    #[test]
    fn test_null_record() {
        let mut raw = [0u8; 16];
        raw[..8].copy_from_slice(&[0x01, 0x00, 0x01, 0x02, 0x02, 0x00, 0x00, 0x00]);
        let record = PropertyRecord::decode(&raw);
        assert_eq!(record.type_tag(), 1);
        assert_eq!(record.value(), &PropertyValue::Null);
        assert_eq!(record.flags(), PropertyFlags::READABLE);
    }

    #[test]
    fn test_unknown_flag_bits_retained() {
        let mut raw = [0u8; 16];
        raw[0] = 0x03;
        raw[4..8].copy_from_slice(&0x8000_0006u32.to_le_bytes());
        let record = PropertyRecord::decode(&raw);
        assert!(record.flags().contains(PropertyFlags::READABLE | PropertyFlags::WRITABLE));
        assert_eq!(record.flags().bits(), 0x8000_0006);
        assert_eq!(record.encode(), raw);
    }

    #[test]
    fn test_variable_record() {
        let record =
            PropertyRecord::variable(0x0037, 0x001F, PropertyFlags::READABLE, 12).unwrap();
        assert_eq!(record.key(), "0037001F");
        assert_eq!(record.stream_name(), "__substg1.0_0037001F");
        assert_eq!(record.length(), Some(12));
        assert_eq!(record.real_length(), Some(10));
        assert_eq!(PropertyRecord::decode(&record.encode()), record);

        assert!(matches!(
            PropertyRecord::variable(0x0037, 0x0003, PropertyFlags::empty(), 4),
            Err(PropertyError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_fixed_record() {
        let record = PropertyRecord::fixed(
            0x0E07,
            PropertyFlags::READABLE | PropertyFlags::WRITABLE,
            PropertyValue::Int32(0x11),
        )
        .unwrap();
        assert_eq!(record.key(), "0E070003");
        assert_eq!(record.property_type(), Some(PropertyType::Int32));
        assert_eq!(
            record.encode(),
            [0x03, 0x00, 0x07, 0x0E, 0x06, 0, 0, 0, 0x11, 0, 0, 0, 0, 0, 0, 0]
        );
        assert!(matches!(
            PropertyRecord::fixed(1, PropertyFlags::empty(), PropertyValue::Unknown([0; 8])),
            Err(PropertyError::UnencodableValue(_))
        ));
    }

    #[test]
    fn test_out_of_range_time_keeps_raw_ticks() {
        let mut raw = [0xFFu8; 16];
        raw[0..4].copy_from_slice(&[0x40, 0x00, 0x39, 0x00]);
        raw[4..8].copy_from_slice(&2u32.to_le_bytes());
        let record = PropertyRecord::decode(&raw);
        assert_eq!(record.key(), "00390040");
        assert_eq!(record.value(), &PropertyValue::RawTime(u64::MAX));
        assert_eq!(record.value().as_datetime(), None);
        assert_eq!(record.encode(), raw);
    }

    proptest! {
        #[test]
        fn prop_encode_inverts_decode(raw in any::<[u8; 16]>()) {
            let record = PropertyRecord::decode(&raw);
            prop_assert_eq!(record.encode(), raw);
        }

        #[test]
        fn prop_decode_is_stable(raw in any::<[u8; 16]>()) {
            let record = PropertyRecord::decode(&raw);
            let again = PropertyRecord::decode(&record.encode());
            prop_assert_eq!(again.type_tag(), record.type_tag());
            prop_assert_eq!(again.property_id(), record.property_id());
            prop_assert_eq!(again.flags(), record.flags());
            // NaN payloads compare unequal; their Debug form does not
            prop_assert_eq!(format!("{:?}", again.value()), format!("{:?}", record.value()));
        }

        #[test]
        fn prop_decode_matches_typed_value(
            tag in prop_oneof![Just(0x0003u16), Just(0x0005), Just(0x0014), Just(0x0040)],
            value in any::<u64>(),
        ) {
            let mut raw = [0u8; 16];
            raw[0..2].copy_from_slice(&tag.to_le_bytes());
            raw[8..16].copy_from_slice(&value.to_le_bytes());
            let record = PropertyRecord::decode(&raw);
            let again = PropertyRecord::decode(&record.encode());
            match (record.value(), again.value()) {
                (PropertyValue::Float64(a), PropertyValue::Float64(b)) => {
                    prop_assert_eq!(a.to_bits(), b.to_bits())
                },
                (a, b) => prop_assert_eq!(a, b),
            }
        }
    }
}
