//! Property types and the decoded form of a descriptor's 8-byte value field.

use super::error_code::ErrorCode;
use super::property::PropertyError;
use crate::common::time::{datetime_to_filetime, filetime_to_datetime, floating_time_to_datetime};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

/// MAPI property type tags (MS-OXCDATA 2.11.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum PropertyType {
    Unspecified = 0x0000,
    Null = 0x0001,
    Int16 = 0x0002,
    Int32 = 0x0003,
    Float32 = 0x0004,
    Float64 = 0x0005,
    Currency = 0x0006,
    FloatingTime = 0x0007,
    ErrorCode = 0x000A,
    Boolean = 0x000B,
    Object = 0x000D,
    Int64 = 0x0014,
    String8 = 0x001E,
    Unicode = 0x001F,
    Time = 0x0040,
    Guid = 0x0048,
    Binary = 0x0102,
    MultiInt16 = 0x1002,
    MultiInt32 = 0x1003,
    MultiFloat32 = 0x1004,
    MultiFloat64 = 0x1005,
    MultiCurrency = 0x1006,
    MultiFloatingTime = 0x1007,
    MultiInt64 = 0x1014,
    MultiString8 = 0x101E,
    MultiUnicode = 0x101F,
    MultiTime = 0x1040,
    MultiGuid = 0x1048,
    MultiBinary = 0x1102,
}

impl PropertyType {
    pub fn from_tag(tag: u16) -> Option<Self> {
        Some(match tag {
            0x0000 => Self::Unspecified,
            0x0001 => Self::Null,
            0x0002 => Self::Int16,
            0x0003 => Self::Int32,
            0x0004 => Self::Float32,
            0x0005 => Self::Float64,
            0x0006 => Self::Currency,
            0x0007 => Self::FloatingTime,
            0x000A => Self::ErrorCode,
            0x000B => Self::Boolean,
            0x000D => Self::Object,
            0x0014 => Self::Int64,
            0x001E => Self::String8,
            0x001F => Self::Unicode,
            0x0040 => Self::Time,
            0x0048 => Self::Guid,
            0x0102 => Self::Binary,
            0x1002 => Self::MultiInt16,
            0x1003 => Self::MultiInt32,
            0x1004 => Self::MultiFloat32,
            0x1005 => Self::MultiFloat64,
            0x1006 => Self::MultiCurrency,
            0x1007 => Self::MultiFloatingTime,
            0x1014 => Self::MultiInt64,
            0x101E => Self::MultiString8,
            0x101F => Self::MultiUnicode,
            0x1040 => Self::MultiTime,
            0x1048 => Self::MultiGuid,
            0x1102 => Self::MultiBinary,
            _ => return None,
        })
    }

    #[inline]
    pub fn tag(self) -> u16 {
        self as u16
    }

    /// Whether the payload lives in a `__substg1.0_` stream
    pub fn is_variable_length(self) -> bool {
        is_variable_tag(self.tag())
    }
}

/// Whether a raw type tag stores `{length, reserved}` instead of an inline value
pub fn is_variable_tag(tag: u16) -> bool {
    matches!(
        tag,
        0x000D
            | 0x001E
            | 0x001F
            | 0x0102
            | 0x1002..=0x1007
            | 0x1014
            | 0x101E
            | 0x101F
            | 0x1040
            | 0x1048
            | 0x1102
    )
}

/// Payload length implied by a variable record's length field
///
/// Strings drop their terminator, fixed-size multi-value arrays yield an
/// element count. Multi-valued binary has no derivable length.
pub fn real_length(tag: u16, length: u32) -> Option<u32> {
    match tag {
        0x001E => Some(length.saturating_sub(1)),
        0x001F => Some(length.saturating_sub(2)),
        0x1002 => Some(length / 2),
        0x1003 | 0x1004 | 0x101E | 0x101F => Some(length / 4),
        0x1005 | 0x1006 | 0x1007 | 0x1014 | 0x1040 => Some(length / 8),
        0x1048 => Some(length / 16),
        0x1102 => None,
        _ => Some(length),
    }
}

/// Decoded value field of a property descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PropertyValue {
    Unspecified([u8; 8]),
    Null,
    Int16(i16),
    Int32(i32),
    Float32(f32),
    Float64(f64),
    /// Fixed-point amount in ten-thousandths
    Currency(i64),
    /// Days since 1899-12-30
    FloatingTime(f64),
    ErrorCode(ErrorCode),
    /// Error code not in the known table
    RawErrorCode(u32),
    Boolean(bool),
    Int64(i64),
    Time(DateTime<Utc>),
    /// FILETIME that could not be converted
    RawTime(u64),
    /// GUID-typed value, kept undecoded
    Guid([u8; 8]),
    /// Unrecognized type tag
    Unknown([u8; 8]),
    /// Variable-length property; the payload lives in a sibling stream
    Variable { length: u32, reserved: u32 },
}

impl PropertyValue {
    /// Decode the 8-byte value field for a type tag
    ///
    /// Never fails; anomalies are logged and the raw bits retained.
    pub fn decode(tag: u16, raw: &[u8; 8]) -> Self {
        let u64_value = u64::from_le_bytes(*raw);
        let u32_value = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);

        if is_variable_tag(tag) {
            return PropertyValue::Variable {
                length: u32_value,
                reserved: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            };
        }

        match tag {
            0x0000 => PropertyValue::Unspecified(*raw),
            0x0001 => {
                if u64_value != 0 {
                    warn!("Null property carries non-zero value {:#018X}", u64_value);
                }
                PropertyValue::Null
            },
            0x0002 => PropertyValue::Int16(i16::from_le_bytes([raw[0], raw[1]])),
            0x0003 => PropertyValue::Int32(u32_value as i32),
            0x0004 => PropertyValue::Float32(f32::from_bits(u32_value)),
            0x0005 => PropertyValue::Float64(f64::from_bits(u64_value)),
            0x0006 => PropertyValue::Currency(u64_value as i64),
            0x0007 => PropertyValue::FloatingTime(f64::from_bits(u64_value)),
            0x000A => match ErrorCode::from_u32(u32_value) {
                Some(code) => PropertyValue::ErrorCode(code),
                None => {
                    warn!("Unknown MAPI error code {:#010X}", u32_value);
                    PropertyValue::RawErrorCode(u32_value)
                },
            },
            0x000B => PropertyValue::Boolean(u64_value == 1),
            0x0014 => PropertyValue::Int64(u64_value as i64),
            0x0040 => match filetime_to_datetime(u64_value) {
                Some(time) => PropertyValue::Time(time),
                None => {
                    warn!("FILETIME {} is out of range", u64_value);
                    PropertyValue::RawTime(u64_value)
                },
            },
            0x0048 => PropertyValue::Guid(*raw),
            _ => {
                warn!("Unknown property type {:#06X}", tag);
                PropertyValue::Unknown(*raw)
            },
        }
    }

    /// Type tag this value encodes as; `None` for variable and unknown values
    pub fn type_tag(&self) -> Option<u16> {
        let ty = match self {
            PropertyValue::Unspecified(_) => PropertyType::Unspecified,
            PropertyValue::Null => PropertyType::Null,
            PropertyValue::Int16(_) => PropertyType::Int16,
            PropertyValue::Int32(_) => PropertyType::Int32,
            PropertyValue::Float32(_) => PropertyType::Float32,
            PropertyValue::Float64(_) => PropertyType::Float64,
            PropertyValue::Currency(_) => PropertyType::Currency,
            PropertyValue::FloatingTime(_) => PropertyType::FloatingTime,
            PropertyValue::ErrorCode(_) | PropertyValue::RawErrorCode(_) => PropertyType::ErrorCode,
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Int64(_) => PropertyType::Int64,
            PropertyValue::Time(_) | PropertyValue::RawTime(_) => PropertyType::Time,
            PropertyValue::Guid(_) => PropertyType::Guid,
            PropertyValue::Unknown(_) | PropertyValue::Variable { .. } => return None,
        };
        Some(ty.tag())
    }

    /// Encode back to the 8-byte value field
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnencodableValue`] for a time outside the FILETIME range.
    pub fn encode(&self) -> Result<[u8; 8], PropertyError> {
        let mut out = [0u8; 8];
        match self {
            PropertyValue::Unspecified(raw)
            | PropertyValue::Guid(raw)
            | PropertyValue::Unknown(raw) => out = *raw,
            PropertyValue::Null => {},
            PropertyValue::Int16(v) => out[..2].copy_from_slice(&v.to_le_bytes()),
            PropertyValue::Int32(v) => out[..4].copy_from_slice(&v.to_le_bytes()),
            PropertyValue::Float32(v) => out[..4].copy_from_slice(&v.to_le_bytes()),
            PropertyValue::Float64(v) | PropertyValue::FloatingTime(v) => out = v.to_le_bytes(),
            PropertyValue::Currency(v) | PropertyValue::Int64(v) => out = v.to_le_bytes(),
            PropertyValue::ErrorCode(code) => out[..4].copy_from_slice(&code.code().to_le_bytes()),
            PropertyValue::RawErrorCode(code) => out[..4].copy_from_slice(&code.to_le_bytes()),
            PropertyValue::Boolean(v) => out = u64::from(*v).to_le_bytes(),
            PropertyValue::Time(time) => {
                let ticks = datetime_to_filetime(time).ok_or_else(|| {
                    PropertyError::UnencodableValue(format!(
                        "{} is outside the FILETIME range",
                        time
                    ))
                })?;
                out = ticks.to_le_bytes();
            },
            PropertyValue::RawTime(ticks) => out = ticks.to_le_bytes(),
            PropertyValue::Variable { length, reserved } => {
                out[..4].copy_from_slice(&length.to_le_bytes());
                out[4..].copy_from_slice(&reserved.to_le_bytes());
            },
        }
        Ok(out)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, PropertyValue::Variable { .. })
    }

    /// Currency as a decimal amount
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Currency(v) => Some(*v as f64 / 10_000.0),
            PropertyValue::Float32(v) => Some(f64::from(*v)),
            PropertyValue::Float64(v) | PropertyValue::FloatingTime(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int16(v) => Some(i64::from(*v)),
            PropertyValue::Int32(v) => Some(i64::from(*v)),
            PropertyValue::Int64(v) | PropertyValue::Currency(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::Time(time) => Some(*time),
            _ => None,
        }
    }

    /// Floating time as a calendar timestamp (no zone)
    pub fn as_floating_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            PropertyValue::FloatingTime(days) => floating_time_to_datetime(*days),
            _ => None,
        }
    }
}
