//! MAPI error codes carried by `PT_ERROR` (0x000A) properties.

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// Known MAPI error and warning codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0x0000_0000,
    CallFailed = 0x8000_4005,
    NotEnoughMemory = 0x8007_000E,
    InvalidParameter = 0x8007_0057,
    InterfaceNotSupported = 0x8000_4002,
    NoAccess = 0x8007_0005,
    NoSupport = 0x8004_0102,
    BadCharWidth = 0x8004_0103,
    StringTooLong = 0x8004_0105,
    UnknownFlags = 0x8004_0106,
    InvalidEntryId = 0x8004_0107,
    InvalidObject = 0x8004_0108,
    ObjectChanged = 0x8004_0109,
    ObjectDeleted = 0x8004_010A,
    Busy = 0x8004_010B,
    NotEnoughDisk = 0x8004_010D,
    NotEnoughResources = 0x8004_010E,
    NotFound = 0x8004_010F,
    VersionMismatch = 0x8004_0110,
    LogonFailed = 0x8004_0111,
    TooManySessions = 0x8004_0112,
    UserCanceled = 0x8004_0113,
    UnableToAbort = 0x8004_0114,
    NetworkError = 0x8004_0115,
    DiskError = 0x8004_0116,
    TooComplex = 0x8004_0117,
    InvalidColumn = 0x8004_0118,
    ExtendedError = 0x8004_0119,
    Computed = 0x8004_011A,
    CorruptData = 0x8004_011B,
    InvalidCodepage = 0x8004_011E,
    InvalidLocale = 0x8004_011F,
    EndOfSession = 0x8004_0200,
    UnknownEntryId = 0x8004_0201,
    MissingRequiredColumn = 0x8004_0202,
    BadValue = 0x8004_0301,
    InvalidType = 0x8004_0302,
    TypeNotSupported = 0x8004_0303,
    UnexpectedType = 0x8004_0304,
    TooBig = 0x8004_0305,
    DeclineCopy = 0x8004_0306,
    UnexpectedId = 0x8004_0307,
    UnableToComplete = 0x8004_0400,
    Timeout = 0x8004_0401,
    TableEmpty = 0x8004_0402,
    TableTooBig = 0x8004_0403,
    InvalidBookmark = 0x8004_0405,
    Wait = 0x8004_0500,
    Cancel = 0x8004_0501,
    NotMe = 0x8004_0502,
    CorruptStore = 0x8004_0600,
    NotInQueue = 0x8004_0601,
    NoSuppress = 0x8004_0602,
    Collision = 0x8004_0604,
    NotInitialized = 0x8004_0605,
    NonStandard = 0x8004_0606,
    NoRecipients = 0x8004_0607,
    Submitted = 0x8004_0608,
    HasFolders = 0x8004_0609,
    HasMessages = 0x8004_060A,
    FolderCycle = 0x8004_060B,
    LockIdLimit = 0x8004_060D,
    AmbiguousRecipient = 0x8004_0700,
    SyncObjectDeleted = 0x8004_0800,
    SyncIgnore = 0x8004_0801,
    SyncConflict = 0x8004_0802,
    SyncNoParent = 0x8004_0803,
    SyncIncest = 0x8004_0804,
    NamedPropertyQuota = 0x8004_0900,
    NotImplemented = 0x8004_0FFF,
}

static ERROR_CODES: phf::Map<u32, ErrorCode> = phf_map! {
    0x0000_0000u32 => ErrorCode::Success,
    0x8000_4005u32 => ErrorCode::CallFailed,
    0x8007_000Eu32 => ErrorCode::NotEnoughMemory,
    0x8007_0057u32 => ErrorCode::InvalidParameter,
    0x8000_4002u32 => ErrorCode::InterfaceNotSupported,
    0x8007_0005u32 => ErrorCode::NoAccess,
    0x8004_0102u32 => ErrorCode::NoSupport,
    0x8004_0103u32 => ErrorCode::BadCharWidth,
    0x8004_0105u32 => ErrorCode::StringTooLong,
    0x8004_0106u32 => ErrorCode::UnknownFlags,
    0x8004_0107u32 => ErrorCode::InvalidEntryId,
    0x8004_0108u32 => ErrorCode::InvalidObject,
    0x8004_0109u32 => ErrorCode::ObjectChanged,
    0x8004_010Au32 => ErrorCode::ObjectDeleted,
    0x8004_010Bu32 => ErrorCode::Busy,
    0x8004_010Du32 => ErrorCode::NotEnoughDisk,
    0x8004_010Eu32 => ErrorCode::NotEnoughResources,
    0x8004_010Fu32 => ErrorCode::NotFound,
    0x8004_0110u32 => ErrorCode::VersionMismatch,
    0x8004_0111u32 => ErrorCode::LogonFailed,
    0x8004_0112u32 => ErrorCode::TooManySessions,
    0x8004_0113u32 => ErrorCode::UserCanceled,
    0x8004_0114u32 => ErrorCode::UnableToAbort,
    0x8004_0115u32 => ErrorCode::NetworkError,
    0x8004_0116u32 => ErrorCode::DiskError,
    0x8004_0117u32 => ErrorCode::TooComplex,
    0x8004_0118u32 => ErrorCode::InvalidColumn,
    0x8004_0119u32 => ErrorCode::ExtendedError,
    0x8004_011Au32 => ErrorCode::Computed,
    0x8004_011Bu32 => ErrorCode::CorruptData,
    0x8004_011Eu32 => ErrorCode::InvalidCodepage,
    0x8004_011Fu32 => ErrorCode::InvalidLocale,
    0x8004_0200u32 => ErrorCode::EndOfSession,
    0x8004_0201u32 => ErrorCode::UnknownEntryId,
    0x8004_0202u32 => ErrorCode::MissingRequiredColumn,
    0x8004_0301u32 => ErrorCode::BadValue,
    0x8004_0302u32 => ErrorCode::InvalidType,
    0x8004_0303u32 => ErrorCode::TypeNotSupported,
    0x8004_0304u32 => ErrorCode::UnexpectedType,
    0x8004_0305u32 => ErrorCode::TooBig,
    0x8004_0306u32 => ErrorCode::DeclineCopy,
    0x8004_0307u32 => ErrorCode::UnexpectedId,
    0x8004_0400u32 => ErrorCode::UnableToComplete,
    0x8004_0401u32 => ErrorCode::Timeout,
    0x8004_0402u32 => ErrorCode::TableEmpty,
    0x8004_0403u32 => ErrorCode::TableTooBig,
    0x8004_0405u32 => ErrorCode::InvalidBookmark,
    0x8004_0500u32 => ErrorCode::Wait,
    0x8004_0501u32 => ErrorCode::Cancel,
    0x8004_0502u32 => ErrorCode::NotMe,
    0x8004_0600u32 => ErrorCode::CorruptStore,
    0x8004_0601u32 => ErrorCode::NotInQueue,
    0x8004_0602u32 => ErrorCode::NoSuppress,
    0x8004_0604u32 => ErrorCode::Collision,
    0x8004_0605u32 => ErrorCode::NotInitialized,
    0x8004_0606u32 => ErrorCode::NonStandard,
    0x8004_0607u32 => ErrorCode::NoRecipients,
    0x8004_0608u32 => ErrorCode::Submitted,
    0x8004_0609u32 => ErrorCode::HasFolders,
    0x8004_060Au32 => ErrorCode::HasMessages,
    0x8004_060Bu32 => ErrorCode::FolderCycle,
    0x8004_060Du32 => ErrorCode::LockIdLimit,
    0x8004_0700u32 => ErrorCode::AmbiguousRecipient,
    0x8004_0800u32 => ErrorCode::SyncObjectDeleted,
    0x8004_0801u32 => ErrorCode::SyncIgnore,
    0x8004_0802u32 => ErrorCode::SyncConflict,
    0x8004_0803u32 => ErrorCode::SyncNoParent,
    0x8004_0804u32 => ErrorCode::SyncIncest,
    0x8004_0900u32 => ErrorCode::NamedPropertyQuota,
    0x8004_0FFFu32 => ErrorCode::NotImplemented,
};

impl ErrorCode {
    /// Look up a raw 32-bit code
    #[inline]
    pub fn from_u32(code: u32) -> Option<Self> {
        ERROR_CODES.get(&code).copied()
    }

    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_matches_discriminant() {
        for (&raw, &code) in ERROR_CODES.entries() {
            assert_eq!(code.code(), raw);
            assert_eq!(ErrorCode::from_u32(raw), Some(code));
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(ErrorCode::from_u32(0x8004_0101), None);
        assert_eq!(ErrorCode::from_u32(0x8004_010F), Some(ErrorCode::NotFound));
    }
}
