//! Error conversion implementations.
//!
//! `From` implementations that fold the per-layer errors into the unified
//! [`Error`] type.

use super::types::Error;
use crate::common::binary::BinaryError;

impl From<BinaryError> for Error {
    fn from(err: BinaryError) -> Self {
        Error::ParseError(err.to_string())
    }
}

#[cfg(feature = "ole")]
impl From<crate::ole::OleError> for Error {
    fn from(err: crate::ole::OleError) -> Self {
        use crate::ole::OleError;
        match err {
            OleError::Io(e) => Error::Io(e),
            OleError::Format(s) => Error::InvalidFormat(s),
            OleError::InvalidData(s) => Error::InvalidFormat(s),
            OleError::CorruptChain(s) => Error::CorruptedFile(s),
            OleError::NotFound(s) => Error::ComponentNotFound(s),
            OleError::NotAStream(s) => Error::TypeMismatch(format!("not a stream: {}", s)),
            OleError::NotAStorage(s) => Error::TypeMismatch(format!("not a storage: {}", s)),
            e @ (OleError::NameTooLong(_)
            | OleError::IllegalCharacter(_)
            | OleError::AlreadyExists(_)
            | OleError::InvalidPath(_)) => Error::InvalidName(e.to_string()),
        }
    }
}

#[cfg(feature = "msg")]
impl From<crate::ole::msg::PropertyError> for Error {
    fn from(err: crate::ole::msg::PropertyError) -> Self {
        use crate::ole::msg::PropertyError;
        match err {
            PropertyError::NotWritable => Error::ReadOnly(err.to_string()),
            PropertyError::TypeMismatch(s) => Error::TypeMismatch(s),
            PropertyError::DuplicateKey(_) | PropertyError::UnencodableValue(_) => {
                Error::Other(err.to_string())
            },
            PropertyError::Binary(e) => Error::from(e),
        }
    }
}
