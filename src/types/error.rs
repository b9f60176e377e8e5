// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Error types returned from the codec facade.

use std::{error::Error, fmt};

use crate::types::status_codes::StatusCode;

/// The broad kind of failure a codec call ran into.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A selector, descriptor byte, union arm or other value was outside the valid set.
    MalformedEncoding,
    /// The input ended before a declared length was satisfied.
    TruncatedInput,
    /// An array length, string length, recursion depth or message size exceeded its bound.
    LimitExceeded,
    /// A concrete decode was demanded for a type that has no registry entry.
    UnknownType,
    /// The value could not be encoded, e.g. it disagrees with its own definition.
    EncodingFailure,
}

impl From<StatusCode> for ErrorKind {
    fn from(status: StatusCode) -> Self {
        match status.status() {
            StatusCode::BadEndOfStream => ErrorKind::TruncatedInput,
            StatusCode::BadEncodingLimitsExceeded => ErrorKind::LimitExceeded,
            StatusCode::BadDataTypeIdUnknown => ErrorKind::UnknownType,
            StatusCode::BadEncodingError
            | StatusCode::BadInvalidArgument
            | StatusCode::BadTypeMismatch => ErrorKind::EncodingFailure,
            _ => ErrorKind::MalformedEncoding,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::MalformedEncoding => "malformed encoding",
            ErrorKind::TruncatedInput => "truncated input",
            ErrorKind::LimitExceeded => "limit exceeded",
            ErrorKind::UnknownType => "unknown type",
            ErrorKind::EncodingFailure => "encoding failure",
        };
        f.write_str(s)
    }
}

/// An error from an encode or decode call, with as much context as was available where it
/// happened.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecError {
    pub kind: ErrorKind,
    pub status: StatusCode,
    /// Byte offset into a binary input. XML and JSON failures have none.
    pub offset: Option<usize>,
    /// Dotted path of the structure field being decoded, innermost last
    pub field: Option<String>,
}

impl CodecError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            kind: ErrorKind::from(status),
            status,
            offset: None,
            field: None,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_field<T: Into<String>>(mut self, field: Option<T>) -> Self {
        self.field = field.map(|f| f.into());
        self
    }
}

impl From<StatusCode> for CodecError {
    fn from(status: StatusCode) -> Self {
        CodecError::new(status)
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.status)?;
        if let Some(offset) = self.offset {
            write!(f, " at offset {}", offset)?;
        }
        if let Some(ref field) = self.field {
            write!(f, " in field {}", field)?;
        }
        Ok(())
    }
}

impl Error for CodecError {}

#[test]
fn error_kind_from_status() {
    assert_eq!(
        ErrorKind::from(StatusCode::BadDecodingError),
        ErrorKind::MalformedEncoding
    );
    assert_eq!(
        ErrorKind::from(StatusCode::BadEndOfStream),
        ErrorKind::TruncatedInput
    );
    assert_eq!(
        ErrorKind::from(StatusCode::BadEncodingLimitsExceeded),
        ErrorKind::LimitExceeded
    );
    assert_eq!(
        ErrorKind::from(StatusCode::BadDataTypeIdUnknown),
        ErrorKind::UnknownType
    );
    assert_eq!(
        ErrorKind::from(StatusCode::BadEncodingError),
        ErrorKind::EncodingFailure
    );
}

#[test]
fn codec_error_display() {
    let e = CodecError::new(StatusCode::BadDecodingError)
        .with_offset(12)
        .with_field(Some("Outer.Inner"));
    assert_eq!(
        e.to_string(),
        "malformed encoding (BadDecodingError) at offset 12 in field Outer.Inner"
    );
}
