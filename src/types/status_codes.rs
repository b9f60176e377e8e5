// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! The status code values the encoding engine produces or passes through. The full list of OPC UA
//! status codes belongs to the generated layer; any other value still round trips as raw bits.

#![allow(non_upper_case_globals)]

use std::{
    error::Error,
    fmt,
    io::{Read, Write},
};

use crate::types::encoding::{read_u32, write_u32, BinaryEncoder, DecodingOptions, EncodingResult};

bitflags! {
    pub struct StatusCode: u32 {
        // Masks and flags
        const STATUS_MASK = 0xffff_0000;
        const BIT_MASK = 0x0000_ffff;
        const IS_ERROR = 0x8000_0000;
        const IS_UNCERTAIN = 0x4000_0000;
        const LIMIT_LOW = 0x0000_0100;
        const LIMIT_HIGH = 0x0000_0200;
        const LIMIT_CONSTANT = 0x0000_0300;
        const HISTORICAL_CALCULATED = 0x0000_0001;
        const HISTORICAL_INTERPOLATED = 0x0000_0002;
        const OVERFLOW = 0x0000_0080;
        const SEMANTICS_CHANGED = 0x0000_4000;
        const STRUCTURE_CHANGED = 0x0000_8000;

        // Values
        const Good = 0;
        const Uncertain = 0x4000_0000;
        const Bad = 0x8000_0000;
        const UncertainLastUsableValue = 0x4090_0000;
        const BadUnexpectedError = 0x8001_0000;
        const BadInternalError = 0x8002_0000;
        const BadOutOfMemory = 0x8003_0000;
        const BadEncodingError = 0x8006_0000;
        const BadDecodingError = 0x8007_0000;
        const BadEncodingLimitsExceeded = 0x8008_0000;
        const BadDataTypeIdUnknown = 0x8011_0000;
        const BadNodeIdInvalid = 0x8033_0000;
        const BadNodeIdUnknown = 0x8034_0000;
        const BadDataEncodingInvalid = 0x8038_0000;
        const BadDataEncodingUnsupported = 0x8039_0000;
        const BadOutOfRange = 0x803c_0000;
        const BadTypeMismatch = 0x8074_0000;
        const BadInvalidArgument = 0x80ab_0000;
        const BadEndOfStream = 0x80b0_0000;
    }
}

impl StatusCode {
    /// Returns the symbolic name of the status, ignoring any info bits. Values that are not known
    /// to this crate are named by their hex value.
    pub fn name(&self) -> String {
        let name = match self.status() {
            StatusCode::Good => "Good",
            StatusCode::Uncertain => "Uncertain",
            StatusCode::Bad => "Bad",
            StatusCode::UncertainLastUsableValue => "UncertainLastUsableValue",
            StatusCode::BadUnexpectedError => "BadUnexpectedError",
            StatusCode::BadInternalError => "BadInternalError",
            StatusCode::BadOutOfMemory => "BadOutOfMemory",
            StatusCode::BadEncodingError => "BadEncodingError",
            StatusCode::BadDecodingError => "BadDecodingError",
            StatusCode::BadEncodingLimitsExceeded => "BadEncodingLimitsExceeded",
            StatusCode::BadDataTypeIdUnknown => "BadDataTypeIdUnknown",
            StatusCode::BadNodeIdInvalid => "BadNodeIdInvalid",
            StatusCode::BadNodeIdUnknown => "BadNodeIdUnknown",
            StatusCode::BadDataEncodingInvalid => "BadDataEncodingInvalid",
            StatusCode::BadDataEncodingUnsupported => "BadDataEncodingUnsupported",
            StatusCode::BadOutOfRange => "BadOutOfRange",
            StatusCode::BadTypeMismatch => "BadTypeMismatch",
            StatusCode::BadInvalidArgument => "BadInvalidArgument",
            StatusCode::BadEndOfStream => "BadEndOfStream",
            other => return format!("0x{:08X}", other.bits()),
        };
        name.to_string()
    }

    /// The info bits only
    pub fn bitflags(&self) -> StatusCode {
        *self & StatusCode::BIT_MASK
    }

    /// The status without its info bits
    pub fn status(&self) -> StatusCode {
        *self & StatusCode::STATUS_MASK
    }

    pub fn is_bad(&self) -> bool {
        self.contains(StatusCode::IS_ERROR)
    }

    pub fn is_uncertain(&self) -> bool {
        self.contains(StatusCode::IS_UNCERTAIN)
    }

    /// Neither bad nor uncertain
    pub fn is_good(&self) -> bool {
        !self.is_bad() && !self.is_uncertain()
    }
}

// Values and info bits share one u32, so the Debug from bitflags! reads badly in messages
impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let info = self.bitflags();
        if info.is_empty() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{}+0x{:04X}", self.name(), info.bits())
        }
    }
}

impl Error for StatusCode {}

/// Encoded as the raw UInt32. Unknown values decode unchanged.
impl BinaryEncoder<StatusCode> for StatusCode {
    fn byte_len(&self) -> usize {
        4
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        write_u32(stream, self.bits())
    }

    fn decode<S: Read + ?Sized>(stream: &mut S, _: &DecodingOptions) -> EncodingResult<Self> {
        Ok(StatusCode::from_bits_truncate(read_u32(stream)?))
    }
}

#[test]
fn status_code_severity() {
    assert!(StatusCode::Good.is_good());
    assert!(StatusCode::UncertainLastUsableValue.is_uncertain());
    assert!(!StatusCode::UncertainLastUsableValue.is_good());
    assert!(StatusCode::BadDecodingError.is_bad());
    assert!(!StatusCode::BadDecodingError.is_uncertain());

    let flagged = StatusCode::BadDecodingError | StatusCode::HISTORICAL_CALCULATED;
    assert_eq!(flagged.status(), StatusCode::BadDecodingError);
    assert_eq!(flagged.bitflags(), StatusCode::HISTORICAL_CALCULATED);
}

#[test]
fn status_code_display() {
    assert_eq!(StatusCode::BadEndOfStream.to_string(), "BadEndOfStream");
    assert_eq!(
        (StatusCode::BadDecodingError | StatusCode::OVERFLOW).to_string(),
        "BadDecodingError+0x0080"
    );
    assert_eq!(
        StatusCode::from_bits_truncate(0x80aa_0000).to_string(),
        "0x80AA0000"
    );
}
