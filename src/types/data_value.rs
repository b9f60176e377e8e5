// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! `DataValue`, a value with its status and timestamps. A mask byte says which parts follow.

use std::io::{Read, Write};

use crate::types::{date_time::*, encoding::*, status_codes::StatusCode, variant::Variant};

bitflags! {
    struct DataValueFlags: u8 {
        const HAS_VALUE = 0x1;
        const HAS_STATUS = 0x2;
        const HAS_SOURCE_TIMESTAMP = 0x4;
        const HAS_SERVER_TIMESTAMP = 0x8;
        /// Only honoured when the source timestamp is present
        const HAS_SOURCE_PICOSECONDS = 0x10;
        /// Only honoured when the server timestamp is present
        const HAS_SERVER_PICOSECONDS = 0x20;
    }
}

/// Every part is optional. An absent part is not written and its mask bit is clear.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    pub value: Option<Variant>,
    /// Absent means Good
    pub status: Option<StatusCode>,
    pub source_timestamp: Option<DateTime>,
    /// 10 picosecond intervals added to the source timestamp
    pub source_picoseconds: Option<i16>,
    pub server_timestamp: Option<DateTime>,
    /// 10 picosecond intervals added to the server timestamp
    pub server_picoseconds: Option<i16>,
}

impl BinaryEncoder<DataValue> for DataValue {
    fn byte_len(&self) -> usize {
        let mut size = 1;
        if let Some(ref value) = self.value {
            size += value.byte_len();
        }
        if self.status.is_some() {
            size += 4;
        }
        if let Some(ref source_timestamp) = self.source_timestamp {
            size += source_timestamp.byte_len();
            if self.source_picoseconds.is_some() {
                size += 2;
            }
        }
        if let Some(ref server_timestamp) = self.server_timestamp {
            size += server_timestamp.byte_len();
            if self.server_picoseconds.is_some() {
                size += 2;
            }
        }
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        let mut size = 0;

        let encoding_mask = self.encoding_mask();
        size += encoding_mask.bits().encode(stream)?;

        if let Some(ref value) = self.value {
            size += value.encode(stream)?;
        }
        if let Some(ref status) = self.status {
            size += status.encode(stream)?;
        }
        if let Some(ref source_timestamp) = self.source_timestamp {
            size += source_timestamp.encode(stream)?;
            if let Some(source_picoseconds) = self.source_picoseconds {
                size += source_picoseconds.encode(stream)?;
            }
        }
        if let Some(ref server_timestamp) = self.server_timestamp {
            size += server_timestamp.encode(stream)?;
            if let Some(server_picoseconds) = self.server_picoseconds {
                size += server_picoseconds.encode(stream)?;
            }
        }
        Ok(size)
    }

    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let encoding_mask = u8::decode(stream, decoding_options)?;
        let encoding_mask = DataValueFlags::from_bits(encoding_mask).ok_or_else(|| {
            error!("Data value encoding mask {:#04x} is invalid", encoding_mask);
            StatusCode::BadDecodingError
        })?;

        // Value
        let value = if encoding_mask.contains(DataValueFlags::HAS_VALUE) {
            Some(Variant::decode(stream, decoding_options)?)
        } else {
            None
        };
        // Status
        let status = if encoding_mask.contains(DataValueFlags::HAS_STATUS) {
            Some(StatusCode::decode(stream, decoding_options)?)
        } else {
            None
        };
        // Source timestamp
        let source_timestamp = if encoding_mask.contains(DataValueFlags::HAS_SOURCE_TIMESTAMP) {
            // The source timestamp should never be adjusted, not even when ignoring clock skew
            let decoding_options = DecodingOptions {
                client_offset: chrono::Duration::zero(),
                ..decoding_options.clone()
            };
            Some(DateTime::decode(stream, &decoding_options)?)
        } else {
            None
        };
        let source_picoseconds = if encoding_mask.contains(DataValueFlags::HAS_SOURCE_PICOSECONDS) {
            Some(i16::decode(stream, decoding_options)?)
        } else {
            None
        };
        // Server timestamp
        let server_timestamp = if encoding_mask.contains(DataValueFlags::HAS_SERVER_TIMESTAMP) {
            Some(DateTime::decode(stream, decoding_options)?)
        } else {
            None
        };
        let server_picoseconds = if encoding_mask.contains(DataValueFlags::HAS_SERVER_PICOSECONDS) {
            Some(i16::decode(stream, decoding_options)?)
        } else {
            None
        };
        // Pico second values are discarded if associated timestamp is not supplied
        Ok(DataValue {
            value,
            status,
            source_picoseconds: source_timestamp.and(source_picoseconds),
            source_timestamp,
            server_picoseconds: server_timestamp.and(server_picoseconds),
            server_timestamp,
        })
    }
}

impl From<Variant> for DataValue {
    fn from(v: Variant) -> Self {
        DataValue::value_only(v)
    }
}

impl DataValue {
    /// Creates a `DataValue` from the supplied value with nothing else.
    pub fn value_only<V>(value: V) -> DataValue
    where
        V: Into<Variant>,
    {
        DataValue {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Creates an empty DataValue
    pub fn null() -> DataValue {
        DataValue::default()
    }

    /// Returns the status code or Good if there is no code on the value
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::Good)
    }

    fn encoding_mask(&self) -> DataValueFlags {
        let mut encoding_mask = DataValueFlags::empty();
        if self.value.is_some() {
            encoding_mask |= DataValueFlags::HAS_VALUE;
        }
        if self.status.is_some() {
            encoding_mask |= DataValueFlags::HAS_STATUS;
        }
        if self.source_timestamp.is_some() {
            encoding_mask |= DataValueFlags::HAS_SOURCE_TIMESTAMP;
            if self.source_picoseconds.is_some() {
                encoding_mask |= DataValueFlags::HAS_SOURCE_PICOSECONDS;
            }
        }
        if self.server_timestamp.is_some() {
            encoding_mask |= DataValueFlags::HAS_SERVER_TIMESTAMP;
            if self.server_picoseconds.is_some() {
                encoding_mask |= DataValueFlags::HAS_SERVER_PICOSECONDS;
            }
        }
        encoding_mask
    }
}
