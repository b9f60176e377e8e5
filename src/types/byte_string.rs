// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! `ByteString`, an octet sequence that distinguishes null from empty.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::types::encoding::{
    read_length_prefixed_bytes, write_length_prefixed_bytes, BinaryEncoder, DecodingOptions,
    EncodingResult,
};

/// A sequence of octets. `None` is the null byte string, written with length -1.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default)]
pub struct ByteString {
    pub value: Option<Vec<u8>>,
}

impl ByteString {
    pub fn null() -> ByteString {
        ByteString { value: None }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// True for a present but zero length value. A null byte string is not empty.
    pub fn is_empty(&self) -> bool {
        self.value.as_ref().map_or(false, |v| v.is_empty())
    }

    pub fn is_null_or_empty(&self) -> bool {
        self.value.as_ref().map_or(true, |v| v.is_empty())
    }

    /// Parses standard Base64 with padding. Surrounding whitespace is ignored.
    pub fn from_base64(data: &str) -> Option<ByteString> {
        STANDARD.decode(data.trim()).ok().map(ByteString::from)
    }

    /// The value as standard Base64. Null and empty both give an empty string.
    pub fn as_base64(&self) -> String {
        STANDARD.encode(self.as_ref())
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        self.value.as_deref().unwrap_or(&[])
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(value: Vec<u8>) -> Self {
        ByteString { value: Some(value) }
    }
}

impl<'a, T> From<&'a T> for ByteString
where
    T: AsRef<[u8]> + ?Sized,
{
    fn from(value: &'a T) -> Self {
        ByteString::from(value.as_ref().to_vec())
    }
}

impl BinaryEncoder<ByteString> for ByteString {
    fn byte_len(&self) -> usize {
        4 + self.as_ref().len()
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        write_length_prefixed_bytes(stream, self.value.as_deref())
    }

    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let limit = decoding_options.max_byte_string_length;
        Ok(ByteString {
            value: read_length_prefixed_bytes(stream, limit, decoding_options)?,
        })
    }
}

// Serialized as Base64 text so definitions holding opaque node ids stay readable in YAML

impl Serialize for ByteString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value
            .as_ref()
            .map(|_| self.as_base64())
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ByteString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<ByteString, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(ByteString::null()),
            Some(text) => ByteString::from_base64(&text)
                .ok_or_else(|| de::Error::custom("byte string is not valid base64")),
        }
    }
}

#[test]
fn null_empty_and_bytes() {
    let null = ByteString::null();
    assert!(null.is_null() && !null.is_empty() && null.is_null_or_empty());

    let empty = ByteString::from(&[]);
    assert!(!empty.is_null() && empty.is_empty());
    assert_ne!(null, empty);

    let bytes = ByteString::from(&[1u8, 2, 3, 4]);
    assert!(!bytes.is_null_or_empty());
    assert_eq!(bytes.as_ref(), &[1, 2, 3, 4]);
}

#[test]
fn base64_text() {
    let v = ByteString::from(b"hello");
    assert_eq!(v.as_base64(), "aGVsbG8=");
    assert_eq!(ByteString::from_base64(" aGVsbG8=\n").unwrap(), v);
    assert!(ByteString::from_base64("not base64!").is_none());
    assert_eq!(ByteString::null().as_base64(), "");
}
