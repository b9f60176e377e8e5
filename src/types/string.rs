// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! `UAString` and its alias `XmlElement`.

use std::{
    fmt,
    io::{Read, Write},
};

use crate::types::{
    encoding::{
        read_length_prefixed_bytes, write_length_prefixed_bytes, BinaryEncoder, DecodingOptions,
        EncodingResult,
    },
    status_codes::StatusCode,
};

/// The OPC UA String, named so it does not collide with `String`. It holds UTF-8 text or null,
/// and null is kept distinct from the empty string all the way through every encoding that can
/// tell them apart.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default, Serialize, Deserialize)]
pub struct UAString {
    value: Option<String>,
}

/// An XML fragment, carried as a string
pub type XmlElement = UAString;

impl UAString {
    pub fn null() -> UAString {
        UAString { value: None }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// True for null as well as for the empty string
    pub fn is_empty(&self) -> bool {
        self.value.as_ref().map_or(true, |v| v.is_empty())
    }
}

impl fmt::Display for UAString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(ref value) => f.write_str(value),
            None => f.write_str("[null]"),
        }
    }
}

impl AsRef<str> for UAString {
    fn as_ref(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

impl PartialEq<str> for UAString {
    fn eq(&self, other: &str) -> bool {
        self.value.as_deref() == Some(other)
    }
}

impl From<String> for UAString {
    fn from(value: String) -> Self {
        UAString { value: Some(value) }
    }
}

impl From<&String> for UAString {
    fn from(value: &String) -> Self {
        UAString::from(value.clone())
    }
}

impl<'a> From<&'a str> for UAString {
    fn from(value: &'a str) -> Self {
        UAString::from(value.to_string())
    }
}

impl From<UAString> for String {
    fn from(value: UAString) -> Self {
        value.value.unwrap_or_default()
    }
}

impl BinaryEncoder<UAString> for UAString {
    fn byte_len(&self) -> usize {
        4 + self.as_ref().len()
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        write_length_prefixed_bytes(stream, self.value.as_ref().map(|v| v.as_bytes()))
    }

    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let limit = decoding_options.max_string_length;
        let Some(bytes) = read_length_prefixed_bytes(stream, limit, decoding_options)? else {
            return Ok(UAString::null());
        };
        String::from_utf8(bytes).map(UAString::from).map_err(|err| {
            error!("Decoded string was not valid UTF-8 - {}", err);
            StatusCode::BadDecodingError
        })
    }
}

#[test]
fn null_is_not_empty_string() {
    let null = UAString::null();
    assert!(null.is_null());
    assert!(null.is_empty());
    assert_eq!(null.to_string(), "[null]");

    let empty = UAString::from("");
    assert!(!empty.is_null());
    assert!(empty.is_empty());
    assert_ne!(null, empty);
}

#[test]
fn compare_with_str() {
    assert!(!UAString::null().eq(""));
    assert!(UAString::from("").eq(""));

    let s = UAString::from("Sunshine");
    assert!(s.eq("Sunshine"));
    assert!(!s.eq("Sunshine "));
    assert_eq!(String::from(s), "Sunshine");
}
