// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! `QualifiedName`, a name qualified by a namespace index.

use std::{
    fmt,
    io::{Read, Write},
};

use crate::types::{encoding::*, string::*};

/// Written in binary as the UInt16 namespace index followed by the name. In JSON the index goes
/// in the `Uri` member as a number and is left out when it is 0.
#[derive(PartialEq, Debug, Clone)]
pub struct QualifiedName {
    pub namespace_index: u16,
    pub name: UAString,
}

impl QualifiedName {
    pub fn new<T>(namespace_index: u16, name: T) -> QualifiedName
    where
        T: Into<UAString>,
    {
        QualifiedName {
            namespace_index,
            name: name.into(),
        }
    }

    pub fn null() -> QualifiedName {
        QualifiedName::new(0, UAString::null())
    }

    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && self.name.is_null()
    }
}

impl Default for QualifiedName {
    fn default() -> Self {
        QualifiedName::null()
    }
}

/// A name in namespace 0
impl<'a> From<&'a str> for QualifiedName {
    fn from(value: &'a str) -> Self {
        QualifiedName::new(0, value)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace_index {
            0 => write!(f, "{}", self.name),
            ns => write!(f, "{}:{}", ns, self.name),
        }
    }
}

impl BinaryEncoder<QualifiedName> for QualifiedName {
    fn byte_len(&self) -> usize {
        2 + self.name.byte_len()
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        Ok(self.namespace_index.encode(stream)? + self.name.encode(stream)?)
    }

    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let namespace_index = u16::decode(stream, decoding_options)?;
        let name = UAString::decode(stream, decoding_options)?;
        Ok(QualifiedName::new(namespace_index, name))
    }
}

#[test]
fn qualified_name_display() {
    assert_eq!(QualifiedName::from("Temperature").to_string(), "Temperature");
    assert_eq!(QualifiedName::new(3, "Pressure").to_string(), "3:Pressure");
    assert!(QualifiedName::null().is_null());
    assert!(!QualifiedName::new(0, "").is_null());
}
