// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Contains the implementation of `NodeId` and `Identifier`.

use std::{
    self, fmt,
    io::{Read, Write},
    str::FromStr,
};

use crate::types::{
    byte_string::ByteString, encoding::*, guid::Guid, status_codes::StatusCode, string::*,
};

/// The kind of identifier, numeric, string, guid or byte
#[derive(Eq, PartialEq, Clone, Debug, Hash, Serialize, Deserialize)]
pub enum Identifier {
    Numeric(u32),
    String(UAString),
    Guid(Guid),
    ByteString(ByteString),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Identifier::Numeric(v) => write!(f, "i={}", *v),
            Identifier::String(v) => write!(f, "s={}", v),
            Identifier::Guid(v) => write!(f, "g={:?}", v),
            Identifier::ByteString(v) => write!(f, "b={}", v.as_base64()),
        }
    }
}

impl FromStr for Identifier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 2 || !s.is_char_boundary(2) {
            Err(())
        } else {
            let k = &s[..2];
            let v = &s[2..];
            match k {
                "i=" => v.parse::<u32>().map(|v| v.into()).map_err(|_| ()),
                "s=" => Ok(UAString::from(v).into()),
                "g=" => Guid::from_str(v).map(|v| v.into()).map_err(|_| ()),
                "b=" => ByteString::from_base64(v).map(|v| v.into()).ok_or(()),
                _ => Err(()),
            }
        }
    }
}

impl From<i32> for Identifier {
    fn from(v: i32) -> Self {
        Identifier::Numeric(v as u32)
    }
}

impl From<u32> for Identifier {
    fn from(v: u32) -> Self {
        Identifier::Numeric(v)
    }
}

impl<'a> From<&'a str> for Identifier {
    fn from(v: &'a str) -> Self {
        Identifier::from(UAString::from(v))
    }
}

impl From<&String> for Identifier {
    fn from(v: &String) -> Self {
        Identifier::from(UAString::from(v))
    }
}

impl From<String> for Identifier {
    fn from(v: String) -> Self {
        Identifier::from(UAString::from(v))
    }
}

impl From<UAString> for Identifier {
    fn from(v: UAString) -> Self {
        Identifier::String(v)
    }
}

impl From<Guid> for Identifier {
    fn from(v: Guid) -> Self {
        Identifier::Guid(v)
    }
}

impl From<ByteString> for Identifier {
    fn from(v: ByteString) -> Self {
        Identifier::ByteString(v)
    }
}

/// An identifier for a node in the address space of an OPC UA Server.
#[derive(PartialEq, Eq, Clone, Debug, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// The index for a namespace
    pub namespace: u16,
    /// The identifier for the node in the address space
    pub identifier: Identifier,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};{}", self.namespace, self.identifier)
        } else {
            write!(f, "{}", self.identifier)
        }
    }
}

// Node id encoding byte values, OPC UA Part 6 5.2.2.9
pub(crate) const TWO_BYTE: u8 = 0x0;
pub(crate) const FOUR_BYTE: u8 = 0x1;
pub(crate) const NUMERIC: u8 = 0x2;
pub(crate) const STRING: u8 = 0x3;
pub(crate) const GUID: u8 = 0x4;
pub(crate) const BYTE_STRING: u8 = 0x5;

/// Returns the most compact encoding byte the node id admits
pub(crate) fn encoding_byte(node_id: &NodeId) -> u8 {
    match node_id.identifier {
        Identifier::Numeric(value) => {
            if node_id.namespace == 0 && value <= 255 {
                TWO_BYTE
            } else if node_id.namespace <= 255 && value <= 65535 {
                FOUR_BYTE
            } else {
                NUMERIC
            }
        }
        Identifier::String(_) => STRING,
        Identifier::Guid(_) => GUID,
        Identifier::ByteString(_) => BYTE_STRING,
    }
}

/// Writes the encoding byte, with any extra flags or'd in, and the node id fields it implies
pub(crate) fn write_node_id<S: Write + ?Sized>(
    stream: &mut S,
    node_id: &NodeId,
    flags: u8,
) -> EncodingResult<usize> {
    let encoding = encoding_byte(node_id);
    let mut size = write_u8(stream, encoding | flags)?;
    match &node_id.identifier {
        Identifier::Numeric(value) => match encoding {
            TWO_BYTE => {
                // node id fits into 2 bytes when the namespace is 0 and the value <= 255
                size += write_u8(stream, *value as u8)?;
            }
            FOUR_BYTE => {
                // node id fits into 4 bytes when namespace <= 255 and value <= 65535
                size += write_u8(stream, node_id.namespace as u8)?;
                size += write_u16(stream, *value as u16)?;
            }
            _ => {
                size += write_u16(stream, node_id.namespace)?;
                size += write_u32(stream, *value)?;
            }
        },
        Identifier::String(value) => {
            size += write_u16(stream, node_id.namespace)?;
            size += value.encode(stream)?;
        }
        Identifier::Guid(value) => {
            size += write_u16(stream, node_id.namespace)?;
            size += value.encode(stream)?;
        }
        Identifier::ByteString(value) => {
            size += write_u16(stream, node_id.namespace)?;
            size += value.encode(stream)?;
        }
    }
    Ok(size)
}

/// Reads the node id fields implied by an encoding byte that has already been read and masked
pub(crate) fn read_node_id<S: Read + ?Sized>(
    stream: &mut S,
    encoding: u8,
    decoding_options: &DecodingOptions,
) -> EncodingResult<NodeId> {
    let node_id = match encoding {
        TWO_BYTE => {
            let value = read_u8(stream)?;
            NodeId::new(0, u32::from(value))
        }
        FOUR_BYTE => {
            let namespace = read_u8(stream)?;
            let value = read_u16(stream)?;
            NodeId::new(u16::from(namespace), u32::from(value))
        }
        NUMERIC => {
            let namespace = read_u16(stream)?;
            let value = read_u32(stream)?;
            NodeId::new(namespace, value)
        }
        STRING => {
            let namespace = read_u16(stream)?;
            let value = UAString::decode(stream, decoding_options)?;
            NodeId::new(namespace, value)
        }
        GUID => {
            let namespace = read_u16(stream)?;
            let value = Guid::decode(stream, decoding_options)?;
            NodeId::new(namespace, value)
        }
        BYTE_STRING => {
            let namespace = read_u16(stream)?;
            let value = ByteString::decode(stream, decoding_options)?;
            NodeId::new(namespace, value)
        }
        _ => {
            error!("Unrecognized node id type {}", encoding);
            return Err(StatusCode::BadDecodingError);
        }
    };
    Ok(node_id)
}

impl BinaryEncoder<NodeId> for NodeId {
    fn byte_len(&self) -> usize {
        match encoding_byte(self) {
            TWO_BYTE => 2,
            FOUR_BYTE => 4,
            NUMERIC => 7,
            _ => {
                3 + match self.identifier {
                    Identifier::String(ref value) => value.byte_len(),
                    Identifier::Guid(ref value) => value.byte_len(),
                    Identifier::ByteString(ref value) => value.byte_len(),
                    Identifier::Numeric(_) => 4,
                }
            }
        }
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        write_node_id(stream, self, 0)
    }

    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let encoding = read_u8(stream)?;
        read_node_id(stream, encoding, decoding_options)
    }
}

impl FromStr for NodeId {
    type Err = StatusCode;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        use regex::Regex;

        // Parses a node from a string using the format specified in 5.3.1.10 part 6
        //
        // ns=<namespaceindex>;<type>=<value>
        //
        // Where type:
        //   i = NUMERIC
        //   s = STRING
        //   g = GUID
        //   b = OPAQUE (ByteString)
        //
        // If namespace == 0, the ns=0; will be omitted

        lazy_static! {
            // Contains capture groups "ns" and "t" for namespace and type respectively
            static ref RE: Regex = Regex::new(r"^(ns=(?P<ns>[0-9]+);)?(?P<t>[isgb]=.+)$").unwrap();
        }

        let captures = RE.captures(s).ok_or(StatusCode::BadNodeIdInvalid)?;

        // Check namespace (optional)
        let namespace = if let Some(ns) = captures.name("ns") {
            ns.as_str()
                .parse::<u16>()
                .map_err(|_| StatusCode::BadNodeIdInvalid)?
        } else {
            0
        };

        // Type identifier
        let t = captures.name("t").ok_or(StatusCode::BadNodeIdInvalid)?;
        Identifier::from_str(t.as_str())
            .map(|t| NodeId::new(namespace, t))
            .map_err(|_| StatusCode::BadNodeIdInvalid)
    }
}

impl From<&NodeId> for NodeId {
    fn from(v: &NodeId) -> Self {
        v.clone()
    }
}

impl Into<String> for NodeId {
    fn into(self) -> String {
        self.to_string()
    }
}

impl<'a> From<(u16, &'a str)> for NodeId {
    fn from(v: (u16, &'a str)) -> Self {
        Self::new(v.0, UAString::from(v.1))
    }
}

impl From<(u16, UAString)> for NodeId {
    fn from(v: (u16, UAString)) -> Self {
        Self::new(v.0, v.1)
    }
}

impl From<(u16, u32)> for NodeId {
    fn from(v: (u16, u32)) -> Self {
        Self::new(v.0, v.1)
    }
}

impl From<(u16, Guid)> for NodeId {
    fn from(v: (u16, Guid)) -> Self {
        Self::new(v.0, v.1)
    }
}

impl From<(u16, ByteString)> for NodeId {
    fn from(v: (u16, ByteString)) -> Self {
        Self::new(v.0, v.1)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::null()
    }
}

impl NodeId {
    // Constructs a new NodeId from anything that can be turned into Identifier
    // u32, Guid, ByteString or String
    pub fn new<T>(namespace: u16, value: T) -> NodeId
    where
        T: 'static + Into<Identifier>,
    {
        NodeId {
            namespace,
            identifier: value.into(),
        }
    }

    /// A numeric node id in namespace 0, the form every standard type and encoding id takes
    pub fn ns0(value: u32) -> NodeId {
        NodeId::new(0, value)
    }

    /// Test if the node id is null, i.e. 0 namespace and 0 identifier
    pub fn is_null(&self) -> bool {
        self.namespace == 0 && self.identifier == Identifier::Numeric(0)
    }

    /// Returns a null node id
    pub fn null() -> NodeId {
        NodeId::new(0, 0u32)
    }
}
