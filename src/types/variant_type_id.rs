// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Built-in type ids and the Variant encoding mask. On the wire bit 7 (0x80) of the mask flags
//! array values and bit 6 (0x40) flags array dimensions, as in OPC UA Part 6 5.2.2.16.

use crate::types::{Identifier, NodeId, StatusCode};

/// The variant type id is the type of the variant but without its payload. The discriminants are
/// the built-in type ids of OPC UA Part 6 table 1, which are also the node ids of the
/// corresponding data types in namespace 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantTypeId {
    // Null / Empty
    Empty = 0,
    // Scalar types
    Boolean = 1,
    SByte = 2,
    Byte = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float = 10,
    Double = 11,
    String = 12,
    DateTime = 13,
    Guid = 14,
    ByteString = 15,
    XmlElement = 16,
    NodeId = 17,
    ExpandedNodeId = 18,
    StatusCode = 19,
    QualifiedName = 20,
    LocalizedText = 21,
    ExtensionObject = 22,
    DataValue = 23,
    Variant = 24,
    DiagnosticInfo = 25,
}

impl TryFrom<&NodeId> for VariantTypeId {
    type Error = ();
    fn try_from(value: &NodeId) -> Result<Self, Self::Error> {
        match value.identifier {
            Identifier::Numeric(type_id) if value.namespace == 0 && type_id <= 25 => {
                Self::from_type_id(type_id as u8).map_err(|_| ())
            }
            _ => Err(()),
        }
    }
}

pub(crate) struct EncodingMask;

impl EncodingMask {
    /// Bits holding the built-in type id
    pub const TYPE_ID_MASK: u8 = 0x3f;
    /// Bit indicates an array with dimensions
    pub const ARRAY_DIMENSIONS_BIT: u8 = 1 << 6;
    /// Bit indicates an array with values
    pub const ARRAY_VALUES_BIT: u8 = 1 << 7;

    pub const ARRAY_MASK: u8 = EncodingMask::ARRAY_DIMENSIONS_BIT | EncodingMask::ARRAY_VALUES_BIT;
}

const ALL_TYPES: [VariantTypeId; 26] = [
    VariantTypeId::Empty,
    VariantTypeId::Boolean,
    VariantTypeId::SByte,
    VariantTypeId::Byte,
    VariantTypeId::Int16,
    VariantTypeId::UInt16,
    VariantTypeId::Int32,
    VariantTypeId::UInt32,
    VariantTypeId::Int64,
    VariantTypeId::UInt64,
    VariantTypeId::Float,
    VariantTypeId::Double,
    VariantTypeId::String,
    VariantTypeId::DateTime,
    VariantTypeId::Guid,
    VariantTypeId::ByteString,
    VariantTypeId::XmlElement,
    VariantTypeId::NodeId,
    VariantTypeId::ExpandedNodeId,
    VariantTypeId::StatusCode,
    VariantTypeId::QualifiedName,
    VariantTypeId::LocalizedText,
    VariantTypeId::ExtensionObject,
    VariantTypeId::DataValue,
    VariantTypeId::Variant,
    VariantTypeId::DiagnosticInfo,
];

impl VariantTypeId {
    /// The built-in type id, i.e. the low 6 bits of a variant encoding mask
    pub fn type_id(&self) -> u8 {
        *self as u8
    }

    pub fn encoding_mask(&self) -> u8 {
        self.type_id()
    }

    pub fn from_type_id(type_id: u8) -> Result<Self, StatusCode> {
        ALL_TYPES.get(type_id as usize).copied().ok_or_else(|| {
            error!("Unrecognized variant type id {}", type_id);
            StatusCode::BadDecodingError
        })
    }

    pub fn from_encoding_mask(encoding_mask: u8) -> Result<Self, StatusCode> {
        Self::from_type_id(encoding_mask & EncodingMask::TYPE_ID_MASK)
    }

    /// The node id of the data type in namespace 0
    pub fn data_type_id(&self) -> NodeId {
        NodeId::ns0(self.type_id() as u32)
    }

    /// The name of the type as used for XML element names
    pub fn name(&self) -> &'static str {
        match self {
            VariantTypeId::Empty => "Null",
            VariantTypeId::Boolean => "Boolean",
            VariantTypeId::SByte => "SByte",
            VariantTypeId::Byte => "Byte",
            VariantTypeId::Int16 => "Int16",
            VariantTypeId::UInt16 => "UInt16",
            VariantTypeId::Int32 => "Int32",
            VariantTypeId::UInt32 => "UInt32",
            VariantTypeId::Int64 => "Int64",
            VariantTypeId::UInt64 => "UInt64",
            VariantTypeId::Float => "Float",
            VariantTypeId::Double => "Double",
            VariantTypeId::String => "String",
            VariantTypeId::DateTime => "DateTime",
            VariantTypeId::Guid => "Guid",
            VariantTypeId::ByteString => "ByteString",
            VariantTypeId::XmlElement => "XmlElement",
            VariantTypeId::NodeId => "NodeId",
            VariantTypeId::ExpandedNodeId => "ExpandedNodeId",
            VariantTypeId::StatusCode => "StatusCode",
            VariantTypeId::QualifiedName => "QualifiedName",
            VariantTypeId::LocalizedText => "LocalizedText",
            VariantTypeId::ExtensionObject => "ExtensionObject",
            VariantTypeId::DataValue => "DataValue",
            VariantTypeId::Variant => "Variant",
            VariantTypeId::DiagnosticInfo => "DiagnosticInfo",
        }
    }

    /// Looks up a type from its XML element name
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_TYPES.iter().copied().find(|t| t.name() == name)
    }

    /// Tests and returns true if the variant holds a numeric type
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            VariantTypeId::SByte
                | VariantTypeId::Byte
                | VariantTypeId::Int16
                | VariantTypeId::UInt16
                | VariantTypeId::Int32
                | VariantTypeId::UInt32
                | VariantTypeId::Int64
                | VariantTypeId::UInt64
                | VariantTypeId::Float
                | VariantTypeId::Double
        )
    }
}

#[test]
fn variant_type_id_mask() {
    assert_eq!(
        VariantTypeId::from_encoding_mask(6 | EncodingMask::ARRAY_VALUES_BIT).unwrap(),
        VariantTypeId::Int32
    );
    assert_eq!(EncodingMask::ARRAY_VALUES_BIT, 0x80);
    assert_eq!(EncodingMask::ARRAY_DIMENSIONS_BIT, 0x40);
    assert_eq!(VariantTypeId::DiagnosticInfo.type_id(), 25);
    assert_eq!(
        VariantTypeId::from_type_id(26).unwrap_err(),
        StatusCode::BadDecodingError
    );
    assert_eq!(
        VariantTypeId::try_from(&NodeId::ns0(12)).unwrap(),
        VariantTypeId::String
    );
    assert_eq!(VariantTypeId::from_name("LocalizedText"), Some(VariantTypeId::LocalizedText));
}
