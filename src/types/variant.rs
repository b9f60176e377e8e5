// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Contains the implementation of `Variant`.

use std::{
    fmt,
    io::{Read, Write},
};

use crate::types::{
    array::*,
    byte_string::ByteString,
    data_value::DataValue,
    date_time::DateTime,
    diagnostic_info::DiagnosticInfo,
    encoding::*,
    expanded_node_id::ExpandedNodeId,
    extension_object::ExtensionObject,
    guid::Guid,
    localized_text::LocalizedText,
    node_id::NodeId,
    qualified_name::QualifiedName,
    status_codes::StatusCode,
    string::{UAString, XmlElement},
    type_registry::TypeRegistry,
    variant_type_id::*,
};

/// A `Variant` holds built-in OPC UA data types, including single and multi dimensional arrays,
/// data values and extension objects.
///
/// As variants may be passed around a lot on the stack, Boxes are used for more complex types to
/// keep the size of this type down a bit, especially when used in arrays.
///
#[derive(PartialEq, Debug, Clone)]
pub enum Variant {
    /// Empty type has no value. It is equivalent to a Null value (part 6 5.1.6)
    Empty,
    /// Boolean
    Boolean(bool),
    /// Signed byte
    SByte(i8),
    /// Unsigned byte
    Byte(u8),
    /// Signed 16-bit int
    Int16(i16),
    /// Unsigned 16-bit int
    UInt16(u16),
    /// Signed 32-bit int
    Int32(i32),
    /// Unsigned 32-bit int
    UInt32(u32),
    /// Signed 64-bit int
    Int64(i64),
    /// Unsigned 64-bit int
    UInt64(u64),
    /// Float
    Float(f32),
    /// Double
    Double(f64),
    /// String
    String(UAString),
    /// DateTime
    DateTime(Box<DateTime>),
    /// Guid
    Guid(Box<Guid>),
    /// StatusCode
    StatusCode(StatusCode),
    /// ByteString
    ByteString(ByteString),
    /// XmlElement
    XmlElement(XmlElement),
    /// QualifiedName
    QualifiedName(Box<QualifiedName>),
    /// LocalizedText
    LocalizedText(Box<LocalizedText>),
    /// NodeId
    NodeId(Box<NodeId>),
    /// ExpandedNodeId
    ExpandedNodeId(Box<ExpandedNodeId>),
    /// ExtensionObject
    ExtensionObject(Box<ExtensionObject>),
    /// DataValue
    DataValue(Box<DataValue>),
    /// Variant. Only permitted as the element of an array of variants.
    Variant(Box<Variant>),
    /// DiagnosticInfo
    DiagnosticInfo(Box<DiagnosticInfo>),
    /// Single or multi dimension array which can contain any scalar type, all the same type.
    /// Nested arrays will be rejected.
    Array(Box<Array>),
}

impl From<()> for Variant {
    fn from(_: ()) -> Self {
        Variant::Empty
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Boolean(v)
    }
}

impl From<u8> for Variant {
    fn from(v: u8) -> Self {
        Variant::Byte(v)
    }
}

impl From<i8> for Variant {
    fn from(v: i8) -> Self {
        Variant::SByte(v)
    }
}

impl From<i16> for Variant {
    fn from(v: i16) -> Self {
        Variant::Int16(v)
    }
}

impl From<u16> for Variant {
    fn from(v: u16) -> Self {
        Variant::UInt16(v)
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Int32(v)
    }
}

impl From<u32> for Variant {
    fn from(v: u32) -> Self {
        Variant::UInt32(v)
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Variant::Int64(v)
    }
}

impl From<u64> for Variant {
    fn from(v: u64) -> Self {
        Variant::UInt64(v)
    }
}

impl From<f32> for Variant {
    fn from(v: f32) -> Self {
        Variant::Float(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Double(v)
    }
}

impl<'a> From<&'a str> for Variant {
    fn from(v: &'a str) -> Self {
        Variant::String(UAString::from(v))
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::String(UAString::from(v))
    }
}

impl From<UAString> for Variant {
    fn from(v: UAString) -> Self {
        Variant::String(v)
    }
}

impl From<DateTime> for Variant {
    fn from(v: DateTime) -> Self {
        Variant::DateTime(Box::new(v))
    }
}

impl From<Guid> for Variant {
    fn from(v: Guid) -> Self {
        Variant::Guid(Box::new(v))
    }
}

impl From<StatusCode> for Variant {
    fn from(v: StatusCode) -> Self {
        Variant::StatusCode(v)
    }
}

impl From<ByteString> for Variant {
    fn from(v: ByteString) -> Self {
        Variant::ByteString(v)
    }
}

impl From<QualifiedName> for Variant {
    fn from(v: QualifiedName) -> Self {
        Variant::QualifiedName(Box::new(v))
    }
}

impl From<LocalizedText> for Variant {
    fn from(v: LocalizedText) -> Self {
        Variant::LocalizedText(Box::new(v))
    }
}

impl From<NodeId> for Variant {
    fn from(v: NodeId) -> Self {
        Variant::NodeId(Box::new(v))
    }
}

impl From<ExpandedNodeId> for Variant {
    fn from(v: ExpandedNodeId) -> Self {
        Variant::ExpandedNodeId(Box::new(v))
    }
}

impl From<ExtensionObject> for Variant {
    fn from(v: ExtensionObject) -> Self {
        Variant::ExtensionObject(Box::new(v))
    }
}

impl From<DataValue> for Variant {
    fn from(v: DataValue) -> Self {
        Variant::DataValue(Box::new(v))
    }
}

impl From<DiagnosticInfo> for Variant {
    fn from(v: DiagnosticInfo) -> Self {
        Variant::DiagnosticInfo(Box::new(v))
    }
}

impl From<Array> for Variant {
    fn from(v: Array) -> Self {
        Variant::Array(Box::new(v))
    }
}

macro_rules! from_array_to_variant_impl {
    ($encoding_mask: expr, $rtype: ident) => {
        impl<'a> From<&'a Vec<$rtype>> for Variant {
            fn from(v: &'a Vec<$rtype>) -> Self {
                Variant::from(v.as_slice())
            }
        }

        impl From<Vec<$rtype>> for Variant {
            fn from(v: Vec<$rtype>) -> Self {
                Variant::from(v.as_slice())
            }
        }

        impl<'a> From<&'a [$rtype]> for Variant {
            fn from(v: &'a [$rtype]) -> Self {
                // Every element converts to the same variant type so the array is always valid
                Variant::from(Array {
                    value_type: $encoding_mask,
                    values: Some(v.iter().map(|v| Variant::from(v.clone())).collect()),
                    dimensions: None,
                })
            }
        }
    };
}

from_array_to_variant_impl!(VariantTypeId::String, String);
from_array_to_variant_impl!(VariantTypeId::String, UAString);
from_array_to_variant_impl!(VariantTypeId::Boolean, bool);
from_array_to_variant_impl!(VariantTypeId::SByte, i8);
from_array_to_variant_impl!(VariantTypeId::Byte, u8);
from_array_to_variant_impl!(VariantTypeId::Int16, i16);
from_array_to_variant_impl!(VariantTypeId::UInt16, u16);
from_array_to_variant_impl!(VariantTypeId::Int32, i32);
from_array_to_variant_impl!(VariantTypeId::UInt32, u32);
from_array_to_variant_impl!(VariantTypeId::Int64, i64);
from_array_to_variant_impl!(VariantTypeId::UInt64, u64);
from_array_to_variant_impl!(VariantTypeId::Float, f32);
from_array_to_variant_impl!(VariantTypeId::Double, f64);

/// This macro tries to return a `Vec<foo>` from a `Variant::Array<Variant::Foo>>`. The null
/// array gives an empty vec.
macro_rules! try_from_variant_to_array_impl {
    ($rtype: ident, $vtype: ident) => {
        impl TryFrom<&Variant> for Vec<$rtype> {
            type Error = ();

            fn try_from(value: &Variant) -> Result<Self, Self::Error> {
                match value {
                    Variant::Array(ref array) if array.value_type == VariantTypeId::$vtype => array
                        .values()
                        .iter()
                        .map(|v| match v {
                            Variant::$vtype(v) => Ok(*v),
                            _ => Err(()),
                        })
                        .collect(),
                    _ => Err(()),
                }
            }
        }
    };
}

try_from_variant_to_array_impl!(bool, Boolean);
try_from_variant_to_array_impl!(i8, SByte);
try_from_variant_to_array_impl!(u8, Byte);
try_from_variant_to_array_impl!(i16, Int16);
try_from_variant_to_array_impl!(u16, UInt16);
try_from_variant_to_array_impl!(i32, Int32);
try_from_variant_to_array_impl!(u32, UInt32);
try_from_variant_to_array_impl!(i64, Int64);
try_from_variant_to_array_impl!(u64, UInt64);
try_from_variant_to_array_impl!(f32, Float);
try_from_variant_to_array_impl!(f64, Double);

impl BinaryEncoder<Variant> for Variant {
    fn byte_len(&self) -> usize {
        // Encoding mask
        let mut size: usize = 1;

        // Value itself
        size += match self {
            Variant::Array(array) => {
                // Array length
                let mut size = 4;
                // Size of each value
                size += array
                    .values()
                    .iter()
                    .map(Variant::byte_len_variant_value)
                    .sum::<usize>();
                if let Some(ref dimensions) = array.dimensions {
                    size += byte_len_dimensions(dimensions);
                }
                size
            }
            value => Variant::byte_len_variant_value(value),
        };
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        let mut size: usize = 0;

        if let Variant::Variant(_) = self {
            error!("A variant cannot hold a variant other than as an array element");
            return Err(StatusCode::BadEncodingError);
        }

        // Encoding mask will include the array bits if applicable for the type
        let encoding_mask = self.encoding_mask();
        size += write_u8(stream, encoding_mask)?;

        size += match self {
            Variant::Array(array) => {
                if !array.is_valid() {
                    error!("Array of type {:?} is not valid", array.value_type);
                    return Err(StatusCode::BadEncodingError);
                }
                match array.values {
                    None => write_i32(stream, -1)?,
                    Some(ref values) => {
                        let mut size = write_array_length(stream, values.len())?;
                        for value in values.iter() {
                            size += Variant::encode_variant_value(stream, value)?;
                        }
                        if let Some(ref dimensions) = array.dimensions {
                            // Note array dimensions are encoded as Int32 even though they are presented
                            // as UInt32 through attribute.
                            size += write_dimensions(stream, dimensions)?;
                        }
                        size
                    }
                }
            }
            value => Variant::encode_variant_value(stream, value)?,
        };
        Ok(size)
    }

    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        // Variants nest through arrays of variants, extension objects and data values
        let _depth_lock = decoding_options.depth_lock()?;

        let encoding_mask = u8::decode(stream, decoding_options)?;
        let value_type_id = VariantTypeId::from_encoding_mask(encoding_mask)?;
        let has_values = encoding_mask & EncodingMask::ARRAY_VALUES_BIT != 0;
        let has_dimensions = encoding_mask & EncodingMask::ARRAY_DIMENSIONS_BIT != 0;

        if !has_values {
            if has_dimensions {
                error!("Array dimensions bit specified without any values");
                Err(StatusCode::BadDecodingError)
            } else if value_type_id == VariantTypeId::Variant {
                error!("Variant contains a scalar variant");
                Err(StatusCode::BadDecodingError)
            } else {
                // Read a single variant
                Variant::decode_variant_value(stream, value_type_id, decoding_options)
            }
        } else if value_type_id == VariantTypeId::Empty {
            error!("Array has no element type");
            Err(StatusCode::BadDecodingError)
        } else {
            // Array length in total cannot exceed max array length
            let values = match read_array_length(stream, decoding_options)? {
                // null array of type
                None => {
                    if has_dimensions {
                        error!("Null array cannot have dimensions");
                        return Err(StatusCode::BadDecodingError);
                    }
                    return Ok(Variant::from(Array::null(value_type_id)));
                }
                Some(array_length) => {
                    let mut values: Vec<Variant> = Vec::with_capacity(array_length);
                    for _ in 0..array_length {
                        values.push(Variant::decode_variant_value(
                            stream,
                            value_type_id,
                            decoding_options,
                        )?);
                    }
                    values
                }
            };
            let dimensions = if has_dimensions {
                let dimensions = read_dimensions(stream, decoding_options)?;
                match dimensions_product(&dimensions) {
                    Some(len) if len == values.len() => Some(dimensions),
                    Some(len) => {
                        error!(
                            "Array dimensions describe {} values but array length is {}",
                            len,
                            values.len()
                        );
                        return Err(StatusCode::BadDecodingError);
                    }
                    None => {
                        error!("Array dimension overflow!");
                        return Err(StatusCode::BadDecodingError);
                    }
                }
            } else {
                None
            };
            Ok(Variant::from(Array {
                value_type: value_type_id,
                values: Some(values),
                dimensions,
            }))
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Empty
    }
}

/// This implementation is mainly for debugging / convenience purposes, to eliminate some of the
/// noise in common types from using the Debug trait.
impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Variant::SByte(v) => write!(f, "{}", v),
            Variant::Byte(v) => write!(f, "{}", v),
            Variant::Int16(v) => write!(f, "{}", v),
            Variant::UInt16(v) => write!(f, "{}", v),
            Variant::Int32(v) => write!(f, "{}", v),
            Variant::UInt32(v) => write!(f, "{}", v),
            Variant::Int64(v) => write!(f, "{}", v),
            Variant::UInt64(v) => write!(f, "{}", v),
            Variant::Float(v) => write!(f, "{}", v),
            Variant::Double(v) => write!(f, "{}", v),
            Variant::Boolean(v) => write!(f, "{}", v),
            Variant::String(ref v) => write!(f, "{}", v),
            Variant::Guid(ref v) => write!(f, "{}", v),
            Variant::DateTime(ref v) => write!(f, "{}", v),
            Variant::NodeId(ref v) => write!(f, "{}", v),
            Variant::ExpandedNodeId(ref v) => write!(f, "{}", v),
            Variant::Variant(ref v) => write!(f, "Variant({})", v),
            value => write!(f, "{:?}", value),
        }
    }
}

impl Variant {
    /// Returns the length of just the value, not the encoding flag
    pub(crate) fn byte_len_variant_value(value: &Variant) -> usize {
        match value {
            Variant::Empty => 0,
            Variant::Boolean(value) => value.byte_len(),
            Variant::SByte(value) => value.byte_len(),
            Variant::Byte(value) => value.byte_len(),
            Variant::Int16(value) => value.byte_len(),
            Variant::UInt16(value) => value.byte_len(),
            Variant::Int32(value) => value.byte_len(),
            Variant::UInt32(value) => value.byte_len(),
            Variant::Int64(value) => value.byte_len(),
            Variant::UInt64(value) => value.byte_len(),
            Variant::Float(value) => value.byte_len(),
            Variant::Double(value) => value.byte_len(),
            Variant::String(value) => value.byte_len(),
            Variant::DateTime(value) => value.byte_len(),
            Variant::Guid(value) => value.byte_len(),
            Variant::ByteString(value) => value.byte_len(),
            Variant::XmlElement(value) => value.byte_len(),
            Variant::NodeId(value) => value.byte_len(),
            Variant::ExpandedNodeId(value) => value.byte_len(),
            Variant::StatusCode(value) => value.byte_len(),
            Variant::QualifiedName(value) => value.byte_len(),
            Variant::LocalizedText(value) => value.byte_len(),
            Variant::ExtensionObject(value) => value.byte_len(),
            Variant::Variant(value) => value.byte_len(),
            Variant::DataValue(value) => value.byte_len(),
            Variant::DiagnosticInfo(value) => value.byte_len(),
            Variant::Array(_) => {
                error!("Cannot compute length of this type (probably nested array)");
                0
            }
        }
    }

    /// Encodes just the value, not the encoding flag
    pub(crate) fn encode_variant_value<S: Write + ?Sized>(
        stream: &mut S,
        value: &Variant,
    ) -> EncodingResult<usize> {
        match value {
            Variant::Empty => Ok(0),
            Variant::Boolean(value) => value.encode(stream),
            Variant::SByte(value) => value.encode(stream),
            Variant::Byte(value) => value.encode(stream),
            Variant::Int16(value) => value.encode(stream),
            Variant::UInt16(value) => value.encode(stream),
            Variant::Int32(value) => value.encode(stream),
            Variant::UInt32(value) => value.encode(stream),
            Variant::Int64(value) => value.encode(stream),
            Variant::UInt64(value) => value.encode(stream),
            Variant::Float(value) => value.encode(stream),
            Variant::Double(value) => value.encode(stream),
            Variant::String(value) => value.encode(stream),
            Variant::DateTime(value) => value.encode(stream),
            Variant::Guid(value) => value.encode(stream),
            Variant::ByteString(value) => value.encode(stream),
            Variant::XmlElement(value) => value.encode(stream),
            Variant::NodeId(value) => value.encode(stream),
            Variant::ExpandedNodeId(value) => value.encode(stream),
            Variant::StatusCode(value) => value.encode(stream),
            Variant::QualifiedName(value) => value.encode(stream),
            Variant::LocalizedText(value) => value.encode(stream),
            Variant::ExtensionObject(value) => value.encode(stream),
            Variant::Variant(value) => value.encode(stream),
            Variant::DataValue(value) => value.encode(stream),
            Variant::DiagnosticInfo(value) => value.encode(stream),
            Variant::Array(_) => {
                warn!("Cannot encode this variant value type (probably nested array)");
                Err(StatusCode::BadEncodingError)
            }
        }
    }

    /// Reads just the variant value from the stream
    pub(crate) fn decode_variant_value<S: Read + ?Sized>(
        stream: &mut S,
        value_type_id: VariantTypeId,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let result = match value_type_id {
            VariantTypeId::Empty => Variant::Empty,
            VariantTypeId::Boolean => Self::from(bool::decode(stream, decoding_options)?),
            VariantTypeId::SByte => Self::from(i8::decode(stream, decoding_options)?),
            VariantTypeId::Byte => Self::from(u8::decode(stream, decoding_options)?),
            VariantTypeId::Int16 => Self::from(i16::decode(stream, decoding_options)?),
            VariantTypeId::UInt16 => Self::from(u16::decode(stream, decoding_options)?),
            VariantTypeId::Int32 => Self::from(i32::decode(stream, decoding_options)?),
            VariantTypeId::UInt32 => Self::from(u32::decode(stream, decoding_options)?),
            VariantTypeId::Int64 => Self::from(i64::decode(stream, decoding_options)?),
            VariantTypeId::UInt64 => Self::from(u64::decode(stream, decoding_options)?),
            VariantTypeId::Float => Self::from(f32::decode(stream, decoding_options)?),
            VariantTypeId::Double => Self::from(f64::decode(stream, decoding_options)?),
            VariantTypeId::String => Self::from(UAString::decode(stream, decoding_options)?),
            VariantTypeId::DateTime => Self::from(DateTime::decode(stream, decoding_options)?),
            VariantTypeId::Guid => Self::from(Guid::decode(stream, decoding_options)?),
            VariantTypeId::ByteString => {
                Self::from(ByteString::decode(stream, decoding_options)?)
            }
            // Force the type to be XmlElement since its typedef'd to UAString
            VariantTypeId::XmlElement => {
                Variant::XmlElement(XmlElement::decode(stream, decoding_options)?)
            }
            VariantTypeId::NodeId => Self::from(NodeId::decode(stream, decoding_options)?),
            VariantTypeId::ExpandedNodeId => {
                Self::from(ExpandedNodeId::decode(stream, decoding_options)?)
            }
            VariantTypeId::StatusCode => {
                Self::from(StatusCode::decode(stream, decoding_options)?)
            }
            VariantTypeId::QualifiedName => {
                Self::from(QualifiedName::decode(stream, decoding_options)?)
            }
            VariantTypeId::LocalizedText => {
                Self::from(LocalizedText::decode(stream, decoding_options)?)
            }
            // Extension object internally does depth checking to prevent deep recursion
            VariantTypeId::ExtensionObject => {
                Self::from(ExtensionObject::decode(stream, decoding_options)?)
            }
            // Nested variant is depth checked by its own decode
            VariantTypeId::Variant => {
                Variant::Variant(Box::new(Variant::decode(stream, decoding_options)?))
            }
            VariantTypeId::DataValue => Self::from(DataValue::decode(stream, decoding_options)?),
            VariantTypeId::DiagnosticInfo => {
                Self::from(DiagnosticInfo::decode(stream, decoding_options)?)
            }
        };
        Ok(result)
    }

    /// Returns the type of the value, or of the elements for an array
    pub fn type_id(&self) -> VariantTypeId {
        match self {
            Variant::Empty => VariantTypeId::Empty,
            Variant::Boolean(_) => VariantTypeId::Boolean,
            Variant::SByte(_) => VariantTypeId::SByte,
            Variant::Byte(_) => VariantTypeId::Byte,
            Variant::Int16(_) => VariantTypeId::Int16,
            Variant::UInt16(_) => VariantTypeId::UInt16,
            Variant::Int32(_) => VariantTypeId::Int32,
            Variant::UInt32(_) => VariantTypeId::UInt32,
            Variant::Int64(_) => VariantTypeId::Int64,
            Variant::UInt64(_) => VariantTypeId::UInt64,
            Variant::Float(_) => VariantTypeId::Float,
            Variant::Double(_) => VariantTypeId::Double,
            Variant::String(_) => VariantTypeId::String,
            Variant::DateTime(_) => VariantTypeId::DateTime,
            Variant::Guid(_) => VariantTypeId::Guid,
            Variant::ByteString(_) => VariantTypeId::ByteString,
            Variant::XmlElement(_) => VariantTypeId::XmlElement,
            Variant::StatusCode(_) => VariantTypeId::StatusCode,
            Variant::QualifiedName(_) => VariantTypeId::QualifiedName,
            Variant::LocalizedText(_) => VariantTypeId::LocalizedText,
            Variant::NodeId(_) => VariantTypeId::NodeId,
            Variant::ExpandedNodeId(_) => VariantTypeId::ExpandedNodeId,
            Variant::ExtensionObject(_) => VariantTypeId::ExtensionObject,
            Variant::Variant(_) => VariantTypeId::Variant,
            Variant::DataValue(_) => VariantTypeId::DataValue,
            Variant::DiagnosticInfo(_) => VariantTypeId::DiagnosticInfo,
            Variant::Array(array) => array.value_type,
        }
    }

    /// Returns the encoding mask, i.e. the type id plus the array bits
    pub fn encoding_mask(&self) -> u8 {
        match self {
            Variant::Array(array) => array.encoding_mask(),
            value => value.type_id().encoding_mask(),
        }
    }

    /// Tests and returns true if the variant holds a numeric type
    pub fn is_numeric(&self) -> bool {
        !self.is_array() && self.type_id().is_numeric()
    }

    /// Test if the variant holds an array
    pub fn is_array(&self) -> bool {
        matches!(self, Variant::Array(_))
    }

    /// Tests that the variant is in a valid state. In particular for arrays ensuring that the
    /// values are all acceptable and for a multi dimensional array that the dimensions equal
    /// the actual values.
    pub fn is_valid(&self) -> bool {
        match self {
            Variant::Array(array) => array.is_valid(),
            _ => true,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Variant::Array(array) => Some(array),
            _ => None,
        }
    }

    /// The null or zero value of a type. Used where a text encoding omits a value.
    pub fn null_of(type_id: VariantTypeId) -> Variant {
        match type_id {
            VariantTypeId::Empty => Variant::Empty,
            VariantTypeId::Boolean => Variant::Boolean(false),
            VariantTypeId::SByte => Variant::SByte(0),
            VariantTypeId::Byte => Variant::Byte(0),
            VariantTypeId::Int16 => Variant::Int16(0),
            VariantTypeId::UInt16 => Variant::UInt16(0),
            VariantTypeId::Int32 => Variant::Int32(0),
            VariantTypeId::UInt32 => Variant::UInt32(0),
            VariantTypeId::Int64 => Variant::Int64(0),
            VariantTypeId::UInt64 => Variant::UInt64(0),
            VariantTypeId::Float => Variant::Float(0.0),
            VariantTypeId::Double => Variant::Double(0.0),
            VariantTypeId::String => Variant::String(UAString::null()),
            VariantTypeId::DateTime => Variant::from(DateTime::null()),
            VariantTypeId::Guid => Variant::from(Guid::null()),
            VariantTypeId::StatusCode => Variant::StatusCode(StatusCode::Good),
            VariantTypeId::ByteString => Variant::ByteString(ByteString::null()),
            VariantTypeId::XmlElement => Variant::XmlElement(XmlElement::null()),
            VariantTypeId::QualifiedName => Variant::from(QualifiedName::null()),
            VariantTypeId::LocalizedText => Variant::from(LocalizedText::null()),
            VariantTypeId::NodeId => Variant::from(NodeId::null()),
            VariantTypeId::ExpandedNodeId => Variant::from(ExpandedNodeId::null()),
            VariantTypeId::ExtensionObject => Variant::from(ExtensionObject::null()),
            VariantTypeId::DataValue => Variant::from(DataValue::null()),
            VariantTypeId::Variant => Variant::Variant(Box::new(Variant::Empty)),
            VariantTypeId::DiagnosticInfo => Variant::from(DiagnosticInfo::null()),
        }
    }

    /// Returns the node id of the data type held by the variant
    pub fn data_type_id(&self) -> NodeId {
        self.data_type_id_in(&TypeRegistry::global())
    }

    /// Returns the node id of the data type held by the variant, finding the type of a raw
    /// extension object in the supplied registry
    pub fn data_type_id_in(&self, registry: &TypeRegistry) -> NodeId {
        match self {
            Variant::ExtensionObject(eo) => eo.data_type_id_in(registry).unwrap_or_else(|| {
                // Structure
                NodeId::ns0(22)
            }),
            value => value.type_id().data_type_id(),
        }
    }
}
