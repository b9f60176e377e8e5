// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! The reversible JSON encoding described in OPC UA Part 6 section 5.4.
//!
//! Values are built as `serde_json::Value` trees. 64-bit integers are strings so they survive
//! readers that hold numbers as doubles, and the float specials are the strings `"NaN"`,
//! `"Infinity"` and `"-Infinity"`.

use std::{str::FromStr, sync::Arc};

use serde_json::{json, Map, Number, Value};

use crate::types::{
    array::Array,
    byte_string::ByteString,
    constants,
    data_value::DataValue,
    date_time::DateTime,
    diagnostic_info::{check_chain_depth, DiagnosticInfo},
    encoding::*,
    expanded_node_id::ExpandedNodeId,
    extension_object::{ExtensionObject, ExtensionObjectEncoding},
    guid::Guid,
    localized_text::LocalizedText,
    node_id::{Identifier, NodeId},
    qualified_name::QualifiedName,
    status_codes::StatusCode,
    string::{UAString, XmlElement},
    structure::{DynamicStructure, FieldType, StructureDefinition, StructureField, StructureType, ValueRank},
    type_registry::{DynEncodable, EncodingKind},
    variant::Variant,
    variant_type_id::VariantTypeId,
    xml,
};

/// Encodes a variant as `{"Type", "Body", "Dimensions"?}`
pub fn encode_json_variant(value: &Variant) -> EncodingResult<Value> {
    variant_to_json(value)
}

/// Decodes a variant. `null` and an object without a type are an empty variant.
pub fn decode_json_variant(value: &Value, decoding_options: &DecodingOptions) -> EncodingResult<Variant> {
    variant_from_json(value, decoding_options)
}

/// Encodes a structure body as an object keyed by field name
pub fn encode_json_structure(value: &dyn DynEncodable) -> EncodingResult<Value> {
    value.encode_json()
}

/// Decodes a structure body with the codec registered for the type. The type id may be the JSON
/// encoding id or the data type id.
pub fn decode_json_structure(
    value: &Value,
    type_id: &NodeId,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Box<dyn DynEncodable>> {
    let registry = &decoding_options.type_registry;
    let codec = registry
        .lookup(type_id, EncodingKind::Json)
        .or_else(|| registry.lookup_data_type(type_id))
        .ok_or_else(|| {
            error!("No codec is registered for {}", type_id);
            StatusCode::BadDataTypeIdUnknown
        })?;
    codec.decode_json(value, decoding_options)
}

/// Parses a JSON document
pub(crate) fn parse_document(bytes: &[u8]) -> EncodingResult<Value> {
    serde_json::from_slice(bytes).map_err(|err| {
        error!("Cannot parse JSON document, {}", err);
        StatusCode::BadDecodingError
    })
}

fn variant_to_json(value: &Variant) -> EncodingResult<Value> {
    match value {
        Variant::Empty => Ok(Value::Object(Map::new())),
        Variant::Variant(_) => {
            error!("A variant cannot hold a variant other than as an array element");
            Err(StatusCode::BadEncodingError)
        }
        Variant::Array(array) => {
            if !array.is_valid() {
                error!("Array of type {:?} is not valid", array.value_type);
                return Err(StatusCode::BadEncodingError);
            }
            let mut object = Map::new();
            object.insert("Type".into(), json!(array.value_type.type_id()));
            let body = match array.values {
                None => Value::Null,
                Some(ref values) => Value::Array(
                    values
                        .iter()
                        .map(scalar_to_json)
                        .collect::<EncodingResult<Vec<Value>>>()?,
                ),
            };
            object.insert("Body".into(), body);
            if let Some(ref dimensions) = array.dimensions {
                object.insert("Dimensions".into(), json!(dimensions));
            }
            Ok(Value::Object(object))
        }
        value => Ok(json!({
            "Type": value.type_id().type_id(),
            "Body": scalar_to_json(value)?,
        })),
    }
}

fn float_to_json(value: f64) -> Value {
    if value.is_nan() {
        json!("NaN")
    } else if value.is_infinite() && value < 0.0 {
        json!("-Infinity")
    } else if value.is_infinite() {
        json!("Infinity")
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn string_to_json(value: &UAString) -> Value {
    if value.is_null() {
        Value::Null
    } else {
        json!(value.as_ref())
    }
}

/// The body of a scalar value
fn scalar_to_json(value: &Variant) -> EncodingResult<Value> {
    let result = match value {
        Variant::Empty => Value::Null,
        Variant::Boolean(v) => json!(v),
        Variant::SByte(v) => json!(v),
        Variant::Byte(v) => json!(v),
        Variant::Int16(v) => json!(v),
        Variant::UInt16(v) => json!(v),
        Variant::Int32(v) => json!(v),
        Variant::UInt32(v) => json!(v),
        Variant::Int64(v) => json!(v.to_string()),
        Variant::UInt64(v) => json!(v.to_string()),
        Variant::Float(v) => float_to_json(*v as f64),
        Variant::Double(v) => float_to_json(*v),
        Variant::String(v) | Variant::XmlElement(v) => string_to_json(v),
        Variant::DateTime(v) => json!(v.to_rfc3339()),
        Variant::Guid(v) => json!(v.to_upper_string()),
        Variant::StatusCode(v) => json!(v.bits()),
        Variant::ByteString(v) => {
            if v.is_null() {
                Value::Null
            } else {
                json!(v.as_base64())
            }
        }
        Variant::QualifiedName(v) => {
            let mut object = Map::new();
            object.insert("Name".into(), string_to_json(&v.name));
            if v.namespace_index != 0 {
                object.insert("Uri".into(), json!(v.namespace_index));
            }
            Value::Object(object)
        }
        Variant::LocalizedText(v) => {
            let mut object = Map::new();
            if !v.locale.is_null() {
                object.insert("Locale".into(), json!(v.locale.as_ref()));
            }
            if !v.text.is_null() {
                object.insert("Text".into(), json!(v.text.as_ref()));
            }
            Value::Object(object)
        }
        Variant::NodeId(v) => Value::Object(node_id_to_json(v)),
        Variant::ExpandedNodeId(v) => expanded_node_id_to_json(v),
        Variant::ExtensionObject(v) => extension_object_to_json(v)?,
        Variant::DataValue(v) => data_value_to_json(v)?,
        Variant::Variant(v) => variant_to_json(v)?,
        Variant::DiagnosticInfo(v) => {
            check_chain_depth(v.depth(), constants::MAX_DECODING_DEPTH)?;
            diagnostic_info_to_json(v)
        }
        Variant::Array(_) => {
            error!("Nested arrays cannot be encoded");
            return Err(StatusCode::BadEncodingError);
        }
    };
    Ok(result)
}

fn node_id_to_json(value: &NodeId) -> Map<String, Value> {
    let mut object = Map::new();
    match value.identifier {
        Identifier::Numeric(id) => {
            object.insert("Id".into(), json!(id));
        }
        Identifier::String(ref id) => {
            object.insert("IdType".into(), json!(1));
            object.insert("Id".into(), string_to_json(id));
        }
        Identifier::Guid(ref id) => {
            object.insert("IdType".into(), json!(2));
            object.insert("Id".into(), json!(id.to_upper_string()));
        }
        Identifier::ByteString(ref id) => {
            object.insert("IdType".into(), json!(3));
            object.insert("Id".into(), json!(id.as_base64()));
        }
    }
    if value.namespace != 0 {
        object.insert("Namespace".into(), json!(value.namespace));
    }
    object
}

fn expanded_node_id_to_json(value: &ExpandedNodeId) -> Value {
    let mut object = node_id_to_json(&value.node_id);
    if !value.namespace_uri.is_null() {
        object.insert("Namespace".into(), json!(value.namespace_uri.as_ref()));
    }
    if value.server_index != 0 {
        object.insert("ServerUri".into(), json!(value.server_index));
    }
    Value::Object(object)
}

fn extension_object_to_json(value: &ExtensionObject) -> EncodingResult<Value> {
    let mut object = Map::new();
    match value.body {
        ExtensionObjectEncoding::None => {
            object.insert("TypeId".into(), Value::Object(node_id_to_json(&value.node_id)));
        }
        ExtensionObjectEncoding::ByteString(ref body) => {
            object.insert("TypeId".into(), Value::Object(node_id_to_json(&value.node_id)));
            object.insert("Encoding".into(), json!(1));
            object.insert("Body".into(), json!(body.as_base64()));
        }
        ExtensionObjectEncoding::XmlElement(ref body) => {
            object.insert("TypeId".into(), Value::Object(node_id_to_json(&value.node_id)));
            object.insert("Encoding".into(), json!(2));
            object.insert("Body".into(), string_to_json(body));
        }
        ExtensionObjectEncoding::Json(ref body) => {
            object.insert("TypeId".into(), Value::Object(node_id_to_json(&value.node_id)));
            object.insert("Body".into(), body.clone());
        }
        ExtensionObjectEncoding::Decoded(ref body) => {
            let type_id = body
                .encoding_id(EncodingKind::Json)
                .unwrap_or_else(|| value.node_id.clone());
            object.insert("TypeId".into(), Value::Object(node_id_to_json(&type_id)));
            object.insert("Body".into(), body.encode_json()?);
        }
    }
    Ok(Value::Object(object))
}

fn data_value_to_json(value: &DataValue) -> EncodingResult<Value> {
    let mut object = Map::new();
    if let Some(ref v) = value.value {
        object.insert("Value".into(), variant_to_json(v)?);
    }
    if let Some(ref status) = value.status {
        object.insert("Status".into(), json!(status.bits()));
    }
    if let Some(ref source_timestamp) = value.source_timestamp {
        object.insert("SourceTimestamp".into(), json!(source_timestamp.to_rfc3339()));
        if let Some(source_picoseconds) = value.source_picoseconds {
            object.insert("SourcePicoseconds".into(), json!(source_picoseconds));
        }
    }
    if let Some(ref server_timestamp) = value.server_timestamp {
        object.insert("ServerTimestamp".into(), json!(server_timestamp.to_rfc3339()));
        if let Some(server_picoseconds) = value.server_picoseconds {
            object.insert("ServerPicoseconds".into(), json!(server_picoseconds));
        }
    }
    Ok(Value::Object(object))
}

fn diagnostic_info_to_json(value: &DiagnosticInfo) -> Value {
    let mut object = Map::new();
    if let Some(symbolic_id) = value.symbolic_id {
        object.insert("SymbolicId".into(), json!(symbolic_id));
    }
    if let Some(namespace_uri) = value.namespace_uri {
        object.insert("NamespaceUri".into(), json!(namespace_uri));
    }
    if let Some(locale) = value.locale {
        object.insert("Locale".into(), json!(locale));
    }
    if let Some(localized_text) = value.localized_text {
        object.insert("LocalizedText".into(), json!(localized_text));
    }
    if let Some(ref additional_info) = value.additional_info {
        object.insert("AdditionalInfo".into(), string_to_json(additional_info));
    }
    if let Some(ref inner_status_code) = value.inner_status_code {
        object.insert("InnerStatusCode".into(), json!(inner_status_code.bits()));
    }
    if let Some(ref inner_diagnostic_info) = value.inner_diagnostic_info {
        object.insert(
            "InnerDiagnosticInfo".into(),
            diagnostic_info_to_json(inner_diagnostic_info),
        );
    }
    Value::Object(object)
}

/// Encodes a structure as an object keyed by field name. Absent optional fields and null values
/// are left out, and a union adds its `SwitchField`.
pub fn structure_to_json(value: &DynamicStructure) -> EncodingResult<Value> {
    let definition = value.definition();
    let mut object = Map::new();
    if definition.structure_type == StructureType::Union {
        object.insert("SwitchField".into(), json!(value.switch()));
    }
    for (field, v) in value.present_fields() {
        let field_value = field_to_json(field, v).map_err(|err| {
            error!("Cannot encode field {}.{}", definition.name, field.name);
            err
        })?;
        if !field_value.is_null() {
            object.insert(field.name.clone(), field_value);
        }
    }
    Ok(Value::Object(object))
}

fn field_to_json(field: &StructureField, value: &Variant) -> EncodingResult<Value> {
    if !field.accepts(value) {
        error!("Value {:?} does not match the type of field {}", value, field.name);
        return Err(StatusCode::BadEncodingError);
    }
    match (field.value_rank, value) {
        (ValueRank::Scalar, value) => field_scalar_to_json(&field.field_type, value),
        (ValueRank::OneDimension, Variant::Array(array)) => match array.values {
            None => Ok(Value::Null),
            Some(ref values) => Ok(Value::Array(
                values
                    .iter()
                    .map(|v| field_scalar_to_json(&field.field_type, v))
                    .collect::<EncodingResult<Vec<Value>>>()?,
            )),
        },
        (ValueRank::Dimensions(_), Variant::Array(array)) => match array.dimensions {
            None => Ok(Value::Null),
            Some(ref dimensions) => {
                let elements = array
                    .values()
                    .iter()
                    .map(|v| field_scalar_to_json(&field.field_type, v))
                    .collect::<EncodingResult<Vec<Value>>>()?;
                Ok(json!({
                    "Dimensions": dimensions,
                    "Elements": elements,
                }))
            }
        },
        _ => Err(StatusCode::BadEncodingError),
    }
}

fn field_scalar_to_json(field_type: &FieldType, value: &Variant) -> EncodingResult<Value> {
    match (field_type, value) {
        (FieldType::Structure(_), Variant::ExtensionObject(eo)) => match eo.body {
            ExtensionObjectEncoding::Decoded(ref body) => body.encode_json(),
            _ => {
                error!("Structure field holds an extension object that has not been decoded");
                Err(StatusCode::BadEncodingError)
            }
        },
        (_, value) => scalar_to_json(value),
    }
}

fn malformed(what: &str, value: &Value) -> StatusCode {
    error!("Invalid {} {}", what, value);
    StatusCode::BadDecodingError
}

fn json_integer<T: TryFrom<i64>>(value: &Value) -> EncodingResult<T> {
    value
        .as_i64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| malformed("integer", value))
}

fn json_float(value: &Value) -> EncodingResult<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| malformed("float", value)),
        Value::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => Err(malformed("float", value)),
        },
        _ => Err(malformed("float", value)),
    }
}

/// 64-bit integers are strings but plain numbers are accepted too
fn json_int64<T: FromStr>(value: &Value) -> EncodingResult<T> {
    match value {
        Value::String(s) => s.parse::<T>().map_err(|_| malformed("integer", value)),
        Value::Number(n) => n.to_string().parse::<T>().map_err(|_| malformed("integer", value)),
        _ => Err(malformed("integer", value)),
    }
}

fn json_str<'a>(value: &'a Value, what: &str) -> EncodingResult<&'a str> {
    value.as_str().ok_or_else(|| malformed(what, value))
}

fn json_string(value: &Value, decoding_options: &DecodingOptions) -> EncodingResult<UAString> {
    match value {
        Value::Null => Ok(UAString::null()),
        Value::String(s) => {
            if s.len() > decoding_options.max_string_length {
                error!(
                    "String length {} exceeds decoding limit {}",
                    s.len(),
                    decoding_options.max_string_length
                );
                Err(StatusCode::BadEncodingLimitsExceeded)
            } else {
                Ok(UAString::from(s.as_str()))
            }
        }
        _ => Err(malformed("string", value)),
    }
}

fn json_object<'a>(value: &'a Value, what: &str) -> EncodingResult<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| malformed(what, value))
}

/// A member that is missing or `null` is absent
fn member<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.get(name).filter(|v| !v.is_null())
}

fn check_array_length(len: usize, decoding_options: &DecodingOptions) -> EncodingResult<()> {
    if len > decoding_options.max_array_length {
        error!(
            "Array length {} exceeds decoding limit {}",
            len, decoding_options.max_array_length
        );
        Err(StatusCode::BadEncodingLimitsExceeded)
    } else {
        Ok(())
    }
}

fn json_dimensions(value: &Value, decoding_options: &DecodingOptions) -> EncodingResult<Vec<u32>> {
    let dimensions = value.as_array().ok_or_else(|| malformed("dimensions", value))?;
    check_array_length(dimensions.len(), decoding_options)?;
    if dimensions.is_empty() {
        return Err(malformed("dimensions", value));
    }
    dimensions
        .iter()
        .map(|d| match json_integer::<i32>(d)? {
            d if d > 0 => Ok(d as u32),
            _ => Err(malformed("array dimension", d)),
        })
        .collect()
}

fn variant_from_json(value: &Value, decoding_options: &DecodingOptions) -> EncodingResult<Variant> {
    let _depth_lock = decoding_options.depth_lock()?;
    if value.is_null() {
        return Ok(Variant::Empty);
    }
    let object = json_object(value, "variant")?;
    let Some(type_id) = member(object, "Type") else {
        return Ok(Variant::Empty);
    };
    let value_type = VariantTypeId::from_type_id(json_integer::<u8>(type_id)?).map_err(|_| {
        error!("Unrecognized variant type {}", type_id);
        StatusCode::BadDecodingError
    })?;
    let body = object.get("Body").unwrap_or(&Value::Null);
    let dimensions = member(object, "Dimensions")
        .map(|d| json_dimensions(d, decoding_options))
        .transpose()?;
    match body {
        Value::Array(elements) => {
            if value_type == VariantTypeId::Empty {
                error!("Array has no element type");
                return Err(StatusCode::BadDecodingError);
            }
            check_array_length(elements.len(), decoding_options)?;
            let values = elements
                .iter()
                .map(|e| scalar_from_json(e, value_type, decoding_options))
                .collect::<EncodingResult<Vec<Variant>>>()?;
            if let Some(ref dimensions) = dimensions {
                if !Array::dimensions_match(dimensions, values.len()) {
                    error!(
                        "Array dimensions {:?} do not match the {} elements",
                        dimensions,
                        values.len()
                    );
                    return Err(StatusCode::BadDecodingError);
                }
            }
            Ok(Variant::from(Array {
                value_type,
                values: Some(values),
                dimensions,
            }))
        }
        _ if dimensions.is_some() => {
            error!("Variant has dimensions but no array");
            Err(StatusCode::BadDecodingError)
        }
        Value::Null => Ok(match value_type {
            // A null body of a type that has no null scalar is an absent array
            VariantTypeId::String | VariantTypeId::ByteString | VariantTypeId::XmlElement => {
                scalar_from_json(body, value_type, decoding_options)?
            }
            VariantTypeId::Empty => Variant::Empty,
            value_type => Variant::from(Array::null(value_type)),
        }),
        body => {
            if value_type == VariantTypeId::Variant {
                error!("Variant contains a scalar variant");
                return Err(StatusCode::BadDecodingError);
            }
            scalar_from_json(body, value_type, decoding_options)
        }
    }
}

fn scalar_from_json(
    value: &Value,
    value_type: VariantTypeId,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    let result = match value_type {
        VariantTypeId::Empty => Variant::Empty,
        VariantTypeId::Boolean => {
            Variant::Boolean(value.as_bool().ok_or_else(|| malformed("boolean", value))?)
        }
        VariantTypeId::SByte => Variant::SByte(json_integer(value)?),
        VariantTypeId::Byte => Variant::Byte(json_integer(value)?),
        VariantTypeId::Int16 => Variant::Int16(json_integer(value)?),
        VariantTypeId::UInt16 => Variant::UInt16(json_integer(value)?),
        VariantTypeId::Int32 => Variant::Int32(json_integer(value)?),
        VariantTypeId::UInt32 => Variant::UInt32(json_integer(value)?),
        VariantTypeId::Int64 => Variant::Int64(json_int64(value)?),
        VariantTypeId::UInt64 => Variant::UInt64(json_int64(value)?),
        VariantTypeId::Float => Variant::Float(json_float(value)? as f32),
        VariantTypeId::Double => Variant::Double(json_float(value)?),
        VariantTypeId::String => Variant::String(json_string(value, decoding_options)?),
        VariantTypeId::XmlElement => {
            Variant::XmlElement(XmlElement::from(json_string(value, decoding_options)?))
        }
        VariantTypeId::DateTime => {
            let text = json_str(value, "date time")?;
            Variant::from(DateTime::from_str(text).map_err(|_| malformed("date time", value))?)
        }
        VariantTypeId::Guid => {
            let text = json_str(value, "guid")?;
            Variant::from(Guid::from_str(text).map_err(|_| malformed("guid", value))?)
        }
        VariantTypeId::StatusCode => {
            Variant::StatusCode(StatusCode::from_bits_truncate(json_integer(value)?))
        }
        VariantTypeId::ByteString => Variant::ByteString(json_byte_string(value, decoding_options)?),
        VariantTypeId::QualifiedName => {
            let object = json_object(value, "qualified name")?;
            let name = json_string(object.get("Name").unwrap_or(&Value::Null), decoding_options)?;
            let namespace_index = member(object, "Uri").map(json_integer).transpose()?.unwrap_or(0);
            Variant::from(QualifiedName {
                namespace_index,
                name,
            })
        }
        VariantTypeId::LocalizedText => {
            let object = json_object(value, "localized text")?;
            let locale = json_string(object.get("Locale").unwrap_or(&Value::Null), decoding_options)?;
            let text = json_string(object.get("Text").unwrap_or(&Value::Null), decoding_options)?;
            Variant::from(LocalizedText { locale, text })
        }
        VariantTypeId::NodeId => Variant::from(node_id_from_json(value, decoding_options)?),
        VariantTypeId::ExpandedNodeId => {
            Variant::from(expanded_node_id_from_json(value, decoding_options)?)
        }
        VariantTypeId::ExtensionObject => {
            Variant::from(extension_object_from_json(value, decoding_options)?)
        }
        VariantTypeId::DataValue => Variant::from(data_value_from_json(value, decoding_options)?),
        VariantTypeId::Variant => Variant::Variant(Box::new(variant_from_json(value, decoding_options)?)),
        VariantTypeId::DiagnosticInfo => {
            Variant::from(diagnostic_info_from_json(value, decoding_options, 1)?)
        }
    };
    Ok(result)
}

fn json_byte_string(value: &Value, decoding_options: &DecodingOptions) -> EncodingResult<ByteString> {
    match value {
        Value::Null => Ok(ByteString::null()),
        Value::String(s) => xml::read_byte_string(s, decoding_options),
        _ => Err(malformed("byte string", value)),
    }
}

fn node_id_from_json(value: &Value, decoding_options: &DecodingOptions) -> EncodingResult<NodeId> {
    let object = json_object(value, "node id")?;
    let namespace = member(object, "Namespace").map(json_integer).transpose()?.unwrap_or(0);
    let identifier = identifier_from_json(object, decoding_options)?;
    Ok(NodeId {
        namespace,
        identifier,
    })
}

fn identifier_from_json(
    object: &Map<String, Value>,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Identifier> {
    let id_type = member(object, "IdType").map(json_integer::<u8>).transpose()?.unwrap_or(0);
    let id = object.get("Id").unwrap_or(&Value::Null);
    let identifier = match id_type {
        0 => Identifier::Numeric(if id.is_null() { 0 } else { json_integer(id)? }),
        1 => Identifier::String(json_string(id, decoding_options)?),
        2 => Identifier::Guid(
            Guid::from_str(json_str(id, "guid")?).map_err(|_| malformed("guid", id))?,
        ),
        3 => Identifier::ByteString(json_byte_string(id, decoding_options)?),
        _ => {
            error!("Unrecognized node id type {}", id_type);
            return Err(StatusCode::BadDecodingError);
        }
    };
    Ok(identifier)
}

fn expanded_node_id_from_json(
    value: &Value,
    decoding_options: &DecodingOptions,
) -> EncodingResult<ExpandedNodeId> {
    let object = json_object(value, "expanded node id")?;
    let identifier = identifier_from_json(object, decoding_options)?;
    // The namespace is an index, or a URI when the node is in a namespace the reader may not know
    let (namespace, namespace_uri) = match member(object, "Namespace") {
        None => (0, UAString::null()),
        Some(Value::String(uri)) => (0, UAString::from(uri.as_str())),
        Some(index) => (json_integer(index)?, UAString::null()),
    };
    let server_index = member(object, "ServerUri").map(json_integer).transpose()?.unwrap_or(0);
    Ok(ExpandedNodeId {
        node_id: NodeId {
            namespace,
            identifier,
        },
        namespace_uri,
        server_index,
    })
}

fn extension_object_from_json(
    value: &Value,
    decoding_options: &DecodingOptions,
) -> EncodingResult<ExtensionObject> {
    let _depth_lock = decoding_options.depth_lock()?;
    let object = json_object(value, "extension object")?;
    let node_id = match member(object, "TypeId") {
        Some(type_id) => node_id_from_json(type_id, decoding_options)?,
        None => NodeId::null(),
    };
    let encoding = member(object, "Encoding").map(json_integer::<u8>).transpose()?.unwrap_or(0);
    let Some(body) = member(object, "Body") else {
        return Ok(ExtensionObject {
            node_id,
            body: ExtensionObjectEncoding::None,
        });
    };
    let body = match encoding {
        0 => {
            if decoding_options.decode_extension_objects {
                if let Some(codec) = decoding_options
                    .type_registry
                    .lookup(&node_id, EncodingKind::Json)
                {
                    match codec.decode_json(body, decoding_options) {
                        Ok(decoded) => return Ok(ExtensionObject::from_dyn(decoded)),
                        Err(status_code) => {
                            debug!(
                                "Extension object {} is kept undecoded, body failed with {}",
                                node_id, status_code
                            );
                            decoding_options.clear_failed_field();
                        }
                    }
                }
            }
            ExtensionObjectEncoding::Json(body.clone())
        }
        1 => ExtensionObjectEncoding::ByteString(json_byte_string(body, decoding_options)?),
        2 => ExtensionObjectEncoding::XmlElement(json_string(body, decoding_options)?),
        _ => {
            error!("Extension object {} has an invalid encoding {}", node_id, encoding);
            return Err(StatusCode::BadDecodingError);
        }
    };
    ExtensionObject { node_id, body }.eager_resolve(decoding_options)
}

fn date_time_member(object: &Map<String, Value>, name: &str) -> EncodingResult<Option<DateTime>> {
    member(object, name)
        .map(|v| {
            let text = json_str(v, "date time")?;
            DateTime::from_str(text).map_err(|_| malformed("date time", v))
        })
        .transpose()
}

fn data_value_from_json(value: &Value, decoding_options: &DecodingOptions) -> EncodingResult<DataValue> {
    let object = json_object(value, "data value")?;
    let value = member(object, "Value")
        .map(|v| variant_from_json(v, decoding_options))
        .transpose()?;
    let status = member(object, "Status")
        .map(|v| json_integer(v).map(StatusCode::from_bits_truncate))
        .transpose()?;
    let source_timestamp = date_time_member(object, "SourceTimestamp")?;
    let source_picoseconds: Option<i16> = member(object, "SourcePicoseconds").map(json_integer).transpose()?;
    let server_timestamp = date_time_member(object, "ServerTimestamp")?;
    let server_picoseconds: Option<i16> = member(object, "ServerPicoseconds").map(json_integer).transpose()?;
    Ok(DataValue {
        value,
        status,
        source_picoseconds: source_timestamp.as_ref().and(source_picoseconds),
        source_timestamp,
        server_picoseconds: server_timestamp.as_ref().and(server_picoseconds),
        server_timestamp,
    })
}

fn diagnostic_info_from_json(
    value: &Value,
    decoding_options: &DecodingOptions,
    level: usize,
) -> EncodingResult<DiagnosticInfo> {
    check_chain_depth(level, decoding_options.max_depth())?;
    let object = json_object(value, "diagnostic info")?;
    let additional_info = member(object, "AdditionalInfo")
        .map(|v| json_string(v, decoding_options))
        .transpose()?;
    let inner_diagnostic_info = member(object, "InnerDiagnosticInfo")
        .map(|v| diagnostic_info_from_json(v, decoding_options, level + 1).map(Box::new))
        .transpose()?;
    Ok(DiagnosticInfo {
        symbolic_id: member(object, "SymbolicId").map(json_integer).transpose()?,
        namespace_uri: member(object, "NamespaceUri").map(json_integer).transpose()?,
        locale: member(object, "Locale").map(json_integer).transpose()?,
        localized_text: member(object, "LocalizedText").map(json_integer).transpose()?,
        additional_info,
        inner_status_code: member(object, "InnerStatusCode")
            .map(|v| json_integer(v).map(StatusCode::from_bits_truncate))
            .transpose()?,
        inner_diagnostic_info,
    })
}

/// Decodes a structure from an object keyed by field name. An optional field is present when its
/// member is, and a mandatory field that is missing takes its default.
pub fn structure_from_json(
    definition: Arc<StructureDefinition>,
    value: &Value,
    decoding_options: &DecodingOptions,
) -> EncodingResult<DynamicStructure> {
    let _depth_lock = decoding_options.depth_lock()?;
    let object = json_object(value, "structure")?;
    let field_count = definition.fields.len();
    let mut values = Vec::with_capacity(field_count);
    let mut switch = 0;
    match definition.structure_type {
        StructureType::Structure | StructureType::StructureWithOptionalFields => {
            let has_optional_fields =
                definition.structure_type == StructureType::StructureWithOptionalFields;
            for field in &definition.fields {
                let value = match member(object, &field.name) {
                    None if field.is_optional && has_optional_fields => Variant::Empty,
                    v => read_field_or_default(v, field, decoding_options)?,
                };
                values.push(value);
            }
        }
        StructureType::Union => {
            switch = member(object, "SwitchField").map(json_integer::<u32>).transpose()?.unwrap_or(0);
            if switch as usize > field_count {
                error!("Union {} has no arm {}", definition.name, switch);
                return Err(StatusCode::BadDecodingError);
            }
            values.resize(field_count, Variant::Empty);
            if switch > 0 {
                let index = switch as usize - 1;
                let field = &definition.fields[index];
                values[index] =
                    read_field_or_default(member(object, &field.name), field, decoding_options)?;
            }
        }
    }
    Ok(DynamicStructure::from_decoded(definition, switch, values))
}

fn read_field_or_default(
    value: Option<&Value>,
    field: &StructureField,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    let result = match value {
        Some(value) => field_from_json(value, field, decoding_options),
        None => field.absent_value(),
    };
    result.map_err(|err| {
        decoding_options.record_failed_field(&field.name);
        err
    })
}

fn field_from_json(
    value: &Value,
    field: &StructureField,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    match field.value_rank {
        ValueRank::Scalar => field_scalar_from_json(value, &field.field_type, decoding_options),
        ValueRank::OneDimension => {
            let elements = value.as_array().ok_or_else(|| malformed("array", value))?;
            check_array_length(elements.len(), decoding_options)?;
            let values = elements
                .iter()
                .map(|e| field_scalar_from_json(e, &field.field_type, decoding_options))
                .collect::<EncodingResult<Vec<Variant>>>()?;
            Ok(Variant::from(Array {
                value_type: field.element_type(),
                values: Some(values),
                dimensions: None,
            }))
        }
        ValueRank::Dimensions(n) => {
            let object = json_object(value, "matrix")?;
            let dimensions = json_dimensions(
                object.get("Dimensions").unwrap_or(&Value::Null),
                decoding_options,
            )?;
            if dimensions.len() != n as usize {
                error!("Matrix field {} has dimensions {:?}", field.name, dimensions);
                return Err(StatusCode::BadDecodingError);
            }
            let elements = object
                .get("Elements")
                .and_then(Value::as_array)
                .ok_or_else(|| malformed("matrix", value))?;
            check_array_length(elements.len(), decoding_options)?;
            let values = elements
                .iter()
                .map(|e| field_scalar_from_json(e, &field.field_type, decoding_options))
                .collect::<EncodingResult<Vec<Variant>>>()?;
            if !Array::dimensions_match(&dimensions, values.len()) {
                error!(
                    "Matrix field {} dimensions {:?} do not match the {} elements",
                    field.name,
                    dimensions,
                    values.len()
                );
                return Err(StatusCode::BadDecodingError);
            }
            Ok(Variant::from(Array {
                value_type: field.element_type(),
                values: Some(values),
                dimensions: Some(dimensions),
            }))
        }
    }
}

fn field_scalar_from_json(
    value: &Value,
    field_type: &FieldType,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    match field_type {
        FieldType::Builtin(type_id) => scalar_from_json(value, *type_id, decoding_options),
        FieldType::Enumeration => Ok(Variant::Int32(json_integer(value)?)),
        FieldType::Structure(data_type_id) => {
            let codec = decoding_options
                .type_registry
                .lookup_data_type(data_type_id)
                .ok_or_else(|| {
                    error!("No codec is registered for structure {}", data_type_id);
                    StatusCode::BadDataTypeIdUnknown
                })?;
            let body = codec.decode_json(value, decoding_options)?;
            Ok(Variant::from(ExtensionObject::from_dyn(body)))
        }
        FieldType::Abstract => Ok(Variant::from(extension_object_from_json(
            value,
            decoding_options,
        )?)),
    }
}
