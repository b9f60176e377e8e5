// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! The XML encoding described in OPC UA Part 6 section 5.3.
//!
//! Values are written element per field with `XmlWriter` and read back by walking a `roxmltree`
//! document by local element name, so namespace prefixes in the input are ignored. Arrays are a
//! wrapper element with one child per element. An absent array omits the wrapper element and an
//! empty array writes it with no children.

use std::{str::FromStr, sync::Arc};

use roxmltree::{Document, Node};

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
    node_id::NodeId,
    qualified_name::QualifiedName,
    status_codes::StatusCode,
    string::{UAString, XmlElement},
    structure::{DynamicStructure, FieldType, StructureDefinition, StructureField, StructureType, ValueRank},
    type_registry::{DynEncodable, EncodingKind},
    variant::Variant,
    variant_type_id::VariantTypeId,
};

/// Namespace of the OPC UA XML schema
pub const OPC_UA_TYPES_NAMESPACE: &str = "http://opcfoundation.org/UA/2008/02/Types.xsd";

/// Writes an XML document one element at a time.
#[derive(Debug, Default)]
pub struct XmlWriter {
    buffer: String,
    open_elements: Vec<String>,
    namespace: Option<String>,
}

impl XmlWriter {
    pub fn new() -> XmlWriter {
        XmlWriter::default()
    }

    /// A writer that declares the namespace as the default namespace of the first element
    pub fn with_namespace(namespace: &str) -> XmlWriter {
        XmlWriter {
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }
    }

    pub fn start_element(&mut self, name: &str) {
        self.buffer.push('<');
        self.buffer.push_str(name);
        if let Some(namespace) = self.namespace.take() {
            self.buffer.push_str(" xmlns=\"");
            self.buffer.push_str(&escape(&namespace));
            self.buffer.push('"');
        }
        self.buffer.push('>');
        self.open_elements.push(name.to_string());
    }

    pub fn end_element(&mut self) -> EncodingResult<()> {
        let name = self.open_elements.pop().ok_or_else(|| {
            error!("XML end element written without a start element");
            StatusCode::BadEncodingError
        })?;
        self.buffer.push_str("</");
        self.buffer.push_str(&name);
        self.buffer.push('>');
        Ok(())
    }

    /// Writes escaped text into the current element
    pub fn text(&mut self, text: &str) {
        self.buffer.push_str(&escape(text));
    }

    /// Writes markup into the current element as is
    pub fn raw(&mut self, xml: &str) {
        self.buffer.push_str(xml);
    }

    /// Writes `<name>text</name>`
    pub fn text_element(&mut self, name: &str, text: &str) -> EncodingResult<()> {
        self.start_element(name);
        self.text(text);
        self.end_element()
    }

    /// Returns the document, which must have every element closed
    pub fn finish(self) -> EncodingResult<String> {
        if self.open_elements.is_empty() {
            Ok(self.buffer)
        } else {
            error!("XML document has unclosed elements {:?}", self.open_elements);
            Err(StatusCode::BadEncodingError)
        }
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Encodes a variant as a `<Variant>` document
pub fn encode_xml_variant(value: &Variant) -> EncodingResult<String> {
    let mut writer = XmlWriter::with_namespace(OPC_UA_TYPES_NAMESPACE);
    writer.start_element("Variant");
    write_variant_content(&mut writer, value)?;
    writer.end_element()?;
    writer.finish()
}

/// Decodes a variant from a document whose root element holds a `<Value>`
pub fn decode_xml_variant(xml: &str, decoding_options: &DecodingOptions) -> EncodingResult<Variant> {
    let document = parse_document(xml)?;
    read_variant_content(document.root_element(), decoding_options)
}

/// Encodes a structure body as a document whose root element is named after the type
pub fn encode_xml_structure(value: &dyn DynEncodable) -> EncodingResult<String> {
    let mut writer = XmlWriter::with_namespace(OPC_UA_TYPES_NAMESPACE);
    value.encode_xml(&mut writer)?;
    writer.finish()
}

/// Decodes a structure body with the codec registered for the type. The type id may be the XML
/// encoding id or the data type id.
pub fn decode_xml_structure(
    xml: &str,
    type_id: &NodeId,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Box<dyn DynEncodable>> {
    let registry = &decoding_options.type_registry;
    let codec = registry
        .lookup(type_id, EncodingKind::Xml)
        .or_else(|| registry.lookup_data_type(type_id))
        .ok_or_else(|| {
            error!("No codec is registered for {}", type_id);
            StatusCode::BadDataTypeIdUnknown
        })?;
    let document = parse_document(xml)?;
    codec.decode_xml(document.root_element(), decoding_options)
}

pub(crate) fn parse_document(xml: &str) -> EncodingResult<Document> {
    Document::parse(xml).map_err(|err| {
        error!("Cannot parse XML document, {}", err);
        StatusCode::BadDecodingError
    })
}

/// Writes the `<Value>` of a variant. An empty variant, or an absent array, writes nothing.
pub(crate) fn write_variant_content(writer: &mut XmlWriter, value: &Variant) -> EncodingResult<()> {
    match value {
        Variant::Empty => Ok(()),
        Variant::Variant(_) => {
            error!("A variant cannot hold a variant other than as an array element");
            Err(StatusCode::BadEncodingError)
        }
        Variant::Array(array) => {
            if !array.is_valid() {
                error!("Array of type {:?} is not valid", array.value_type);
                return Err(StatusCode::BadEncodingError);
            }
            let Some(ref values) = array.values else {
                return Ok(());
            };
            writer.start_element("Value");
            match array.dimensions {
                None => {
                    writer.start_element(&format!("ListOf{}", array.value_type.name()));
                    for value in values {
                        write_typed(writer, value)?;
                    }
                    writer.end_element()?;
                }
                Some(ref dimensions) => {
                    writer.start_element("Matrix");
                    writer.start_element("Dimensions");
                    for dimension in dimensions {
                        writer.text_element("Int32", &dimension.to_string())?;
                    }
                    writer.end_element()?;
                    writer.start_element("Elements");
                    for value in values {
                        write_typed(writer, value)?;
                    }
                    writer.end_element()?;
                    writer.end_element()?;
                }
            }
            writer.end_element()
        }
        value => {
            writer.start_element("Value");
            write_typed(writer, value)?;
            writer.end_element()
        }
    }
}

/// Writes `<TypeName>content</TypeName>` for a scalar
fn write_typed(writer: &mut XmlWriter, value: &Variant) -> EncodingResult<()> {
    writer.start_element(value.type_id().name());
    write_scalar_content(writer, value)?;
    writer.end_element()
}

/// Writes the content of an element holding a scalar value
fn write_scalar_content(writer: &mut XmlWriter, value: &Variant) -> EncodingResult<()> {
    match value {
        Variant::Empty => {}
        Variant::Boolean(v) => writer.text(if *v { "true" } else { "false" }),
        Variant::SByte(v) => writer.text(&v.to_string()),
        Variant::Byte(v) => writer.text(&v.to_string()),
        Variant::Int16(v) => writer.text(&v.to_string()),
        Variant::UInt16(v) => writer.text(&v.to_string()),
        Variant::Int32(v) => writer.text(&v.to_string()),
        Variant::UInt32(v) => writer.text(&v.to_string()),
        Variant::Int64(v) => writer.text(&v.to_string()),
        Variant::UInt64(v) => writer.text(&v.to_string()),
        Variant::Float(v) => writer.text(&float_text(v.is_nan(), v.is_infinite(), *v < 0.0, v)),
        Variant::Double(v) => writer.text(&float_text(v.is_nan(), v.is_infinite(), *v < 0.0, v)),
        Variant::String(v) => writer.text(v.as_ref()),
        Variant::DateTime(v) => writer.text(&v.to_rfc3339()),
        Variant::Guid(v) => writer.text_element("String", &v.to_string())?,
        Variant::StatusCode(v) => writer.text_element("Code", &v.bits().to_string())?,
        Variant::ByteString(v) => writer.text(&v.as_base64()),
        Variant::XmlElement(v) => writer.text(v.as_ref()),
        Variant::QualifiedName(v) => {
            writer.text_element("NamespaceIndex", &v.namespace_index.to_string())?;
            if !v.name.is_null() {
                writer.text_element("Name", v.name.as_ref())?;
            }
        }
        Variant::LocalizedText(v) => {
            if !v.locale.is_null() {
                writer.text_element("Locale", v.locale.as_ref())?;
            }
            if !v.text.is_null() {
                writer.text_element("Text", v.text.as_ref())?;
            }
        }
        Variant::NodeId(v) => writer.text_element("Identifier", &v.to_string())?,
        Variant::ExpandedNodeId(v) => writer.text_element("Identifier", &v.to_string())?,
        Variant::ExtensionObject(v) => write_extension_object(writer, v)?,
        Variant::DataValue(v) => write_data_value(writer, v)?,
        Variant::Variant(v) => write_variant_content(writer, v)?,
        Variant::DiagnosticInfo(v) => {
            check_chain_depth(v.depth(), constants::MAX_DECODING_DEPTH)?;
            write_diagnostic_info(writer, v)?
        }
        Variant::Array(_) => {
            error!("Nested arrays cannot be encoded");
            return Err(StatusCode::BadEncodingError);
        }
    }
    Ok(())
}

fn float_text<T: ToString>(is_nan: bool, is_infinite: bool, is_negative: bool, value: &T) -> String {
    if is_nan {
        "NaN".to_string()
    } else if is_infinite && is_negative {
        "-INF".to_string()
    } else if is_infinite {
        "INF".to_string()
    } else {
        value.to_string()
    }
}

fn write_extension_object(writer: &mut XmlWriter, value: &ExtensionObject) -> EncodingResult<()> {
    let type_id = match value.body {
        ExtensionObjectEncoding::Decoded(ref body) => body
            .encoding_id(EncodingKind::Xml)
            .unwrap_or_else(|| value.node_id.clone()),
        _ => value.node_id.clone(),
    };
    writer.start_element("TypeId");
    writer.text_element("Identifier", &type_id.to_string())?;
    writer.end_element()?;
    match value.body {
        ExtensionObjectEncoding::None => Ok(()),
        ExtensionObjectEncoding::ByteString(ref body) => {
            writer.start_element("Body");
            writer.text_element("ByteString", &body.as_base64())?;
            writer.end_element()
        }
        ExtensionObjectEncoding::XmlElement(ref body) => {
            writer.start_element("Body");
            writer.raw(body.as_ref());
            writer.end_element()
        }
        ExtensionObjectEncoding::Decoded(ref body) => {
            writer.start_element("Body");
            body.encode_xml(writer)?;
            writer.end_element()
        }
        ExtensionObjectEncoding::Json(_) => {
            error!("Extension object {} has a JSON body that cannot be written as XML", value.node_id);
            Err(StatusCode::BadEncodingError)
        }
    }
}

fn write_data_value(writer: &mut XmlWriter, value: &DataValue) -> EncodingResult<()> {
    if let Some(ref v) = value.value {
        writer.start_element("Value");
        write_variant_content(writer, v)?;
        writer.end_element()?;
    }
    if let Some(ref status) = value.status {
        writer.start_element("StatusCode");
        writer.text_element("Code", &status.bits().to_string())?;
        writer.end_element()?;
    }
    if let Some(ref source_timestamp) = value.source_timestamp {
        writer.text_element("SourceTimestamp", &source_timestamp.to_rfc3339())?;
        if let Some(source_picoseconds) = value.source_picoseconds {
            writer.text_element("SourcePicoseconds", &source_picoseconds.to_string())?;
        }
    }
    if let Some(ref server_timestamp) = value.server_timestamp {
        writer.text_element("ServerTimestamp", &server_timestamp.to_rfc3339())?;
        if let Some(server_picoseconds) = value.server_picoseconds {
            writer.text_element("ServerPicoseconds", &server_picoseconds.to_string())?;
        }
    }
    Ok(())
}

fn write_diagnostic_info(writer: &mut XmlWriter, value: &DiagnosticInfo) -> EncodingResult<()> {
    if let Some(symbolic_id) = value.symbolic_id {
        writer.text_element("SymbolicId", &symbolic_id.to_string())?;
    }
    if let Some(namespace_uri) = value.namespace_uri {
        writer.text_element("NamespaceUri", &namespace_uri.to_string())?;
    }
    if let Some(locale) = value.locale {
        writer.text_element("Locale", &locale.to_string())?;
    }
    if let Some(localized_text) = value.localized_text {
        writer.text_element("LocalizedText", &localized_text.to_string())?;
    }
    if let Some(ref additional_info) = value.additional_info {
        writer.text_element("AdditionalInfo", additional_info.as_ref())?;
    }
    if let Some(ref inner_status_code) = value.inner_status_code {
        writer.start_element("InnerStatusCode");
        writer.text_element("Code", &inner_status_code.bits().to_string())?;
        writer.end_element()?;
    }
    if let Some(ref inner_diagnostic_info) = value.inner_diagnostic_info {
        writer.start_element("InnerDiagnosticInfo");
        write_diagnostic_info(writer, inner_diagnostic_info)?;
        writer.end_element()?;
    }
    Ok(())
}

/// Writes a structure as an element named after its type. Absent optional fields and null
/// strings are omitted.
pub fn write_structure(writer: &mut XmlWriter, value: &DynamicStructure) -> EncodingResult<()> {
    let definition = value.definition();
    writer.start_element(&definition.name);
    match definition.structure_type {
        StructureType::Structure => {}
        StructureType::StructureWithOptionalFields => {
            writer.text_element("EncodingMask", &value.encoding_mask().to_string())?;
        }
        StructureType::Union => {
            writer.text_element("SwitchField", &value.switch().to_string())?;
        }
    }
    for (field, v) in value.present_fields() {
        write_field(writer, field, v).map_err(|err| {
            error!("Cannot encode field {}.{}", definition.name, field.name);
            err
        })?;
    }
    writer.end_element()
}

fn write_field(writer: &mut XmlWriter, field: &StructureField, value: &Variant) -> EncodingResult<()> {
    if !field.accepts(value) {
        error!("Value {:?} does not match the type of field {}", value, field.name);
        return Err(StatusCode::BadEncodingError);
    }
    match (field.value_rank, value) {
        (ValueRank::Scalar, value) => {
            if is_null_text(value) {
                return Ok(());
            }
            writer.start_element(&field.name);
            write_field_scalar(writer, &field.field_type, value)?;
            writer.end_element()
        }
        (ValueRank::OneDimension, Variant::Array(array)) => {
            let Some(ref values) = array.values else {
                return Ok(());
            };
            writer.start_element(&field.name);
            for value in values {
                writer.start_element(field.element_type().name());
                write_field_scalar(writer, &field.field_type, value)?;
                writer.end_element()?;
            }
            writer.end_element()
        }
        (ValueRank::Dimensions(_), Variant::Array(array)) => {
            let Some(ref dimensions) = array.dimensions else {
                return Ok(());
            };
            writer.start_element(&field.name);
            writer.start_element("Dimensions");
            for dimension in dimensions {
                writer.text_element("Int32", &dimension.to_string())?;
            }
            writer.end_element()?;
            writer.start_element("Elements");
            for value in array.values() {
                writer.start_element(field.element_type().name());
                write_field_scalar(writer, &field.field_type, value)?;
                writer.end_element()?;
            }
            writer.end_element()?;
            writer.end_element()
        }
        _ => Err(StatusCode::BadEncodingError),
    }
}

fn write_field_scalar(
    writer: &mut XmlWriter,
    field_type: &FieldType,
    value: &Variant,
) -> EncodingResult<()> {
    match (field_type, value) {
        (FieldType::Structure(_), Variant::ExtensionObject(eo)) => match eo.body {
            ExtensionObjectEncoding::Decoded(ref body) => body.encode_xml(writer),
            _ => {
                error!("Structure field holds an extension object that has not been decoded");
                Err(StatusCode::BadEncodingError)
            }
        },
        (_, value) => write_scalar_content(writer, value),
    }
}

fn is_null_text(value: &Variant) -> bool {
    match value {
        Variant::String(v) | Variant::XmlElement(v) => v.is_null(),
        Variant::ByteString(v) => v.is_null(),
        _ => false,
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn element_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

fn node_text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("")
}

fn parse_text<T: FromStr>(node: Node) -> EncodingResult<T> {
    let text = node_text(node).trim();
    text.parse::<T>().map_err(|_| {
        error!("Element {} has invalid value {}", node.tag_name().name(), text);
        StatusCode::BadDecodingError
    })
}

fn parse_child<T: FromStr>(node: Node, name: &str) -> EncodingResult<Option<T>> {
    child(node, name).map(parse_text::<T>).transpose()
}

fn parse_float(node: Node) -> EncodingResult<f64> {
    match node_text(node).trim() {
        "NaN" => Ok(f64::NAN),
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        _ => parse_text(node),
    }
}

fn parse_f32(node: Node) -> EncodingResult<f32> {
    match node_text(node).trim() {
        "NaN" => Ok(f32::NAN),
        "INF" => Ok(f32::INFINITY),
        "-INF" => Ok(f32::NEG_INFINITY),
        _ => parse_text(node),
    }
}

fn parse_bool(node: Node) -> EncodingResult<bool> {
    match node_text(node).trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        text => {
            error!("Invalid boolean {}", text);
            Err(StatusCode::BadDecodingError)
        }
    }
}

/// Enumerations may be written as `Name_Value` or just the value
fn parse_enumeration(node: Node) -> EncodingResult<i32> {
    let text = node_text(node).trim();
    let value = text.rsplit('_').next().unwrap_or(text);
    value.parse::<i32>().map_err(|_| {
        error!("Invalid enumeration {}", text);
        StatusCode::BadDecodingError
    })
}

fn read_string(node: Node, decoding_options: &DecodingOptions) -> EncodingResult<UAString> {
    let text = node_text(node);
    if text.len() > decoding_options.max_string_length {
        error!(
            "String length {} exceeds decoding limit {}",
            text.len(),
            decoding_options.max_string_length
        );
        return Err(StatusCode::BadEncodingLimitsExceeded);
    }
    Ok(UAString::from(text))
}

pub(crate) fn read_byte_string(
    text: &str,
    decoding_options: &DecodingOptions,
) -> EncodingResult<ByteString> {
    let text = text.trim();
    if text.len() / 4 * 3 > decoding_options.max_byte_string_length {
        error!(
            "Byte string exceeds decoding limit {}",
            decoding_options.max_byte_string_length
        );
        return Err(StatusCode::BadEncodingLimitsExceeded);
    }
    ByteString::from_base64(text).ok_or_else(|| {
        error!("Byte string is not valid base64");
        StatusCode::BadDecodingError
    })
}

fn read_node_id(node: Node) -> EncodingResult<NodeId> {
    match child(node, "Identifier").map(node_text).map(str::trim) {
        None | Some("") => Ok(NodeId::null()),
        Some(text) => NodeId::from_str(text).map_err(|_| {
            error!("Invalid node id {}", text);
            StatusCode::BadDecodingError
        }),
    }
}

fn read_expanded_node_id(node: Node) -> EncodingResult<ExpandedNodeId> {
    match child(node, "Identifier").map(node_text).map(str::trim) {
        None | Some("") => Ok(ExpandedNodeId::null()),
        Some(text) => ExpandedNodeId::from_str(text).map_err(|_| {
            error!("Invalid expanded node id {}", text);
            StatusCode::BadDecodingError
        }),
    }
}

fn read_status_code(node: Node) -> EncodingResult<StatusCode> {
    let code: u32 = parse_child(node, "Code")?.unwrap_or(0);
    Ok(StatusCode::from_bits_truncate(code))
}

fn read_date_time(node: Node) -> EncodingResult<DateTime> {
    let text = node_text(node).trim();
    DateTime::from_str(text).map_err(|_| StatusCode::BadDecodingError)
}

/// Reads the `<Value>` child of a variant element. No value is an empty variant.
pub(crate) fn read_variant_content(
    node: Node,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    let _depth_lock = decoding_options.depth_lock()?;
    let Some(value) = child(node, "Value") else {
        return Ok(Variant::Empty);
    };
    let Some(typed) = element_children(value).next() else {
        return Ok(Variant::Empty);
    };
    let name = typed.tag_name().name();
    if name == "Matrix" {
        read_matrix(typed, decoding_options)
    } else if let Some(element_name) = name.strip_prefix("ListOf") {
        let value_type = type_from_name(element_name)?;
        let values = read_elements(typed, value_type, decoding_options)?;
        Ok(Variant::from(Array {
            value_type,
            values: Some(values),
            dimensions: None,
        }))
    } else {
        let value_type = type_from_name(name)?;
        if value_type == VariantTypeId::Variant {
            error!("Variant contains a scalar variant");
            return Err(StatusCode::BadDecodingError);
        }
        read_scalar_content(typed, value_type, decoding_options)
    }
}

fn type_from_name(name: &str) -> EncodingResult<VariantTypeId> {
    match VariantTypeId::from_name(name) {
        Some(VariantTypeId::Empty) | None => {
            error!("Unrecognized variant type {}", name);
            Err(StatusCode::BadDecodingError)
        }
        Some(value_type) => Ok(value_type),
    }
}

fn check_array_length(node: Node, decoding_options: &DecodingOptions) -> EncodingResult<usize> {
    let len = element_children(node).count();
    if len > decoding_options.max_array_length {
        error!(
            "Array length {} exceeds decoding limit {}",
            len, decoding_options.max_array_length
        );
        Err(StatusCode::BadEncodingLimitsExceeded)
    } else {
        Ok(len)
    }
}

/// Reads every child element as a value of the type, the children being named after the type
fn read_elements(
    node: Node,
    value_type: VariantTypeId,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Vec<Variant>> {
    let len = check_array_length(node, decoding_options)?;
    let mut values = Vec::with_capacity(len);
    for element in element_children(node) {
        if element.tag_name().name() != value_type.name() {
            error!(
                "Array of {} has an element {}",
                value_type.name(),
                element.tag_name().name()
            );
            return Err(StatusCode::BadDecodingError);
        }
        values.push(read_scalar_content(element, value_type, decoding_options)?);
    }
    Ok(values)
}

fn read_dimensions_element(node: Node, decoding_options: &DecodingOptions) -> EncodingResult<Vec<u32>> {
    let dimensions = child(node, "Dimensions").ok_or_else(|| {
        error!("Matrix has no dimensions");
        StatusCode::BadDecodingError
    })?;
    check_array_length(dimensions, decoding_options)?;
    let dimensions = element_children(dimensions)
        .map(|d| {
            let d: i32 = parse_text(d)?;
            if d <= 0 {
                error!("Invalid array dimension {}", d);
                Err(StatusCode::BadDecodingError)
            } else {
                Ok(d as u32)
            }
        })
        .collect::<EncodingResult<Vec<u32>>>()?;
    if dimensions.is_empty() {
        error!("Matrix has no dimensions");
        return Err(StatusCode::BadDecodingError);
    }
    Ok(dimensions)
}

fn read_matrix(node: Node, decoding_options: &DecodingOptions) -> EncodingResult<Variant> {
    let dimensions = read_dimensions_element(node, decoding_options)?;
    let elements = child(node, "Elements").ok_or_else(|| {
        error!("Matrix has no elements");
        StatusCode::BadDecodingError
    })?;
    let first = element_children(elements).next().ok_or_else(|| {
        error!("Matrix has no elements");
        StatusCode::BadDecodingError
    })?;
    let value_type = type_from_name(first.tag_name().name())?;
    let values = read_elements(elements, value_type, decoding_options)?;
    if !Array::dimensions_match(&dimensions, values.len()) {
        error!(
            "Matrix dimensions {:?} do not match the {} elements",
            dimensions,
            values.len()
        );
        return Err(StatusCode::BadDecodingError);
    }
    Ok(Variant::from(Array {
        value_type,
        values: Some(values),
        dimensions: Some(dimensions),
    }))
}

/// Reads the content of an element holding a scalar of the type
fn read_scalar_content(
    node: Node,
    value_type: VariantTypeId,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    let value = match value_type {
        VariantTypeId::Empty => Variant::Empty,
        VariantTypeId::Boolean => Variant::Boolean(parse_bool(node)?),
        VariantTypeId::SByte => Variant::SByte(parse_text(node)?),
        VariantTypeId::Byte => Variant::Byte(parse_text(node)?),
        VariantTypeId::Int16 => Variant::Int16(parse_text(node)?),
        VariantTypeId::UInt16 => Variant::UInt16(parse_text(node)?),
        VariantTypeId::Int32 => Variant::Int32(parse_text(node)?),
        VariantTypeId::UInt32 => Variant::UInt32(parse_text(node)?),
        VariantTypeId::Int64 => Variant::Int64(parse_text(node)?),
        VariantTypeId::UInt64 => Variant::UInt64(parse_text(node)?),
        VariantTypeId::Float => Variant::Float(parse_f32(node)?),
        VariantTypeId::Double => Variant::Double(parse_float(node)?),
        VariantTypeId::String => Variant::String(read_string(node, decoding_options)?),
        VariantTypeId::DateTime => Variant::from(read_date_time(node)?),
        VariantTypeId::Guid => {
            let text = child(node, "String").map(node_text).unwrap_or("").trim();
            Variant::from(Guid::from_str(text).map_err(|_| StatusCode::BadDecodingError)?)
        }
        VariantTypeId::StatusCode => Variant::StatusCode(read_status_code(node)?),
        VariantTypeId::ByteString => {
            Variant::ByteString(read_byte_string(node_text(node), decoding_options)?)
        }
        VariantTypeId::XmlElement => {
            Variant::XmlElement(XmlElement::from(read_string(node, decoding_options)?))
        }
        VariantTypeId::QualifiedName => {
            let namespace_index: u16 = parse_child(node, "NamespaceIndex")?.unwrap_or(0);
            let name = match child(node, "Name") {
                Some(name) => read_string(name, decoding_options)?,
                None => UAString::null(),
            };
            Variant::from(QualifiedName {
                namespace_index,
                name,
            })
        }
        VariantTypeId::LocalizedText => {
            let locale = match child(node, "Locale") {
                Some(locale) => read_string(locale, decoding_options)?,
                None => UAString::null(),
            };
            let text = match child(node, "Text") {
                Some(text) => read_string(text, decoding_options)?,
                None => UAString::null(),
            };
            Variant::from(LocalizedText { locale, text })
        }
        VariantTypeId::NodeId => Variant::from(read_node_id(node)?),
        VariantTypeId::ExpandedNodeId => Variant::from(read_expanded_node_id(node)?),
        VariantTypeId::ExtensionObject => {
            Variant::from(read_extension_object(node, decoding_options)?)
        }
        VariantTypeId::DataValue => Variant::from(read_data_value(node, decoding_options)?),
        VariantTypeId::Variant => {
            Variant::Variant(Box::new(read_variant_content(node, decoding_options)?))
        }
        VariantTypeId::DiagnosticInfo => {
            Variant::from(read_diagnostic_info(node, decoding_options, 1)?)
        }
    };
    Ok(value)
}

fn read_extension_object(
    node: Node,
    decoding_options: &DecodingOptions,
) -> EncodingResult<ExtensionObject> {
    let _depth_lock = decoding_options.depth_lock()?;
    let node_id = match child(node, "TypeId") {
        Some(type_id) => read_node_id(type_id)?,
        None => NodeId::null(),
    };
    let Some(content) = child(node, "Body").and_then(|body| element_children(body).next()) else {
        return Ok(ExtensionObject {
            node_id,
            body: ExtensionObjectEncoding::None,
        });
    };
    if content.tag_name().name() == "ByteString" {
        let body = read_byte_string(node_text(content), decoding_options)?;
        let extension_object = ExtensionObject {
            node_id,
            body: ExtensionObjectEncoding::ByteString(body),
        };
        return extension_object.eager_resolve(decoding_options);
    }
    if decoding_options.decode_extension_objects {
        if let Some(codec) = decoding_options
            .type_registry
            .lookup(&node_id, EncodingKind::Xml)
        {
            match codec.decode_xml(content, decoding_options) {
                Ok(body) => return Ok(ExtensionObject::from_dyn(body)),
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
    // Unknown or undecodable types keep the markup of the body
    let xml = &content.document().input_text()[content.range()];
    Ok(ExtensionObject {
        node_id,
        body: ExtensionObjectEncoding::XmlElement(XmlElement::from(xml)),
    })
}

fn read_data_value(node: Node, decoding_options: &DecodingOptions) -> EncodingResult<DataValue> {
    let value = child(node, "Value")
        .map(|v| read_variant_content(v, decoding_options))
        .transpose()?;
    let status = child(node, "StatusCode").map(read_status_code).transpose()?;
    let source_timestamp = child(node, "SourceTimestamp").map(read_date_time).transpose()?;
    let source_picoseconds: Option<i16> = parse_child(node, "SourcePicoseconds")?;
    let server_timestamp = child(node, "ServerTimestamp").map(read_date_time).transpose()?;
    let server_picoseconds: Option<i16> = parse_child(node, "ServerPicoseconds")?;
    Ok(DataValue {
        value,
        status,
        source_picoseconds: source_timestamp.as_ref().and(source_picoseconds),
        source_timestamp,
        server_picoseconds: server_timestamp.as_ref().and(server_picoseconds),
        server_timestamp,
    })
}

fn read_diagnostic_info(
    node: Node,
    decoding_options: &DecodingOptions,
    level: usize,
) -> EncodingResult<DiagnosticInfo> {
    check_chain_depth(level, decoding_options.max_depth())?;
    let additional_info = match child(node, "AdditionalInfo") {
        Some(additional_info) => Some(read_string(additional_info, decoding_options)?),
        None => None,
    };
    let inner_diagnostic_info = match child(node, "InnerDiagnosticInfo") {
        Some(inner) => Some(Box::new(read_diagnostic_info(inner, decoding_options, level + 1)?)),
        None => None,
    };
    Ok(DiagnosticInfo {
        symbolic_id: parse_child(node, "SymbolicId")?,
        namespace_uri: parse_child(node, "NamespaceUri")?,
        locale: parse_child(node, "Locale")?,
        localized_text: parse_child(node, "LocalizedText")?,
        additional_info,
        inner_status_code: child(node, "InnerStatusCode")
            .map(read_status_code)
            .transpose()?,
        inner_diagnostic_info,
    })
}

/// Reads a structure from the element named after its type
pub fn read_structure(
    definition: Arc<StructureDefinition>,
    node: Node,
    decoding_options: &DecodingOptions,
) -> EncodingResult<DynamicStructure> {
    let _depth_lock = decoding_options.depth_lock()?;
    let field_count = definition.fields.len();
    let mut values = Vec::with_capacity(field_count);
    let mut switch = 0;
    match definition.structure_type {
        StructureType::Structure => {
            for field in &definition.fields {
                values.push(read_field_or_default(node, field, decoding_options)?);
            }
        }
        StructureType::StructureWithOptionalFields => {
            let bits = definition.optional_bits();
            let mask = match parse_child::<u32>(node, "EncodingMask")? {
                Some(mask) => mask,
                // Without a mask the elements that are there say which fields are present
                None => definition
                    .fields
                    .iter()
                    .zip(bits.iter())
                    .filter(|(field, _)| child(node, &field.name).is_some())
                    .fold(0, |mask, (_, bit)| mask | bit.unwrap_or(0)),
            };
            let known_bits = bits.iter().flatten().fold(0u32, |m, b| m | b);
            if mask & !known_bits != 0 {
                error!(
                    "Encoding mask {:#x} of {} has bits for fields that do not exist",
                    mask, definition.name
                );
                return Err(StatusCode::BadDecodingError);
            }
            for (field, bit) in definition.fields.iter().zip(bits) {
                let present = bit.map(|bit| mask & bit != 0).unwrap_or(true);
                values.push(if present {
                    read_field_or_default(node, field, decoding_options)?
                } else {
                    Variant::Empty
                });
            }
        }
        StructureType::Union => {
            switch = parse_child::<u32>(node, "SwitchField")?.unwrap_or(0);
            if switch as usize > field_count {
                error!("Union {} has no arm {}", definition.name, switch);
                return Err(StatusCode::BadDecodingError);
            }
            values.resize(field_count, Variant::Empty);
            if switch > 0 {
                let index = switch as usize - 1;
                values[index] =
                    read_field_or_default(node, &definition.fields[index], decoding_options)?;
            }
        }
    }
    Ok(DynamicStructure::from_decoded(definition, switch, values))
}

fn read_field_or_default(
    node: Node,
    field: &StructureField,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    let result = match child(node, &field.name) {
        Some(element) => read_field(element, field, decoding_options),
        None => field.absent_value(),
    };
    result.map_err(|err| {
        decoding_options.record_failed_field(&field.name);
        err
    })
}

fn read_field(
    node: Node,
    field: &StructureField,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    match field.value_rank {
        ValueRank::Scalar => read_field_scalar(node, &field.field_type, decoding_options),
        ValueRank::OneDimension => {
            let len = check_array_length(node, decoding_options)?;
            let mut values = Vec::with_capacity(len);
            for element in element_children(node) {
                values.push(read_field_scalar(element, &field.field_type, decoding_options)?);
            }
            Ok(Variant::from(Array {
                value_type: field.element_type(),
                values: Some(values),
                dimensions: None,
            }))
        }
        ValueRank::Dimensions(n) => {
            let dimensions = read_dimensions_element(node, decoding_options)?;
            if dimensions.len() != n as usize {
                error!("Matrix field {} has dimensions {:?}", field.name, dimensions);
                return Err(StatusCode::BadDecodingError);
            }
            let elements = child(node, "Elements").ok_or_else(|| {
                error!("Matrix field {} has no elements", field.name);
                StatusCode::BadDecodingError
            })?;
            let len = check_array_length(elements, decoding_options)?;
            let mut values = Vec::with_capacity(len);
            for element in element_children(elements) {
                values.push(read_field_scalar(element, &field.field_type, decoding_options)?);
            }
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

fn read_field_scalar(
    node: Node,
    field_type: &FieldType,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    match field_type {
        FieldType::Builtin(type_id) => read_scalar_content(node, *type_id, decoding_options),
        FieldType::Enumeration => Ok(Variant::Int32(parse_enumeration(node)?)),
        FieldType::Structure(data_type_id) => {
            let codec = decoding_options
                .type_registry
                .lookup_data_type(data_type_id)
                .ok_or_else(|| {
                    error!("No codec is registered for structure {}", data_type_id);
                    StatusCode::BadDataTypeIdUnknown
                })?;
            let content = element_children(node).next().ok_or_else(|| {
                error!("Structure field {} is empty", node.tag_name().name());
                StatusCode::BadDecodingError
            })?;
            let body = codec.decode_xml(content, decoding_options)?;
            Ok(Variant::from(ExtensionObject::from_dyn(body)))
        }
        FieldType::Abstract => Ok(Variant::from(read_extension_object(node, decoding_options)?)),
    }
}
