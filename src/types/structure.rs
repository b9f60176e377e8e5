// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Structures described at runtime.
//!
//! A `StructureDefinition` lists the fields of a structure or the arms of a union. A
//! `DynamicStructure` holds one value per field and is encoded by walking the fields in declared
//! order. Registering a `StructureCodec` for a definition lets extension objects of that type be
//! decoded into a `DynamicStructure`.

use std::{
    any::Any,
    collections::HashSet,
    io::{Read, Write},
    sync::Arc,
};

use crate::types::{
    array::Array,
    encoding::*,
    extension_object::{ExtensionObject, ExtensionObjectEncoding},
    json,
    node_id::NodeId,
    status_codes::StatusCode,
    type_registry::{DynEncodable, EncodingKind, TypeCodec},
    variant::Variant,
    variant_type_id::VariantTypeId,
    xml::{self, XmlWriter},
};

/// Maximum number of optional fields, one per bit of the encoding mask
const MAX_OPTIONAL_FIELDS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureType {
    /// Every field is always encoded
    Structure,
    /// Fields may be optional and a mask says which are present
    StructureWithOptionalFields,
    /// Exactly one field, or none, is encoded after a switch value
    Union,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueRank {
    Scalar,
    OneDimension,
    /// A matrix with the number of dimensions, at least 2
    Dimensions(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    Builtin(VariantTypeId),
    /// A structure named by its data type id. It is encoded inline, without an extension object
    /// around it, and resolved through the registry.
    Structure(NodeId),
    /// Enumerations are encoded as Int32
    Enumeration,
    /// A field of abstract type, encoded as a full extension object
    Abstract,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureField {
    pub name: String,
    pub field_type: FieldType,
    pub value_rank: ValueRank,
    pub is_optional: bool,
}

impl StructureField {
    pub fn new<T: Into<String>>(name: T, field_type: FieldType) -> StructureField {
        StructureField {
            name: name.into(),
            field_type,
            value_rank: ValueRank::Scalar,
            is_optional: false,
        }
    }

    pub fn builtin<T: Into<String>>(name: T, type_id: VariantTypeId) -> StructureField {
        Self::new(name, FieldType::Builtin(type_id))
    }

    pub fn array(mut self) -> StructureField {
        self.value_rank = ValueRank::OneDimension;
        self
    }

    pub fn matrix(mut self, dimensions: u32) -> StructureField {
        self.value_rank = ValueRank::Dimensions(dimensions);
        self
    }

    pub fn optional(mut self) -> StructureField {
        self.is_optional = true;
        self
    }

    /// The variant type of a scalar value of the field, or of an element of an array field.
    pub fn element_type(&self) -> VariantTypeId {
        match self.field_type {
            FieldType::Builtin(type_id) => type_id,
            FieldType::Enumeration => VariantTypeId::Int32,
            FieldType::Structure(_) | FieldType::Abstract => VariantTypeId::ExtensionObject,
        }
    }

    /// Tests if the value is acceptable for the field. `Empty` is never acceptable, absence is
    /// handled by the caller.
    pub fn accepts(&self, value: &Variant) -> bool {
        match self.value_rank {
            ValueRank::Scalar => self.accepts_scalar(value),
            ValueRank::OneDimension => match value {
                Variant::Array(array) => {
                    array.dimensions.is_none() && self.accepts_elements(array)
                }
                _ => false,
            },
            ValueRank::Dimensions(n) => match value {
                Variant::Array(array) => match array.dimensions {
                    None => array.is_null() && array.value_type == self.element_type(),
                    Some(ref dimensions) => {
                        dimensions.len() == n as usize
                            && array.is_valid()
                            && self.accepts_elements(array)
                    }
                },
                _ => false,
            },
        }
    }

    /// The value a decoder takes for a mandatory field that the text encodings left out. Only a
    /// named structure has no such value.
    pub(crate) fn absent_value(&self) -> EncodingResult<Variant> {
        match (self.value_rank, &self.field_type) {
            (ValueRank::Scalar, FieldType::Builtin(type_id)) => Ok(Variant::null_of(*type_id)),
            (ValueRank::Scalar, FieldType::Enumeration) => Ok(Variant::Int32(0)),
            (ValueRank::Scalar, FieldType::Abstract) => Ok(Variant::from(ExtensionObject::null())),
            (ValueRank::Scalar, FieldType::Structure(_)) => {
                error!("Structure field {} is missing", self.name);
                Err(StatusCode::BadDecodingError)
            }
            _ => Ok(Variant::from(Array::null(self.element_type()))),
        }
    }

    fn accepts_elements(&self, array: &Array) -> bool {
        array.value_type == self.element_type()
            && array.values().iter().all(|v| self.accepts_scalar(v))
    }

    fn accepts_scalar(&self, value: &Variant) -> bool {
        match (&self.field_type, value) {
            (_, Variant::Array(_)) | (_, Variant::Empty) => false,
            (FieldType::Builtin(type_id), value) => value.type_id() == *type_id,
            (FieldType::Enumeration, Variant::Int32(_)) => true,
            (FieldType::Structure(data_type_id), Variant::ExtensionObject(eo)) => match eo.body {
                ExtensionObjectEncoding::Decoded(ref body) => body.data_type_id() == *data_type_id,
                ExtensionObjectEncoding::ByteString(_) => true,
                _ => false,
            },
            (FieldType::Abstract, Variant::ExtensionObject(_)) => true,
            _ => false,
        }
    }
}

/// Describes the fields of a structure or the arms of a union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDefinition {
    pub data_type_id: NodeId,
    pub binary_encoding_id: Option<NodeId>,
    pub xml_encoding_id: Option<NodeId>,
    pub json_encoding_id: Option<NodeId>,
    pub name: String,
    pub structure_type: StructureType,
    pub fields: Vec<StructureField>,
    /// The data type this one was derived from, if any
    pub base: Option<NodeId>,
}

impl StructureDefinition {
    pub fn new<T: Into<String>>(
        name: T,
        data_type_id: NodeId,
        structure_type: StructureType,
        fields: Vec<StructureField>,
    ) -> StructureDefinition {
        StructureDefinition {
            data_type_id,
            binary_encoding_id: None,
            xml_encoding_id: None,
            json_encoding_id: None,
            name: name.into(),
            structure_type,
            fields,
            base: None,
        }
    }

    pub fn with_encoding_ids(
        mut self,
        binary_encoding_id: NodeId,
        xml_encoding_id: NodeId,
        json_encoding_id: NodeId,
    ) -> StructureDefinition {
        self.binary_encoding_id = Some(binary_encoding_id);
        self.xml_encoding_id = Some(xml_encoding_id);
        self.json_encoding_id = Some(json_encoding_id);
        self
    }

    /// Produces the definition of a derived structure. Its fields are the fields of the parent
    /// followed by its own.
    pub fn flatten(&self, parent: &StructureDefinition) -> StructureDefinition {
        let mut fields = parent.fields.clone();
        fields.extend(self.fields.iter().cloned());
        StructureDefinition {
            fields,
            base: Some(parent.data_type_id.clone()),
            ..self.clone()
        }
    }

    pub fn encoding_id(&self, kind: EncodingKind) -> Option<NodeId> {
        match kind {
            EncodingKind::Binary => self.binary_encoding_id.clone(),
            EncodingKind::Xml => self.xml_encoding_id.clone(),
            EncodingKind::Json => self.json_encoding_id.clone(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&StructureField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn optional_field_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_optional).count()
    }

    pub fn validate(&self) -> Result<(), StatusCode> {
        let mut names = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                error!("Structure {} has duplicate field {}", self.name, field.name);
                return Err(StatusCode::BadInvalidArgument);
            }
            if let ValueRank::Dimensions(n) = field.value_rank {
                if n < 2 {
                    error!("Structure {} field {} has a matrix of {} dimensions", self.name, field.name, n);
                    return Err(StatusCode::BadInvalidArgument);
                }
            }
            if field.field_type == FieldType::Builtin(VariantTypeId::Empty) {
                error!("Structure {} field {} has no type", self.name, field.name);
                return Err(StatusCode::BadInvalidArgument);
            }
        }
        let optional_fields = self.optional_field_count();
        match self.structure_type {
            StructureType::Union if optional_fields > 0 => {
                error!("Union {} cannot have optional fields", self.name);
                Err(StatusCode::BadInvalidArgument)
            }
            _ if optional_fields > MAX_OPTIONAL_FIELDS => {
                error!(
                    "Structure {} has {} optional fields, more than the mask can hold",
                    self.name, optional_fields
                );
                Err(StatusCode::BadInvalidArgument)
            }
            _ => Ok(()),
        }
    }

    /// The bit of the optional field at the index among all fields. Bits are assigned in
    /// declaration order among the optional fields only.
    pub(crate) fn optional_bits(&self) -> Vec<Option<u32>> {
        let mut bit = 0;
        self.fields
            .iter()
            .map(|f| {
                if f.is_optional {
                    let mask = 1u32 << bit;
                    bit += 1;
                    Some(mask)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// A structure value whose layout comes from a definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicStructure {
    definition: Arc<StructureDefinition>,
    switch: u32,
    values: Vec<Variant>,
}

impl DynamicStructure {
    /// Creates a structure with a value for each field, in declaration order. An absent optional
    /// field is `Variant::Empty`.
    pub fn new_struct(
        definition: Arc<StructureDefinition>,
        values: Vec<Variant>,
    ) -> Result<DynamicStructure, StatusCode> {
        if definition.structure_type == StructureType::Union {
            error!("{} is a union", definition.name);
            return Err(StatusCode::BadInvalidArgument);
        }
        if values.len() != definition.fields.len() {
            error!(
                "{} has {} fields but {} values were supplied",
                definition.name,
                definition.fields.len(),
                values.len()
            );
            return Err(StatusCode::BadInvalidArgument);
        }
        for (field, value) in definition.fields.iter().zip(values.iter()) {
            let absent_allowed = field.is_optional
                && definition.structure_type == StructureType::StructureWithOptionalFields;
            let valid = match value {
                Variant::Empty => absent_allowed,
                value => field.accepts(value),
            };
            if !valid {
                error!("Value {:?} is not valid for field {}.{}", value, definition.name, field.name);
                return Err(StatusCode::BadInvalidArgument);
            }
        }
        Ok(DynamicStructure {
            definition,
            switch: 0,
            values,
        })
    }

    /// Creates a union with the arm selected, where arm 1 is the first field.
    pub fn new_union(
        definition: Arc<StructureDefinition>,
        arm: u32,
        value: Variant,
    ) -> Result<DynamicStructure, StatusCode> {
        if definition.structure_type != StructureType::Union {
            error!("{} is not a union", definition.name);
            return Err(StatusCode::BadInvalidArgument);
        }
        let index = (arm as usize).checked_sub(1).ok_or(StatusCode::BadInvalidArgument)?;
        let field = definition.fields.get(index).ok_or_else(|| {
            error!("{} has no arm {}", definition.name, arm);
            StatusCode::BadInvalidArgument
        })?;
        if !field.accepts(&value) {
            error!("Value {:?} is not valid for arm {}.{}", value, definition.name, field.name);
            return Err(StatusCode::BadInvalidArgument);
        }
        let mut values = vec![Variant::Empty; definition.fields.len()];
        values[index] = value;
        Ok(DynamicStructure {
            definition,
            switch: arm,
            values,
        })
    }

    /// Creates a union with no arm selected
    pub fn null_union(definition: Arc<StructureDefinition>) -> DynamicStructure {
        let values = vec![Variant::Empty; definition.fields.len()];
        DynamicStructure {
            definition,
            switch: 0,
            values,
        }
    }

    pub fn definition(&self) -> &Arc<StructureDefinition> {
        &self.definition
    }

    /// The selected arm of a union, 0 for none. Always 0 for a structure.
    pub fn switch(&self) -> u32 {
        self.switch
    }

    pub fn values(&self) -> &[Variant] {
        &self.values
    }

    /// The value of the named field. An absent field or unselected arm is `Variant::Empty`.
    pub fn get(&self, name: &str) -> Option<&Variant> {
        self.definition
            .field_index(name)
            .and_then(|i| self.values.get(i))
    }

    /// The fields that are encoded, paired with their values
    pub(crate) fn present_fields(&self) -> impl Iterator<Item = (&StructureField, &Variant)> {
        let switch = self.switch as usize;
        let structure_type = self.definition.structure_type;
        self.definition
            .fields
            .iter()
            .zip(self.values.iter())
            .enumerate()
            .filter(move |(i, (_, value))| match structure_type {
                StructureType::Structure => true,
                StructureType::StructureWithOptionalFields => !matches!(value, Variant::Empty),
                StructureType::Union => *i + 1 == switch,
            })
            .map(|(_, field)| field)
    }

    /// The mask of present optional fields
    pub fn encoding_mask(&self) -> u32 {
        self.definition
            .optional_bits()
            .iter()
            .zip(self.values.iter())
            .fold(0, |mask, (bit, value)| match bit {
                Some(bit) if !matches!(value, Variant::Empty) => mask | bit,
                _ => mask,
            })
    }

    /// Builds a structure from decoded values, in declaration order. The values come from a
    /// decoder that already checked them against the definition.
    pub(crate) fn from_decoded(
        definition: Arc<StructureDefinition>,
        switch: u32,
        values: Vec<Variant>,
    ) -> DynamicStructure {
        DynamicStructure {
            definition,
            switch,
            values,
        }
    }

    pub fn byte_len(&self) -> usize {
        let mut size = match self.definition.structure_type {
            StructureType::Structure => 0,
            StructureType::StructureWithOptionalFields | StructureType::Union => 4,
        };
        size += self
            .present_fields()
            .map(|(field, value)| byte_len_field(field, value))
            .sum::<usize>();
        size
    }

    pub fn encode_binary<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        let mut size = 0;
        match self.definition.structure_type {
            StructureType::Structure => {}
            StructureType::StructureWithOptionalFields => {
                size += write_u32(stream, self.encoding_mask())?;
            }
            StructureType::Union => {
                size += write_u32(stream, self.switch)?;
            }
        }
        for (field, value) in self.present_fields() {
            size += encode_field(stream, field, value).map_err(|err| {
                error!("Cannot encode field {}.{}", self.definition.name, field.name);
                err
            })?;
        }
        Ok(size)
    }

    pub fn decode_binary<S: Read + ?Sized>(
        definition: Arc<StructureDefinition>,
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<DynamicStructure> {
        let _depth_lock = decoding_options.depth_lock()?;
        let field_count = definition.fields.len();
        let mut values = Vec::with_capacity(field_count);
        let mut switch = 0;
        match definition.structure_type {
            StructureType::Structure => {
                for field in &definition.fields {
                    values.push(decode_field_recorded(stream, field, decoding_options)?);
                }
            }
            StructureType::StructureWithOptionalFields => {
                let mask = read_u32(stream)?;
                let bits = definition.optional_bits();
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
                        decode_field_recorded(stream, field, decoding_options)?
                    } else {
                        Variant::Empty
                    });
                }
            }
            StructureType::Union => {
                switch = read_u32(stream)?;
                if switch as usize > field_count {
                    error!("Union {} has no arm {}", definition.name, switch);
                    return Err(StatusCode::BadDecodingError);
                }
                values.resize(field_count, Variant::Empty);
                if switch > 0 {
                    let index = switch as usize - 1;
                    values[index] =
                        decode_field_recorded(stream, &definition.fields[index], decoding_options)?;
                }
            }
        }
        Ok(DynamicStructure::from_decoded(definition, switch, values))
    }
}

impl From<DynamicStructure> for ExtensionObject {
    fn from(value: DynamicStructure) -> Self {
        ExtensionObject::from_dyn(Box::new(value))
    }
}

impl From<DynamicStructure> for Variant {
    fn from(value: DynamicStructure) -> Self {
        Variant::from(ExtensionObject::from(value))
    }
}

impl DynEncodable for DynamicStructure {
    fn data_type_id(&self) -> NodeId {
        self.definition.data_type_id.clone()
    }

    fn encoding_id(&self, kind: EncodingKind) -> Option<NodeId> {
        self.definition.encoding_id(kind)
    }

    fn byte_len_dyn(&self) -> usize {
        self.byte_len()
    }

    fn encode_binary(&self, stream: &mut dyn Write) -> EncodingResult<usize> {
        DynamicStructure::encode_binary(self, stream)
    }

    fn encode_xml(&self, writer: &mut XmlWriter) -> EncodingResult<()> {
        xml::write_structure(writer, self)
    }

    fn encode_json(&self) -> EncodingResult<serde_json::Value> {
        json::structure_to_json(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn DynEncodable> {
        Box::new(self.clone())
    }

    fn dyn_eq(&self, other: &dyn DynEncodable) -> bool {
        other
            .as_any()
            .downcast_ref::<DynamicStructure>()
            .map(|other| self == other)
            .unwrap_or(false)
    }
}

/// Decodes structures of one definition. Registering it in a `TypeRegistry` makes extension
/// objects of the type decodable.
#[derive(Debug, Clone)]
pub struct StructureCodec {
    definition: Arc<StructureDefinition>,
}

impl StructureCodec {
    pub fn new(definition: StructureDefinition) -> Result<StructureCodec, StatusCode> {
        definition.validate()?;
        Ok(StructureCodec {
            definition: Arc::new(definition),
        })
    }

    pub fn definition(&self) -> Arc<StructureDefinition> {
        self.definition.clone()
    }
}

impl TypeCodec for StructureCodec {
    fn data_type_id(&self) -> NodeId {
        self.definition.data_type_id.clone()
    }

    fn encoding_id(&self, kind: EncodingKind) -> Option<NodeId> {
        self.definition.encoding_id(kind)
    }

    fn decode_binary(
        &self,
        stream: &mut dyn Read,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Box<dyn DynEncodable>> {
        let value = DynamicStructure::decode_binary(self.definition.clone(), stream, decoding_options)?;
        Ok(Box::new(value))
    }

    fn decode_xml(
        &self,
        node: roxmltree::Node,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Box<dyn DynEncodable>> {
        let value = xml::read_structure(self.definition.clone(), node, decoding_options)?;
        Ok(Box::new(value))
    }

    fn decode_json(
        &self,
        value: &serde_json::Value,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Box<dyn DynEncodable>> {
        let value = json::structure_from_json(self.definition.clone(), value, decoding_options)?;
        Ok(Box::new(value))
    }
}

fn byte_len_field(field: &StructureField, value: &Variant) -> usize {
    match (field.value_rank, value) {
        (ValueRank::Scalar, value) => byte_len_scalar(&field.field_type, value),
        (ValueRank::OneDimension, Variant::Array(array)) => {
            4 + array
                .values()
                .iter()
                .map(|v| byte_len_scalar(&field.field_type, v))
                .sum::<usize>()
        }
        (ValueRank::Dimensions(_), Variant::Array(array)) => {
            let dimensions = array.dimensions.as_deref().map(byte_len_dimensions).unwrap_or(4);
            dimensions
                + array
                    .values()
                    .iter()
                    .map(|v| byte_len_scalar(&field.field_type, v))
                    .sum::<usize>()
        }
        _ => 0,
    }
}

fn byte_len_scalar(field_type: &FieldType, value: &Variant) -> usize {
    match (field_type, value) {
        (FieldType::Structure(_), Variant::ExtensionObject(eo)) => match eo.body {
            ExtensionObjectEncoding::Decoded(ref body) => body.byte_len_dyn(),
            ExtensionObjectEncoding::ByteString(ref body) => body.as_ref().len(),
            _ => 0,
        },
        (_, value) => Variant::byte_len_variant_value(value),
    }
}

fn encode_field<S: Write + ?Sized>(
    stream: &mut S,
    field: &StructureField,
    value: &Variant,
) -> EncodingResult<usize> {
    if !field.accepts(value) {
        error!("Value {:?} does not match the type of field {}", value, field.name);
        return Err(StatusCode::BadEncodingError);
    }
    match (field.value_rank, value) {
        (ValueRank::Scalar, value) => encode_scalar(stream, &field.field_type, value),
        (ValueRank::OneDimension, Variant::Array(array)) => match array.values {
            None => write_i32(stream, -1),
            Some(ref values) => {
                let mut size = write_array_length(stream, values.len())?;
                for value in values {
                    size += encode_scalar(stream, &field.field_type, value)?;
                }
                Ok(size)
            }
        },
        (ValueRank::Dimensions(_), Variant::Array(array)) => match array.dimensions {
            // A null matrix is written as a null dimensions array
            None => write_i32(stream, -1),
            Some(ref dimensions) => {
                let mut size = write_dimensions(stream, dimensions)?;
                for value in array.values() {
                    size += encode_scalar(stream, &field.field_type, value)?;
                }
                Ok(size)
            }
        },
        _ => Err(StatusCode::BadEncodingError),
    }
}

fn encode_scalar<S: Write + ?Sized>(
    stream: &mut S,
    field_type: &FieldType,
    value: &Variant,
) -> EncodingResult<usize> {
    match (field_type, value) {
        (FieldType::Structure(_), Variant::ExtensionObject(eo)) => match eo.body {
            ExtensionObjectEncoding::Decoded(ref body) => {
                let mut buffer = Vec::with_capacity(body.byte_len_dyn());
                body.encode_binary(&mut buffer)?;
                write_all(stream, &buffer)
            }
            ExtensionObjectEncoding::ByteString(ref body) => write_all(stream, body.as_ref()),
            _ => {
                error!("Structure field holds an extension object that cannot be written inline");
                Err(StatusCode::BadEncodingError)
            }
        },
        (_, value) => Variant::encode_variant_value(stream, value),
    }
}

fn decode_field_recorded<S: Read + ?Sized>(
    stream: &mut S,
    field: &StructureField,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    decode_field(stream, field, decoding_options).map_err(|err| {
        decoding_options.record_failed_field(&field.name);
        err
    })
}

fn decode_field<S: Read + ?Sized>(
    stream: &mut S,
    field: &StructureField,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    match field.value_rank {
        ValueRank::Scalar => decode_scalar(stream, &field.field_type, decoding_options),
        ValueRank::OneDimension => match read_array_length(stream, decoding_options)? {
            None => Ok(Variant::from(Array::null(field.element_type()))),
            Some(len) => {
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(decode_scalar(stream, &field.field_type, decoding_options)?);
                }
                Ok(Variant::from(Array {
                    value_type: field.element_type(),
                    values: Some(values),
                    dimensions: None,
                }))
            }
        },
        ValueRank::Dimensions(n) => {
            let dimensions: Option<Vec<i32>> = read_array(stream, decoding_options)?;
            let Some(dimensions) = dimensions else {
                return Ok(Variant::from(Array::null(field.element_type())));
            };
            if dimensions.len() != n as usize || dimensions.iter().any(|d| *d <= 0) {
                error!("Matrix field {} has invalid dimensions {:?}", field.name, dimensions);
                return Err(StatusCode::BadDecodingError);
            }
            let dimensions: Vec<u32> = dimensions.into_iter().map(|d| d as u32).collect();
            let len = match dimensions_product(&dimensions) {
                Some(len) if len <= decoding_options.max_array_length => len,
                _ => {
                    error!(
                        "Matrix field {} with dimensions {:?} exceeds the array limit",
                        field.name, dimensions
                    );
                    return Err(StatusCode::BadEncodingLimitsExceeded);
                }
            };
            let mut values = Vec::with_capacity(len);
            for _ in 0..len {
                values.push(decode_scalar(stream, &field.field_type, decoding_options)?);
            }
            Ok(Variant::from(Array {
                value_type: field.element_type(),
                values: Some(values),
                dimensions: Some(dimensions),
            }))
        }
    }
}

fn decode_scalar<S: Read + ?Sized>(
    stream: &mut S,
    field_type: &FieldType,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    match field_type {
        FieldType::Builtin(VariantTypeId::Empty) => Err(StatusCode::BadDecodingError),
        FieldType::Builtin(type_id) => {
            Variant::decode_variant_value(stream, *type_id, decoding_options)
        }
        FieldType::Enumeration => Ok(Variant::Int32(read_i32(stream)?)),
        FieldType::Structure(data_type_id) => {
            let codec = decoding_options
                .type_registry
                .lookup_data_type(data_type_id)
                .ok_or_else(|| {
                    error!("No codec is registered for structure {}", data_type_id);
                    StatusCode::BadDataTypeIdUnknown
                })?;
            let mut reader = StreamReader(stream);
            let body = codec.decode_binary(&mut reader, decoding_options)?;
            Ok(Variant::from(ExtensionObject::from_dyn(body)))
        }
        FieldType::Abstract => Ok(Variant::from(ExtensionObject::decode(
            stream,
            decoding_options,
        )?)),
    }
}

/// Lets a stream that may be unsized be passed where a `dyn Read` is expected
struct StreamReader<'a, S: Read + ?Sized>(&'a mut S);

impl<S: Read + ?Sized> Read for StreamReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}
