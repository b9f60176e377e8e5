// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Definitions of the standard structures from namespace 0 that are registered with the process
//! wide registry at start up. Other types are registered the same way by whoever defines them.

use std::sync::Arc;

use crate::types::{
    node_id::NodeId,
    structure::{StructureCodec, StructureDefinition, StructureField, StructureType},
    type_registry::TypeRegistry,
    variant_type_id::VariantTypeId,
};

pub mod ids {
    pub const RANGE: u32 = 884;
    pub const RANGE_ENCODING_DEFAULT_XML: u32 = 885;
    pub const RANGE_ENCODING_DEFAULT_BINARY: u32 = 886;
    pub const RANGE_ENCODING_DEFAULT_JSON: u32 = 15375;

    pub const EU_INFORMATION: u32 = 887;
    pub const EU_INFORMATION_ENCODING_DEFAULT_XML: u32 = 888;
    pub const EU_INFORMATION_ENCODING_DEFAULT_BINARY: u32 = 889;
    pub const EU_INFORMATION_ENCODING_DEFAULT_JSON: u32 = 15376;

    pub const ARGUMENT: u32 = 296;
    pub const ARGUMENT_ENCODING_DEFAULT_XML: u32 = 297;
    pub const ARGUMENT_ENCODING_DEFAULT_BINARY: u32 = 298;
    pub const ARGUMENT_ENCODING_DEFAULT_JSON: u32 = 15081;
}

/// Range of a value, `Low` to `High`
pub fn range() -> StructureDefinition {
    StructureDefinition::new(
        "Range",
        NodeId::ns0(ids::RANGE),
        StructureType::Structure,
        vec![
            StructureField::builtin("Low", VariantTypeId::Double),
            StructureField::builtin("High", VariantTypeId::Double),
        ],
    )
    .with_encoding_ids(
        NodeId::ns0(ids::RANGE_ENCODING_DEFAULT_BINARY),
        NodeId::ns0(ids::RANGE_ENCODING_DEFAULT_XML),
        NodeId::ns0(ids::RANGE_ENCODING_DEFAULT_JSON),
    )
}

/// Engineering unit information
pub fn eu_information() -> StructureDefinition {
    StructureDefinition::new(
        "EUInformation",
        NodeId::ns0(ids::EU_INFORMATION),
        StructureType::Structure,
        vec![
            StructureField::builtin("NamespaceUri", VariantTypeId::String),
            StructureField::builtin("UnitId", VariantTypeId::Int32),
            StructureField::builtin("DisplayName", VariantTypeId::LocalizedText),
            StructureField::builtin("Description", VariantTypeId::LocalizedText),
        ],
    )
    .with_encoding_ids(
        NodeId::ns0(ids::EU_INFORMATION_ENCODING_DEFAULT_BINARY),
        NodeId::ns0(ids::EU_INFORMATION_ENCODING_DEFAULT_XML),
        NodeId::ns0(ids::EU_INFORMATION_ENCODING_DEFAULT_JSON),
    )
}

/// Method argument description
pub fn argument() -> StructureDefinition {
    StructureDefinition::new(
        "Argument",
        NodeId::ns0(ids::ARGUMENT),
        StructureType::Structure,
        vec![
            StructureField::builtin("Name", VariantTypeId::String),
            StructureField::builtin("DataType", VariantTypeId::NodeId),
            StructureField::builtin("ValueRank", VariantTypeId::Int32),
            StructureField::builtin("ArrayDimensions", VariantTypeId::UInt32).array(),
            StructureField::builtin("Description", VariantTypeId::LocalizedText),
        ],
    )
    .with_encoding_ids(
        NodeId::ns0(ids::ARGUMENT_ENCODING_DEFAULT_BINARY),
        NodeId::ns0(ids::ARGUMENT_ENCODING_DEFAULT_XML),
        NodeId::ns0(ids::ARGUMENT_ENCODING_DEFAULT_JSON),
    )
}

pub(crate) fn register_standard_types(registry: &TypeRegistry) {
    for definition in [range(), eu_information(), argument()] {
        let name = definition.name.clone();
        match StructureCodec::new(definition) {
            Ok(codec) => registry.register_type(Arc::new(codec)),
            Err(err) => error!("Standard type {} has an invalid definition, {}", name, err),
        }
    }
}
