// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Contains the OPC UA built-in data types described in OPC UA Part 6 chapter 5 together with
//! the machinery for encoding them, and any runtime described structure, to and from the
//! binary, XML and JSON encodings.

pub mod constants {
    /// Default maximum number of elements in an array
    pub const MAX_ARRAY_LENGTH: usize = 1000;
    /// Default maximum size of a string in bytes
    pub const MAX_STRING_LENGTH: usize = 65535;
    /// Default maximum size of a byte string in bytes
    pub const MAX_BYTE_STRING_LENGTH: usize = 65535;
    /// Default maximum size of a message in bytes
    pub const MAX_MESSAGE_SIZE: usize = 65535 * 5;
    /// Default maximum decoding depth for recursive data structures, i.e. if data is nested deeper
    /// than this it is considered an error and decoding fails.
    pub const MAX_DECODING_DEPTH: usize = 10;
}

pub mod array;
pub mod basic_types;
pub mod byte_string;
pub mod codec;
pub mod data_value;
pub mod date_time;
pub mod diagnostic_info;
pub mod encoding;
pub mod error;
pub mod expanded_node_id;
pub mod extension_object;
pub mod guid;
pub mod json;
pub mod localized_text;
pub mod namespace_table;
pub mod node_id;
pub mod qualified_name;
pub mod standard_types;
pub mod status_codes;
pub mod string;
pub mod structure;
pub mod type_registry;
pub mod variant;
pub mod variant_type_id;
pub mod xml;

pub use self::{
    array::*, byte_string::ByteString, data_value::DataValue, date_time::*,
    diagnostic_info::*, encoding::*, error::*, expanded_node_id::ExpandedNodeId,
    extension_object::*, guid::Guid, localized_text::LocalizedText,
    namespace_table::NamespaceTable, node_id::*, qualified_name::QualifiedName,
    status_codes::StatusCode, string::*, structure::*, type_registry::*, variant::Variant,
    variant_type_id::*,
};

#[cfg(test)]
mod tests;
