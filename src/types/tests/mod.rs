// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

mod codec;
mod encoding;
mod extension_object;
mod structure;
mod xml;

use std::cmp::PartialEq;
use std::fmt::Debug;
use std::io::Cursor;
use std::sync::Arc;

use crate::types::{status_codes::StatusCode, *};

pub fn serialize_test_and_return<T>(value: T) -> T
where
    T: BinaryEncoder<T> + Debug + PartialEq + Clone,
{
    serialize_test_and_return_expected(value.clone(), value)
}

pub fn serialize_as_stream<T>(value: T) -> Cursor<Vec<u8>>
where
    T: BinaryEncoder<T> + Debug,
{
    // Ask the struct for its byte length
    let byte_len = value.byte_len();
    let mut stream = Cursor::new(vec![0u8; byte_len]);

    // Encode to stream
    let start_pos = stream.position();
    let result = value.encode(&mut stream);
    let end_pos = stream.position();
    assert!(result.is_ok());

    // This ensures the size reported is the same as the byte length impl
    assert_eq!(result.unwrap(), byte_len);

    // Test that the position matches the byte_len
    assert_eq!((end_pos - start_pos) as usize, byte_len);

    let actual = stream.into_inner();
    println!("value = {:?}", value);
    println!("encoded bytes = {:?}", actual);
    Cursor::new(actual)
}

pub fn serialize_test_and_return_expected<T>(value: T, expected_value: T) -> T
where
    T: BinaryEncoder<T> + Debug + PartialEq,
{
    let mut stream = serialize_as_stream(value);

    let decoding_options = DecodingOptions::test();
    let new_value: T = T::decode(&mut stream, &decoding_options).unwrap();
    println!("new value = {:?}", new_value);
    assert_eq!(expected_value, new_value);
    new_value
}

pub fn serialize_test<T>(value: T)
where
    T: BinaryEncoder<T> + Debug + PartialEq + Clone,
{
    let _ = serialize_test_and_return(value);
}

pub fn serialize_test_expected<T>(value: T, expected_value: T)
where
    T: BinaryEncoder<T> + Debug + PartialEq,
{
    let _ = serialize_test_and_return_expected(value, expected_value);
}

pub fn serialize_and_compare<T>(value: T, expected: &[u8])
where
    T: BinaryEncoder<T> + Debug + PartialEq,
{
    // Ask the struct for its byte length
    let byte_len = value.byte_len();
    let mut stream = Cursor::new(vec![0; byte_len]);

    let result = value.encode(&mut stream);
    assert!(result.is_ok());

    let size = result.unwrap();
    assert_eq!(size, expected.len());
    println!("Size of encoding = {}", size);
    assert_eq!(size, byte_len);

    let actual = stream.into_inner();

    println!("actual {:?}", actual);
    println!("expected {:?}", expected);

    assert_eq!(actual.as_slice(), expected);
}

/// Decodes the bytes, expecting the decode to fail with the status code
pub fn decode_fails<T>(bytes: &[u8], decoding_options: &DecodingOptions, expected: StatusCode)
where
    T: BinaryEncoder<T> + Debug,
{
    let mut stream = Cursor::new(bytes);
    let result = T::decode(&mut stream, decoding_options);
    println!("result = {:?}", result);
    assert_eq!(result.unwrap_err(), expected);
}

/// `Point { X: Double, Y: Double }` in namespace 2
pub fn point_definition() -> StructureDefinition {
    StructureDefinition::new(
        "Point",
        NodeId::new(2, 1000),
        StructureType::Structure,
        vec![
            StructureField::builtin("X", VariantTypeId::Double),
            StructureField::builtin("Y", VariantTypeId::Double),
        ],
    )
    .with_encoding_ids(NodeId::new(2, 1001), NodeId::new(2, 1002), NodeId::new(2, 1003))
}

/// `Settings { Name: String, Limit?: Int32, Scale?: Double, Tags?: [String] }`
pub fn settings_definition() -> StructureDefinition {
    StructureDefinition::new(
        "Settings",
        NodeId::new(2, 1010),
        StructureType::StructureWithOptionalFields,
        vec![
            StructureField::builtin("Name", VariantTypeId::String),
            StructureField::builtin("Limit", VariantTypeId::Int32).optional(),
            StructureField::builtin("Scale", VariantTypeId::Double).optional(),
            StructureField::builtin("Tags", VariantTypeId::String).array().optional(),
        ],
    )
    .with_encoding_ids(NodeId::new(2, 1011), NodeId::new(2, 1012), NodeId::new(2, 1013))
}

/// `Reading = Count: UInt32 | Label: String | Origin: Point`
pub fn reading_definition() -> StructureDefinition {
    StructureDefinition::new(
        "Reading",
        NodeId::new(2, 1020),
        StructureType::Union,
        vec![
            StructureField::builtin("Count", VariantTypeId::UInt32),
            StructureField::builtin("Label", VariantTypeId::String),
            StructureField::new("Origin", FieldType::Structure(NodeId::new(2, 1000))),
        ],
    )
    .with_encoding_ids(NodeId::new(2, 1021), NodeId::new(2, 1022), NodeId::new(2, 1023))
}

/// A registry of its own holding the test types, so tests never touch the process wide one
pub fn test_registry() -> Arc<TypeRegistry> {
    let registry = TypeRegistry::with_standard_types();
    for definition in [point_definition(), settings_definition(), reading_definition()] {
        registry.register_type(Arc::new(StructureCodec::new(definition).unwrap()));
    }
    Arc::new(registry)
}

pub fn test_options() -> DecodingOptions {
    DecodingOptions::with_registry(test_registry())
}

pub fn point(x: f64, y: f64) -> DynamicStructure {
    DynamicStructure::new_struct(
        Arc::new(point_definition()),
        vec![Variant::Double(x), Variant::Double(y)],
    )
    .unwrap()
}
