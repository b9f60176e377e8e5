use std::io::Cursor;
use std::sync::Arc;

use crate::types::{tests::*, *};

fn encode(value: &DynamicStructure) -> Vec<u8> {
    let mut buffer = Vec::new();
    let size = value.encode_binary(&mut buffer).unwrap();
    assert_eq!(size, buffer.len());
    assert_eq!(value.byte_len(), buffer.len());
    buffer
}

fn decode(
    definition: StructureDefinition,
    bytes: &[u8],
    decoding_options: &DecodingOptions,
) -> EncodingResult<DynamicStructure> {
    let mut stream = Cursor::new(bytes);
    DynamicStructure::decode_binary(Arc::new(definition), &mut stream, decoding_options)
}

fn round_trip(definition: StructureDefinition, value: DynamicStructure) {
    let bytes = encode(&value);
    let decoded = decode(definition, &bytes, &test_options()).unwrap();
    assert_eq!(decoded, value);
}

fn settings(limit: Variant, scale: Variant, tags: Variant) -> DynamicStructure {
    DynamicStructure::new_struct(
        Arc::new(settings_definition()),
        vec![Variant::from("n"), limit, scale, tags],
    )
    .unwrap()
}

fn grid_definition() -> StructureDefinition {
    StructureDefinition::new(
        "Grid",
        NodeId::new(2, 1030),
        StructureType::Structure,
        vec![StructureField::builtin("Cells", VariantTypeId::Int32).matrix(2)],
    )
}

#[test]
fn structure_fields_in_order() {
    let value = point(1.0, -2.0);
    let mut expected = Vec::new();
    expected.extend_from_slice(&1.0f64.to_le_bytes());
    expected.extend_from_slice(&(-2.0f64).to_le_bytes());
    assert_eq!(encode(&value), expected);
    round_trip(point_definition(), value);
}

#[test]
fn structure_get_field() {
    let value = point(1.0, 2.0);
    assert_eq!(value.get("Y"), Some(&Variant::Double(2.0)));
    assert!(value.get("Z").is_none());
    assert_eq!(value.switch(), 0);
    assert_eq!(value.values().len(), 2);
}

#[test]
fn structure_optional_fields_mask() {
    let value = settings(Variant::Empty, Variant::Double(2.5), Variant::Empty);
    assert_eq!(value.encoding_mask(), 0b010);

    let mut expected = vec![0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, b'n'];
    expected.extend_from_slice(&2.5f64.to_le_bytes());
    assert_eq!(encode(&value), expected);
    round_trip(settings_definition(), value);
}

#[test]
fn structure_optional_fields_all_or_none() {
    let none = settings(Variant::Empty, Variant::Empty, Variant::Empty);
    assert_eq!(none.encoding_mask(), 0);
    assert_eq!(
        encode(&none),
        vec![0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, b'n']
    );
    round_trip(settings_definition(), none);

    let all = settings(
        Variant::Int32(10),
        Variant::Double(0.5),
        Variant::from(vec!["a".to_string(), "b".to_string()]),
    );
    assert_eq!(all.encoding_mask(), 0b111);
    round_trip(settings_definition(), all);
}

#[test]
fn structure_optional_array_absent_vs_empty() {
    // A present but empty array is not the same as an absent field
    let empty = settings(
        Variant::Empty,
        Variant::Empty,
        Variant::from(Array::new(VariantTypeId::String, Vec::<Variant>::new()).unwrap()),
    );
    assert_eq!(empty.encoding_mask(), 0b100);
    round_trip(settings_definition(), empty);

    let null = settings(
        Variant::Empty,
        Variant::Empty,
        Variant::from(Array::null(VariantTypeId::String)),
    );
    assert_eq!(null.encoding_mask(), 0b100);
    round_trip(settings_definition(), null);
}

#[test]
fn structure_unknown_mask_bits() {
    let bytes = [0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, b'n'];
    assert_eq!(
        decode(settings_definition(), &bytes, &test_options()).unwrap_err(),
        StatusCode::BadDecodingError
    );
}

#[test]
fn structure_union_arms() {
    let definition = Arc::new(reading_definition());

    let label = DynamicStructure::new_union(definition.clone(), 2, Variant::from("x")).unwrap();
    assert_eq!(label.switch(), 2);
    assert_eq!(label.get("Count"), Some(&Variant::Empty));
    assert_eq!(
        encode(&label),
        vec![0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, b'x']
    );
    round_trip(reading_definition(), label);

    let count = DynamicStructure::new_union(definition.clone(), 1, Variant::UInt32(7)).unwrap();
    round_trip(reading_definition(), count);

    let null = DynamicStructure::null_union(definition);
    assert_eq!(encode(&null), vec![0x00, 0x00, 0x00, 0x00]);
    round_trip(reading_definition(), null);
}

#[test]
fn structure_union_invalid_switch() {
    assert_eq!(
        decode(reading_definition(), &[0x04, 0x00, 0x00, 0x00], &test_options()).unwrap_err(),
        StatusCode::BadDecodingError
    );
}

#[test]
fn structure_union_construction() {
    let definition = Arc::new(reading_definition());
    assert!(DynamicStructure::new_union(definition.clone(), 0, Variant::UInt32(1)).is_err());
    assert!(DynamicStructure::new_union(definition.clone(), 4, Variant::UInt32(1)).is_err());
    // Arm 1 is a UInt32
    assert!(DynamicStructure::new_union(definition.clone(), 1, Variant::Int32(1)).is_err());
    assert!(DynamicStructure::new_struct(definition, vec![Variant::Empty; 3]).is_err());
}

#[test]
fn structure_nested_structure_is_inline() {
    let value = DynamicStructure::new_union(
        Arc::new(reading_definition()),
        3,
        Variant::from(point(1.0, 2.0)),
    )
    .unwrap();
    let mut expected = vec![0x03, 0x00, 0x00, 0x00];
    expected.extend_from_slice(&1.0f64.to_le_bytes());
    expected.extend_from_slice(&2.0f64.to_le_bytes());
    assert_eq!(encode(&value), expected);
    round_trip(reading_definition(), value);
}

#[test]
fn structure_nested_structure_unknown() {
    let mut bytes = vec![0x03, 0x00, 0x00, 0x00];
    bytes.extend_from_slice(&[0u8; 16]);
    let decoding_options = DecodingOptions::with_registry(Arc::new(TypeRegistry::new()));
    assert_eq!(
        decode(reading_definition(), &bytes, &decoding_options).unwrap_err(),
        StatusCode::BadDataTypeIdUnknown
    );
}

#[test]
fn structure_failed_field_is_recorded() {
    // Scale is flagged but only half of it is there
    let mut bytes = vec![0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, b'n'];
    bytes.extend_from_slice(&[0u8; 4]);
    let decoding_options = test_options();
    assert_eq!(
        decode(settings_definition(), &bytes, &decoding_options).unwrap_err(),
        StatusCode::BadEndOfStream
    );
    assert_eq!(decoding_options.failed_field().unwrap(), "Scale");
}

#[test]
fn structure_failed_nested_field_is_recorded() {
    let mut bytes = vec![0x03, 0x00, 0x00, 0x00];
    bytes.extend_from_slice(&1.0f64.to_le_bytes());
    let decoding_options = test_options();
    assert_eq!(
        decode(reading_definition(), &bytes, &decoding_options).unwrap_err(),
        StatusCode::BadEndOfStream
    );
    assert_eq!(decoding_options.failed_field().unwrap(), "Origin.Y");
}

#[test]
fn structure_construction_checks_values() {
    let definition = Arc::new(point_definition());
    // Wrong number of values
    assert!(DynamicStructure::new_struct(definition.clone(), vec![Variant::Double(1.0)]).is_err());
    // Wrong type
    assert!(DynamicStructure::new_struct(
        definition.clone(),
        vec![Variant::Double(1.0), Variant::Float(1.0)]
    )
    .is_err());
    // Mandatory fields cannot be absent
    assert!(
        DynamicStructure::new_struct(definition, vec![Variant::Double(1.0), Variant::Empty])
            .is_err()
    );
    let settings_definition = Arc::new(settings_definition());
    assert!(DynamicStructure::new_struct(
        settings_definition.clone(),
        vec![Variant::Empty, Variant::Empty, Variant::Empty, Variant::Empty]
    )
    .is_err());
    // An array where a scalar is expected
    assert!(DynamicStructure::new_struct(
        settings_definition,
        vec![
            Variant::from("n"),
            Variant::from(vec![1i32]),
            Variant::Empty,
            Variant::Empty
        ]
    )
    .is_err());
}

#[test]
fn structure_definition_validation() {
    assert!(point_definition().validate().is_ok());
    assert!(settings_definition().validate().is_ok());
    assert!(reading_definition().validate().is_ok());

    let duplicate = StructureDefinition::new(
        "Duplicate",
        NodeId::new(2, 1),
        StructureType::Structure,
        vec![
            StructureField::builtin("A", VariantTypeId::Int32),
            StructureField::builtin("A", VariantTypeId::Double),
        ],
    );
    assert_eq!(duplicate.validate().unwrap_err(), StatusCode::BadInvalidArgument);

    let optional_arm = StructureDefinition::new(
        "OptionalArm",
        NodeId::new(2, 2),
        StructureType::Union,
        vec![StructureField::builtin("A", VariantTypeId::Int32).optional()],
    );
    assert!(optional_arm.validate().is_err());

    let flat_matrix = StructureDefinition::new(
        "FlatMatrix",
        NodeId::new(2, 3),
        StructureType::Structure,
        vec![StructureField::builtin("A", VariantTypeId::Int32).matrix(1)],
    );
    assert!(flat_matrix.validate().is_err());

    let untyped = StructureDefinition::new(
        "Untyped",
        NodeId::new(2, 4),
        StructureType::Structure,
        vec![StructureField::builtin("A", VariantTypeId::Empty)],
    );
    assert!(untyped.validate().is_err());

    let too_many = StructureDefinition::new(
        "TooMany",
        NodeId::new(2, 5),
        StructureType::StructureWithOptionalFields,
        (0..33)
            .map(|i| StructureField::builtin(format!("F{}", i), VariantTypeId::Byte).optional())
            .collect(),
    );
    assert!(too_many.validate().is_err());
    assert!(StructureCodec::new(too_many).is_err());
}

#[test]
fn structure_matrix_field() {
    let cells = Array::new_multi(
        VariantTypeId::Int32,
        vec![Variant::Int32(1), Variant::Int32(2), Variant::Int32(3), Variant::Int32(4)],
        vec![2u32, 2],
    )
    .unwrap();
    let value =
        DynamicStructure::new_struct(Arc::new(grid_definition()), vec![Variant::from(cells)])
            .unwrap();
    let bytes = encode(&value);
    // Dimensions come first
    assert_eq!(
        &bytes[0..12],
        &[0x02, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]
    );
    assert_eq!(bytes.len(), 12 + 16);
    round_trip(grid_definition(), value);

    let null = DynamicStructure::new_struct(
        Arc::new(grid_definition()),
        vec![Variant::from(Array::null(VariantTypeId::Int32))],
    )
    .unwrap();
    assert_eq!(encode(&null), vec![0xFF, 0xFF, 0xFF, 0xFF]);
    round_trip(grid_definition(), null);
}

#[test]
fn structure_matrix_field_wrong_rank() {
    // One dimension for a two dimension field
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00];
    assert_eq!(
        decode(grid_definition(), &bytes, &test_options()).unwrap_err(),
        StatusCode::BadDecodingError
    );
}

#[test]
fn structure_flatten() {
    let point3 = StructureDefinition::new(
        "Point3",
        NodeId::new(2, 1040),
        StructureType::Structure,
        vec![StructureField::builtin("Z", VariantTypeId::Double)],
    )
    .flatten(&point_definition());
    let names: Vec<&str> = point3.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["X", "Y", "Z"]);
    assert_eq!(point3.base, Some(NodeId::new(2, 1000)));
    assert_eq!(point3.data_type_id, NodeId::new(2, 1040));

    let value = DynamicStructure::new_struct(
        Arc::new(point3.clone()),
        vec![Variant::Double(1.0), Variant::Double(2.0), Variant::Double(3.0)],
    )
    .unwrap();
    assert_eq!(encode(&value).len(), 24);
    round_trip(point3, value);
}

#[test]
fn structure_decode_depth() {
    let bytes = encode(&point(1.0, 2.0));
    let decoding_options = test_options().with_max_depth(1);
    assert!(decode(point_definition(), &bytes, &decoding_options).is_ok());

    // The union and the nested point each take a level
    let value = DynamicStructure::new_union(
        Arc::new(reading_definition()),
        3,
        Variant::from(point(1.0, 2.0)),
    )
    .unwrap();
    let bytes = encode(&value);
    assert_eq!(
        decode(reading_definition(), &bytes, &decoding_options).unwrap_err(),
        StatusCode::BadEncodingLimitsExceeded
    );
}

#[test]
fn definitions_load_from_yaml() {
    // Definitions can be kept in configuration files next to the codec limits
    let definition = settings_definition();
    let yaml = serde_yaml::to_string(&definition).unwrap();
    println!("{}", yaml);
    let loaded: StructureDefinition = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(loaded, definition);
    assert!(StructureCodec::new(loaded).is_ok());
}
