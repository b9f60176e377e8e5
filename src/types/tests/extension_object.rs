use std::io::Cursor;
use std::sync::Arc;

use crate::types::{standard_types, tests::*, *};

fn decode_with(bytes: &[u8], decoding_options: &DecodingOptions) -> ExtensionObject {
    let mut stream = Cursor::new(bytes);
    let value = ExtensionObject::decode(&mut stream, decoding_options).unwrap();
    assert_eq!(stream.position() as usize, bytes.len());
    value
}

#[test]
fn extension_object_null() {
    serialize_and_compare(ExtensionObject::null(), &[0x00, 0x00, 0x00]);
    let value = serialize_test_and_return(ExtensionObject::null());
    assert!(value.is_null());
    assert!(value.is_empty());
}

#[test]
fn extension_object_invalid_encoding_byte() {
    decode_fails::<ExtensionObject>(
        &[0x00, 0x00, 0x03],
        &DecodingOptions::test(),
        StatusCode::BadDecodingError,
    );
}

#[test]
fn extension_object_decoded_body_bytes() {
    let value = ExtensionObject::from(point(1.0, 2.0));
    assert_eq!(value.node_id, NodeId::new(2, 1001));
    let mut expected = vec![0x01, 0x02, 0xE9, 0x03, 0x01, 0x10, 0x00, 0x00, 0x00];
    expected.extend_from_slice(&1.0f64.to_le_bytes());
    expected.extend_from_slice(&2.0f64.to_le_bytes());
    serialize_and_compare(value, &expected);
}

#[test]
fn extension_object_eager_decode() {
    let bytes = ExtensionObject::from(point(1.0, 2.0)).encode_to_vec();
    let value = decode_with(&bytes, &test_options());
    assert!(value.is_decoded());
    let structure = value.decoded_as::<DynamicStructure>().unwrap();
    assert_eq!(structure.get("X"), Some(&Variant::Double(1.0)));
    assert_eq!(structure.get("Y"), Some(&Variant::Double(2.0)));
    assert_eq!(value, ExtensionObject::from(point(1.0, 2.0)));
    assert_eq!(value.encode_to_vec(), bytes);
}

#[test]
fn extension_object_unknown_type_stays_raw() {
    let body = [0xDE, 0xAD, 0xBE, 0xEF];
    let value = ExtensionObject {
        node_id: NodeId::new(2, 1001),
        body: ExtensionObjectEncoding::ByteString(ByteString::from(&body)),
    };
    let bytes = value.encode_to_vec();

    // Nothing is registered so the body is carried as is and written back unchanged
    let decoding_options = DecodingOptions::with_registry(Arc::new(TypeRegistry::new()));
    let decoded = decode_with(&bytes, &decoding_options);
    assert_eq!(decoded, value);
    assert!(!decoded.is_decoded());
    assert_eq!(decoded.encode_to_vec(), bytes);

    assert!(decoded.decode_body(&decoding_options).unwrap().is_none());
    assert_eq!(
        decoded.resolve(&decoding_options).unwrap_err(),
        StatusCode::BadDataTypeIdUnknown
    );
}

#[test]
fn extension_object_deferred_decode() {
    let bytes = ExtensionObject::from(point(3.0, 4.0)).encode_to_vec();
    let decoding_options = DecodingOptions {
        decode_extension_objects: false,
        ..test_options()
    };
    let raw = decode_with(&bytes, &decoding_options);
    assert!(matches!(raw.body, ExtensionObjectEncoding::ByteString(_)));

    let resolved = raw.resolve(&test_options()).unwrap();
    assert!(resolved.is_decoded());
    assert_eq!(resolved, ExtensionObject::from(point(3.0, 4.0)));
}

#[test]
fn extension_object_null_body_of_known_type() {
    let bytes = [0x01, 0x02, 0xE9, 0x03, 0x01, 0xFF, 0xFF, 0xFF, 0xFF];

    // The container is well formed so the null body is kept even though the type is known
    let decoding_options = test_options();
    let value = decode_with(&bytes, &decoding_options);
    assert!(!value.is_decoded());
    assert_eq!(value.body, ExtensionObjectEncoding::ByteString(ByteString::null()));
    assert_eq!(value.encode_to_vec(), bytes);

    // Asking for the concrete value reports the problem
    assert_eq!(
        value.decode_body(&decoding_options).unwrap_err(),
        StatusCode::BadDecodingError
    );
    assert_eq!(
        value.resolve(&decoding_options).unwrap_err(),
        StatusCode::BadDecodingError
    );

    // Unknown, the null body is simply kept
    let decoding_options = DecodingOptions::with_registry(Arc::new(TypeRegistry::new()));
    let value = decode_with(&bytes, &decoding_options);
    assert_eq!(value.body, ExtensionObjectEncoding::ByteString(ByteString::null()));
}

#[test]
fn extension_object_short_body_of_known_type_stays_raw() {
    // A complete byte string that holds one double where a point needs two
    let mut bytes = vec![0x01, 0x02, 0xE9, 0x03, 0x01, 0x08, 0x00, 0x00, 0x00];
    bytes.extend_from_slice(&1.0f64.to_le_bytes());

    let decoding_options = test_options();
    let value = decode_with(&bytes, &decoding_options);
    assert!(!value.is_decoded());
    assert_eq!(
        value.body,
        ExtensionObjectEncoding::ByteString(ByteString::from(&1.0f64.to_le_bytes()))
    );
    assert!(decoding_options.failed_field().is_none());
    assert_eq!(decoding_options.decoding_depth_gauge.lock().current_depth(), 0);

    assert_eq!(
        value.resolve(&decoding_options).unwrap_err(),
        StatusCode::BadEndOfStream
    );
}

#[test]
fn variant_with_undecodable_standard_type_body() {
    // Range binary encoding id 886, null body
    let null_body = [0x16, 0x01, 0x00, 0x76, 0x03, 0x01, 0xFF, 0xFF, 0xFF, 0xFF];
    // Same id, a three byte body where a range needs sixteen
    let short_body = [
        0x16, 0x01, 0x00, 0x76, 0x03, 0x01, 0x03, 0x00, 0x00, 0x00, 0xAA, 0xBB, 0xCC,
    ];
    for bytes in [&null_body[..], &short_body[..]] {
        let decoding_options = DecodingOptions::default();
        let mut stream = Cursor::new(bytes);
        let value = Variant::decode(&mut stream, &decoding_options).unwrap();
        assert_eq!(stream.position() as usize, bytes.len());
        let Variant::ExtensionObject(eo) = value else {
            panic!("Expected an extension object, got {:?}", value);
        };
        assert_eq!(
            eo.node_id,
            NodeId::ns0(standard_types::ids::RANGE_ENCODING_DEFAULT_BINARY)
        );
        assert!(!eo.is_decoded());
        assert!(eo.resolve(&decoding_options).is_err());
        assert_eq!(eo.encode_to_vec(), &bytes[1..]);
    }

    // The facade accepts it too
    let decoded = crate::types::codec::decode(EncodingKind::Binary, &short_body, None, &DecodingOptions::default())
        .unwrap();
    assert_eq!(decoded.type_id(), VariantTypeId::ExtensionObject);
}

#[test]
fn extension_object_truncated_body() {
    // The body claims 16 bytes but only one double follows
    let mut bytes = vec![0x01, 0x02, 0xE9, 0x03, 0x01, 0x10, 0x00, 0x00, 0x00];
    bytes.extend_from_slice(&1.0f64.to_le_bytes());
    decode_fails::<ExtensionObject>(&bytes, &test_options(), StatusCode::BadEndOfStream);
}

#[test]
fn extension_object_standard_type() {
    let range = DynamicStructure::new_struct(
        Arc::new(standard_types::range()),
        vec![Variant::Double(0.0), Variant::Double(100.0)],
    )
    .unwrap();
    let value = ExtensionObject::from(range);
    assert_eq!(value.node_id, NodeId::ns0(standard_types::ids::RANGE_ENCODING_DEFAULT_BINARY));
    assert_eq!(value.data_type_id(), Some(NodeId::ns0(standard_types::ids::RANGE)));

    // The process wide registry knows the standard types
    let decoded = serialize_test_and_return(value);
    assert!(decoded.is_decoded());
}

#[test]
fn extension_object_data_type_of_raw_body() {
    let value = ExtensionObject {
        node_id: NodeId::ns0(standard_types::ids::EU_INFORMATION_ENCODING_DEFAULT_BINARY),
        body: ExtensionObjectEncoding::ByteString(ByteString::from(&[0u8])),
    };
    assert_eq!(
        value.data_type_id(),
        Some(NodeId::ns0(standard_types::ids::EU_INFORMATION))
    );
    let value = ExtensionObject {
        node_id: NodeId::new(9, 9u32),
        body: ExtensionObjectEncoding::None,
    };
    assert!(value.data_type_id().is_none());
}

#[test]
fn extension_object_data_type_in_private_registry() {
    let bytes = ExtensionObject::from(point(1.0, 2.0)).encode_to_vec();
    let decoding_options = DecodingOptions {
        decode_extension_objects: false,
        ..test_options()
    };
    let value = decode_with(&bytes, &decoding_options);
    assert!(!value.is_decoded());

    // Only the registry the object was read with knows the point
    let registry = &decoding_options.type_registry;
    assert_eq!(value.data_type_id_in(registry), Some(NodeId::new(2, 1000)));
    assert!(value.data_type_id().is_none());

    let variant = Variant::from(value);
    assert_eq!(variant.data_type_id_in(registry), NodeId::new(2, 1000));
    assert_eq!(variant.data_type_id(), NodeId::ns0(22));
}

#[test]
fn extension_object_decode_inner() {
    let value = ExtensionObject::from_encodable(NodeId::new(2, 5000u32), &LocalizedText::new("en", "Hi"));
    let inner = value
        .decode_inner::<LocalizedText>(&DecodingOptions::test())
        .unwrap();
    assert_eq!(inner, LocalizedText::new("en", "Hi"));
}

#[test]
fn extension_object_json_body_cannot_be_binary() {
    let value = ExtensionObject {
        node_id: NodeId::new(2, 1003),
        body: ExtensionObjectEncoding::Json(serde_json::json!({"X": 1.0})),
    };
    let mut buffer = Vec::new();
    assert_eq!(value.encode(&mut buffer).unwrap_err(), StatusCode::BadEncodingError);
}

#[test]
fn extension_object_in_variant() {
    let bytes = Variant::from(point(5.0, 6.0)).encode_to_vec();
    assert_eq!(bytes[0], 0x16);
    let mut stream = Cursor::new(bytes);
    let value = Variant::decode(&mut stream, &test_options()).unwrap();
    assert_eq!(value, Variant::from(point(5.0, 6.0)));
    assert_eq!(value.data_type_id(), NodeId::new(2, 1000));
}
