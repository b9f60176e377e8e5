use std::sync::Arc;

use crate::types::{
    codec,
    error::{CodecError, ErrorKind},
    tests::*,
    type_registry::EncodingKind,
    *,
};

const ALL_KINDS: [EncodingKind; 3] = [EncodingKind::Binary, EncodingKind::Xml, EncodingKind::Json];

fn round_trip(kind: EncodingKind, value: Variant) {
    let decoding_options = test_options();
    let bytes = codec::encode(kind, &value).unwrap();
    println!("{} = {}", kind, String::from_utf8_lossy(&bytes));
    let decoded = codec::decode(kind, &bytes, None, &decoding_options).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn variants_round_trip_in_every_encoding() {
    for kind in ALL_KINDS {
        round_trip(kind, Variant::Int32(-42));
        round_trip(kind, Variant::from("hello"));
        round_trip(kind, Variant::from(vec![1u16, 2, 3]));
        round_trip(kind, Variant::from(point(1.5, -2.0)));
    }
}

#[test]
fn structure_bodies_decode_by_expected_type() {
    let value = point(3.0, 4.0);
    let expected = Variant::from(value.clone());
    for kind in ALL_KINDS {
        let bytes = codec::encode_structure(kind, &value).unwrap();
        let encoding_id = point_definition().encoding_id(kind).unwrap();
        let decoded = codec::decode(kind, &bytes, Some(&encoding_id), &test_options()).unwrap();
        assert_eq!(decoded, expected);

        // The data type id finds the same codec
        let decoded = codec::decode(kind, &bytes, Some(&NodeId::new(2, 1000)), &test_options()).unwrap();
        assert_eq!(decoded, expected);
    }
}

#[test]
fn binary_structure_body_has_no_framing() {
    let bytes = codec::encode_structure(EncodingKind::Binary, &point(1.0, 1.0)).unwrap();
    assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0xF0, 0x3F, 0, 0, 0, 0, 0, 0, 0xF0, 0x3F]);
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut bytes = codec::encode(EncodingKind::Binary, &Variant::Int32(7)).unwrap();
    bytes.push(0xAA);
    let err = codec::decode(EncodingKind::Binary, &bytes, None, &test_options()).unwrap_err();
    assert_eq!(err.status, StatusCode::BadDecodingError);
    assert_eq!(err.kind, ErrorKind::MalformedEncoding);
    assert_eq!(err.offset, Some(5));
}

#[test]
fn oversized_input_is_rejected_before_decoding() {
    let decoding_options = DecodingOptions {
        max_message_size: 4,
        ..test_options()
    };
    let bytes = codec::encode(EncodingKind::Binary, &Variant::Int32(7)).unwrap();
    let err = codec::decode(EncodingKind::Binary, &bytes, None, &decoding_options).unwrap_err();
    assert_eq!(err.kind, ErrorKind::LimitExceeded);
    assert_eq!(err.offset, Some(0));
}

#[test]
fn unknown_expected_type() {
    let unknown = NodeId::new(2, 9999);
    for kind in ALL_KINDS {
        let err = codec::decode(kind, b"{}", Some(&unknown), &test_options()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownType, "{}", kind);
        assert_eq!(err.status, StatusCode::BadDataTypeIdUnknown);
    }
}

#[test]
fn truncated_binary_reports_field_and_offset() {
    let reading = DynamicStructure::new_union(
        Arc::new(reading_definition()),
        3,
        Variant::from(point(1.0, 2.0)),
    )
    .unwrap();
    let bytes = codec::encode_structure(EncodingKind::Binary, &reading).unwrap();
    let truncated = &bytes[..bytes.len() - 2];
    let err = codec::decode(
        EncodingKind::Binary,
        truncated,
        Some(&NodeId::new(2, 1021)),
        &test_options(),
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TruncatedInput);
    assert_eq!(err.field.as_deref(), Some("Origin.Y"));
    assert_eq!(err.offset, Some(truncated.len()));
}

#[test]
fn text_errors_report_field_without_offset() {
    let body = codec::encode_structure(EncodingKind::Xml, &point(1.5, 2.5)).unwrap();
    let body = String::from_utf8(body).unwrap();
    let broken = body.replace("2.5", "abc");
    assert_ne!(body, broken);
    let err = codec::decode(
        EncodingKind::Xml,
        broken.as_bytes(),
        Some(&NodeId::new(2, 1002)),
        &test_options(),
    )
    .unwrap_err();
    assert_eq!(err.field.as_deref(), Some("Y"));
    assert!(err.offset.is_none());

    let err = codec::decode(
        EncodingKind::Json,
        br#"{"X":1.5,"Y":true}"#,
        Some(&NodeId::new(2, 1003)),
        &test_options(),
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedEncoding);
    assert_eq!(err.field.as_deref(), Some("Y"));
    assert!(err.offset.is_none());
}

#[test]
fn malformed_text_input() {
    let err = codec::decode(EncodingKind::Xml, &[0x3C, 0xFF, 0xFE], None, &test_options()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedEncoding);

    let err = codec::decode(EncodingKind::Json, b"{\"Type\":", None, &test_options()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedEncoding);
}

#[test]
fn failed_decode_leaves_caller_options_untouched() {
    let decoding_options = test_options();
    let bytes = codec::encode_structure(EncodingKind::Binary, &point(1.0, 2.0)).unwrap();
    let _ = codec::decode(
        EncodingKind::Binary,
        &bytes[..10],
        Some(&NodeId::new(2, 1001)),
        &decoding_options,
    )
    .unwrap_err();
    assert!(decoding_options.failed_field().is_none());
    assert_eq!(decoding_options.decoding_depth_gauge.lock().current_depth(), 0);

    // The same options still decode good input
    let decoded = codec::decode(
        EncodingKind::Binary,
        &bytes,
        Some(&NodeId::new(2, 1001)),
        &decoding_options,
    )
    .unwrap();
    assert_eq!(decoded, Variant::from(point(1.0, 2.0)));
}

#[test]
fn json_body_cannot_be_written_as_binary() {
    let eo = ExtensionObject {
        node_id: NodeId::new(2, 1003),
        body: ExtensionObjectEncoding::Json(serde_json::json!({ "X": 1.0, "Y": 2.0 })),
    };
    let err = codec::encode(EncodingKind::Binary, &Variant::from(eo)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::EncodingFailure);
}

#[test]
fn register_type_with_process_wide_registry() {
    // Namespace 7 is used by no other test
    let definition = StructureDefinition::new(
        "Counter",
        NodeId::new(7, 100),
        StructureType::Structure,
        vec![StructureField::builtin("Value", VariantTypeId::UInt32)],
    )
    .with_encoding_ids(NodeId::new(7, 101), NodeId::new(7, 102), NodeId::new(7, 103));
    let codec_1: Arc<dyn TypeCodec> = Arc::new(StructureCodec::new(definition.clone()).unwrap());
    let codec_2: Arc<dyn TypeCodec> = Arc::new(StructureCodec::new(definition.clone()).unwrap());

    assert!(codec::register_type(NodeId::new(7, 101), EncodingKind::Binary, codec_1).is_none());
    assert!(codec::register_type(NodeId::new(7, 101), EncodingKind::Binary, codec_2).is_some());

    let counter = DynamicStructure::new_struct(Arc::new(definition), vec![Variant::UInt32(9)]).unwrap();
    let value = Variant::from(counter);
    let bytes = codec::encode(EncodingKind::Binary, &value).unwrap();
    let decoded = codec::decode(EncodingKind::Binary, &bytes, None, &DecodingOptions::default()).unwrap();
    assert_eq!(decoded, value);

    // Only the binary encoding was bound
    assert!(!TypeRegistry::global().contains(&NodeId::new(7, 102), EncodingKind::Xml));
}

#[test]
fn codec_error_display_without_location() {
    let err = CodecError::new(StatusCode::BadEndOfStream);
    assert_eq!(err.to_string(), "truncated input (BadEndOfStream)");
}
