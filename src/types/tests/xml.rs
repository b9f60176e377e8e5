use std::sync::Arc;

use crate::types::{tests::*, xml::*, *};

fn document(content: &str) -> String {
    format!(
        "<Variant xmlns=\"{}\">{}</Variant>",
        OPC_UA_TYPES_NAMESPACE, content
    )
}

fn round_trip(value: Variant) -> Variant {
    let encoded = encode_xml_variant(&value).unwrap();
    println!("xml = {}", encoded);
    let decoded = decode_xml_variant(&encoded, &test_options()).unwrap();
    assert_eq!(decoded, value);
    decoded
}

fn decode_err(xml: &str) -> StatusCode {
    decode_xml_variant(xml, &test_options()).unwrap_err()
}

#[test]
fn xml_scalar() {
    assert_eq!(
        encode_xml_variant(&Variant::Int32(5)).unwrap(),
        document("<Value><Int32>5</Int32></Value>")
    );
    assert_eq!(
        encode_xml_variant(&Variant::Boolean(false)).unwrap(),
        document("<Value><Boolean>false</Boolean></Value>")
    );
    round_trip(Variant::from(-3i8));
    round_trip(Variant::from(250u8));
    round_trip(Variant::from(i64::MAX));
    round_trip(Variant::from(u64::MAX));
    round_trip(Variant::from(0.25f32));
    round_trip(Variant::from(1e300f64));
    round_trip(Variant::from(ByteString::from(&[0, 1, 2, 254])));
    round_trip(Variant::from(DateTime::ymd_hms(2020, 2, 29, 23, 59, 58)));
}

#[test]
fn xml_empty_variant() {
    assert_eq!(encode_xml_variant(&Variant::Empty).unwrap(), document(""));
    assert_eq!(
        decode_xml_variant(&document(""), &test_options()).unwrap(),
        Variant::Empty
    );
}

#[test]
fn xml_string_escaping() {
    let value = Variant::from("a<b & \"c\"");
    assert_eq!(
        encode_xml_variant(&value).unwrap(),
        document("<Value><String>a&lt;b &amp; &quot;c&quot;</String></Value>")
    );
    round_trip(value);
    round_trip(Variant::from("ショッピング"));
}

#[test]
fn xml_float_specials() {
    assert_eq!(
        encode_xml_variant(&Variant::Double(f64::INFINITY)).unwrap(),
        document("<Value><Double>INF</Double></Value>")
    );
    assert_eq!(
        encode_xml_variant(&Variant::Float(f32::NEG_INFINITY)).unwrap(),
        document("<Value><Float>-INF</Float></Value>")
    );
    match decode_xml_variant(&document("<Value><Double>NaN</Double></Value>"), &test_options())
        .unwrap()
    {
        Variant::Double(v) => assert!(v.is_nan()),
        v => panic!("Unexpected value {:?}", v),
    }
}

#[test]
fn xml_wrapped_types() {
    let guid = Guid::new();
    assert_eq!(
        encode_xml_variant(&Variant::from(guid.clone())).unwrap(),
        document(&format!("<Value><Guid><String>{}</String></Guid></Value>", guid))
    );
    round_trip(Variant::from(guid));

    assert_eq!(
        encode_xml_variant(&Variant::from(StatusCode::BadDecodingError)).unwrap(),
        document("<Value><StatusCode><Code>2147942400</Code></StatusCode></Value>")
    );
    round_trip(Variant::from(StatusCode::Good));

    assert_eq!(
        encode_xml_variant(&Variant::from(NodeId::new(1, "x"))).unwrap(),
        document("<Value><NodeId><Identifier>ns=1;s=x</Identifier></NodeId></Value>")
    );
    round_trip(Variant::from(NodeId::new(0, 85u32)));
    round_trip(Variant::from(ExpandedNodeId::new(NodeId::new(2, 7u32))));

    assert_eq!(
        encode_xml_variant(&Variant::from(QualifiedName::new(2, "Q"))).unwrap(),
        document(
            "<Value><QualifiedName><NamespaceIndex>2</NamespaceIndex><Name>Q</Name></QualifiedName></Value>"
        )
    );
    round_trip(Variant::from(LocalizedText::new("de", "Hallo")));
    round_trip(Variant::from(LocalizedText::null()));
}

#[test]
fn xml_data_value_and_diagnostic_info() {
    let data_value = DataValue {
        value: Some(Variant::from("v")),
        status: Some(StatusCode::BadDecodingError),
        source_timestamp: Some(DateTime::ymd_hms(2024, 5, 6, 7, 8, 9)),
        source_picoseconds: Some(5),
        server_timestamp: Some(DateTime::ymd_hms(2024, 5, 6, 7, 8, 10)),
        server_picoseconds: None,
    };
    round_trip(Variant::from(data_value));

    let diagnostic_info = DiagnosticInfo {
        symbolic_id: Some(1),
        localized_text: Some(3),
        inner_status_code: Some(StatusCode::BadDecodingError),
        inner_diagnostic_info: Some(Box::new(DiagnosticInfo {
            additional_info: Some(UAString::from("inner")),
            ..DiagnosticInfo::null()
        })),
        ..DiagnosticInfo::null()
    };
    round_trip(Variant::from(diagnostic_info));
}

#[test]
fn xml_arrays() {
    assert_eq!(
        encode_xml_variant(&Variant::from(vec![1i32, 2])).unwrap(),
        document("<Value><ListOfInt32><Int32>1</Int32><Int32>2</Int32></ListOfInt32></Value>")
    );
    round_trip(Variant::from(vec![1.5f64, -2.5]));
    round_trip(Variant::from(vec!["a".to_string(), "b".to_string()]));

    // An empty array keeps its wrapper
    let empty = Variant::from(Array::new(VariantTypeId::UInt16, Vec::<Variant>::new()).unwrap());
    assert_eq!(
        encode_xml_variant(&empty).unwrap(),
        document("<Value><ListOfUInt16></ListOfUInt16></Value>")
    );
    round_trip(empty);
}

#[test]
fn xml_matrix() {
    let matrix = Array::new_multi(
        VariantTypeId::Int32,
        vec![Variant::Int32(1), Variant::Int32(2), Variant::Int32(3), Variant::Int32(4), Variant::Int32(5), Variant::Int32(6)],
        vec![3u32, 2],
    )
    .unwrap();
    let encoded = encode_xml_variant(&Variant::from(matrix.clone())).unwrap();
    assert!(encoded.contains(
        "<Matrix><Dimensions><Int32>3</Int32><Int32>2</Int32></Dimensions><Elements><Int32>1</Int32>"
    ));
    round_trip(Variant::from(matrix));

    assert_eq!(
        decode_err(&document(
            "<Value><Matrix><Dimensions><Int32>2</Int32><Int32>2</Int32></Dimensions><Elements><Int32>1</Int32></Elements></Matrix></Value>"
        )),
        StatusCode::BadDecodingError
    );
}

#[test]
fn xml_array_errors() {
    // Elements must match the list type
    assert_eq!(
        decode_err(&document("<Value><ListOfInt32><Int32>1</Int32><Double>2</Double></ListOfInt32></Value>")),
        StatusCode::BadDecodingError
    );
    assert_eq!(
        decode_err(&document("<Value><Unknown>1</Unknown></Value>")),
        StatusCode::BadDecodingError
    );
    let decoding_options = DecodingOptions {
        max_array_length: 1,
        ..test_options()
    };
    assert_eq!(
        decode_xml_variant(
            &document("<Value><ListOfInt32><Int32>1</Int32><Int32>2</Int32></ListOfInt32></Value>"),
            &decoding_options
        )
        .unwrap_err(),
        StatusCode::BadEncodingLimitsExceeded
    );
}

#[test]
fn xml_malformed() {
    assert_eq!(decode_err("<Variant><Value>"), StatusCode::BadDecodingError);
    assert_eq!(
        decode_err(&document("<Value><Int32>five</Int32></Value>")),
        StatusCode::BadDecodingError
    );
}

#[test]
fn xml_namespace_prefixes_are_ignored() {
    let xml = format!(
        "<ua:Variant xmlns:ua=\"{}\"><ua:Value><ua:Int32>5</ua:Int32></ua:Value></ua:Variant>",
        OPC_UA_TYPES_NAMESPACE
    );
    assert_eq!(
        decode_xml_variant(&xml, &test_options()).unwrap(),
        Variant::Int32(5)
    );
}

#[test]
fn xml_variant_in_variant() {
    let value = Variant::from(
        Array::new(
            VariantTypeId::Variant,
            vec![Variant::Variant(Box::new(Variant::from("x")))],
        )
        .unwrap(),
    );
    assert_eq!(
        encode_xml_variant(&value).unwrap(),
        document("<Value><ListOfVariant><Variant><Value><String>x</String></Value></Variant></ListOfVariant></Value>")
    );
    round_trip(value);
    assert_eq!(
        decode_err(&document("<Value><Variant><Value><Int32>1</Int32></Value></Variant></Value>")),
        StatusCode::BadDecodingError
    );
}

#[test]
fn xml_depth_limit() {
    let mut content = "<Value><Int32>1</Int32></Value>".to_string();
    for _ in 0..20 {
        content = format!("<Value><ListOfVariant><Variant>{}</Variant></ListOfVariant></Value>", content);
    }
    assert_eq!(decode_err(&document(&content)), StatusCode::BadEncodingLimitsExceeded);
}

#[test]
fn xml_extension_object() {
    let value = Variant::from(point(1.0, 2.5));
    assert_eq!(
        encode_xml_variant(&value).unwrap(),
        document(
            "<Value><ExtensionObject><TypeId><Identifier>ns=2;i=1002</Identifier></TypeId>\
             <Body><Point><X>1</X><Y>2.5</Y></Point></Body></ExtensionObject></Value>"
        )
    );
    round_trip(value);
}

#[test]
fn xml_extension_object_unknown_type() {
    let xml = document(
        "<Value><ExtensionObject><TypeId><Identifier>ns=5;i=7</Identifier></TypeId>\
         <Body><Foo><A>1</A></Foo></Body></ExtensionObject></Value>",
    );
    let decoded = decode_xml_variant(&xml, &test_options()).unwrap();
    match decoded {
        Variant::ExtensionObject(ref eo) => {
            assert_eq!(eo.node_id, NodeId::new(5, 7u32));
            assert_eq!(
                eo.body,
                ExtensionObjectEncoding::XmlElement(XmlElement::from("<Foo><A>1</A></Foo>"))
            );
        }
        ref v => panic!("Unexpected value {:?}", v),
    }
    // The body is written back as it came
    assert_eq!(encode_xml_variant(&decoded).unwrap(), xml);
}

#[test]
fn xml_extension_object_undecodable_body_stays_raw() {
    let xml = document(
        "<Value><ExtensionObject><TypeId><Identifier>ns=2;i=1002</Identifier></TypeId>\
         <Body><Point><X>abc</X><Y>2</Y></Point></Body></ExtensionObject></Value>",
    );
    let decoding_options = test_options();
    let decoded = decode_xml_variant(&xml, &decoding_options).unwrap();
    let Variant::ExtensionObject(ref eo) = decoded else {
        panic!("Unexpected value {:?}", decoded);
    };
    assert_eq!(
        eo.body,
        ExtensionObjectEncoding::XmlElement(XmlElement::from("<Point><X>abc</X><Y>2</Y></Point>"))
    );
    assert!(decoding_options.failed_field().is_none());
    assert_eq!(eo.resolve(&decoding_options).unwrap_err(), StatusCode::BadDecodingError);
}

#[test]
fn xml_extension_object_binary_body() {
    let eo = ExtensionObject {
        node_id: NodeId::new(5, 7u32),
        body: ExtensionObjectEncoding::ByteString(ByteString::from(&[1, 2, 3])),
    };
    let encoded = encode_xml_variant(&Variant::from(eo.clone())).unwrap();
    assert!(encoded.contains("<Body><ByteString>AQID</ByteString></Body>"));
    round_trip(Variant::from(eo));
    round_trip(Variant::from(ExtensionObject::null()));
}

#[test]
fn xml_structure() {
    let value = point(1.0, 2.5);
    let encoded = encode_xml_structure(&value).unwrap();
    assert_eq!(
        encoded,
        format!(
            "<Point xmlns=\"{}\"><X>1</X><Y>2.5</Y></Point>",
            OPC_UA_TYPES_NAMESPACE
        )
    );
    for type_id in [NodeId::new(2, 1002), NodeId::new(2, 1000)] {
        let decoded = decode_xml_structure(&encoded, &type_id, &test_options()).unwrap();
        assert_eq!(decoded.as_any().downcast_ref::<DynamicStructure>(), Some(&value));
    }
    assert_eq!(
        decode_xml_structure(&encoded, &NodeId::new(2, 9999), &test_options()).unwrap_err(),
        StatusCode::BadDataTypeIdUnknown
    );
}

#[test]
fn xml_structure_missing_and_bad_fields() {
    let decoded =
        decode_xml_structure("<Point><X>1</X></Point>", &NodeId::new(2, 1000), &test_options())
            .unwrap();
    assert_eq!(
        decoded.as_any().downcast_ref::<DynamicStructure>(),
        Some(&point(1.0, 0.0))
    );

    let decoding_options = test_options();
    assert_eq!(
        decode_xml_structure(
            "<Point><X>1</X><Y>abc</Y></Point>",
            &NodeId::new(2, 1000),
            &decoding_options
        )
        .unwrap_err(),
        StatusCode::BadDecodingError
    );
    assert_eq!(decoding_options.failed_field().unwrap(), "Y");
}

#[test]
fn xml_structure_optional_fields() {
    let definition = Arc::new(settings_definition());
    let value = DynamicStructure::new_struct(
        definition.clone(),
        vec![
            Variant::from("n"),
            Variant::Empty,
            Variant::Double(2.5),
            Variant::from(vec!["a".to_string(), "b".to_string()]),
        ],
    )
    .unwrap();
    let encoded = encode_xml_structure(&value).unwrap();
    assert_eq!(
        encoded,
        format!(
            "<Settings xmlns=\"{}\"><EncodingMask>6</EncodingMask><Name>n</Name><Scale>2.5</Scale>\
             <Tags><String>a</String><String>b</String></Tags></Settings>",
            OPC_UA_TYPES_NAMESPACE
        )
    );
    let decoded = decode_xml_structure(&encoded, &NodeId::new(2, 1012), &test_options()).unwrap();
    assert_eq!(decoded.as_any().downcast_ref::<DynamicStructure>(), Some(&value));

    // Without a mask the elements present decide
    let decoded = decode_xml_structure(
        "<Settings><Name>n</Name><Limit>4</Limit></Settings>",
        &NodeId::new(2, 1012),
        &test_options(),
    )
    .unwrap();
    let decoded = decoded.as_any().downcast_ref::<DynamicStructure>().unwrap();
    assert_eq!(decoded.encoding_mask(), 0b001);
    assert_eq!(decoded.get("Limit"), Some(&Variant::Int32(4)));
    assert_eq!(decoded.get("Scale"), Some(&Variant::Empty));

    assert_eq!(
        decode_xml_structure(
            "<Settings><EncodingMask>16</EncodingMask><Name>n</Name></Settings>",
            &NodeId::new(2, 1012),
            &test_options(),
        )
        .unwrap_err(),
        StatusCode::BadDecodingError
    );
}

#[test]
fn xml_union() {
    let definition = Arc::new(reading_definition());
    let value =
        DynamicStructure::new_union(definition, 3, Variant::from(point(1.0, 2.0))).unwrap();
    let encoded = encode_xml_structure(&value).unwrap();
    assert_eq!(
        encoded,
        format!(
            "<Reading xmlns=\"{}\"><SwitchField>3</SwitchField><Origin><Point><X>1</X><Y>2</Y></Point></Origin></Reading>",
            OPC_UA_TYPES_NAMESPACE
        )
    );
    let decoded = decode_xml_structure(&encoded, &NodeId::new(2, 1022), &test_options()).unwrap();
    assert_eq!(decoded.as_any().downcast_ref::<DynamicStructure>(), Some(&value));

    assert_eq!(
        decode_xml_structure(
            "<Reading><SwitchField>9</SwitchField></Reading>",
            &NodeId::new(2, 1022),
            &test_options(),
        )
        .unwrap_err(),
        StatusCode::BadDecodingError
    );
}

#[test]
fn xml_writer() {
    let mut writer = XmlWriter::new();
    writer.start_element("A");
    writer.text_element("B", "x & y").unwrap();
    writer.end_element().unwrap();
    assert!(writer.end_element().is_err());
    assert_eq!(writer.finish().unwrap(), "<A><B>x &amp; y</B></A>");

    let mut writer = XmlWriter::new();
    writer.start_element("A");
    assert_eq!(writer.finish().unwrap_err(), StatusCode::BadEncodingError);
}
