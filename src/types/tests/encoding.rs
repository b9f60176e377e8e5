use std::io::Cursor;
use std::str::FromStr;

use crate::types::{encoding::DecodingOptions, string::UAString, tests::*};

#[test]
fn encoding_bool() {
    serialize_test(true);
    serialize_test(false);
}

#[test]
fn encoding_sbyte() {
    serialize_test(0 as i8);
    serialize_test(100 as i8);
    serialize_test(-90 as i8);
}

#[test]
fn encoding_byte() {
    serialize_test(0 as u8);
    serialize_test(255 as u8);
    serialize_test(90 as u8);
}

#[test]
fn encoding_int16() {
    serialize_test(0 as i16);
    serialize_test(-17000 as i16);
    serialize_test(32000 as i16);
}

#[test]
fn encoding_uint16() {
    serialize_test(0 as u16);
    serialize_test(57000 as u16);
    serialize_test(32000 as u16);
}

#[test]
fn encoding_int32() {
    serialize_test(0 as i32);
    serialize_test(-17444000 as i32);
    serialize_test(32004440 as i32);
    serialize_and_compare(-2 as i32, &[0xFE, 0xFF, 0xFF, 0xFF]);
}

#[test]
fn encoding_uint32() {
    serialize_test(0 as u32);
    serialize_test(57055500 as u32);
    serialize_test(32555000 as u32);
}

#[test]
fn encoding_int64() {
    serialize_test(0 as i64);
    serialize_test(-17442224000 as i64);
    serialize_test(32022204440 as i64);
}

#[test]
fn encoding_uint64() {
    serialize_test(0 as u64);
    serialize_test(57054445500 as u64);
    serialize_test(34442555000 as u64);
}

#[test]
fn encoding_f32() {
    serialize_test(0 as f32);
    serialize_test(12.4342 as f32);
    serialize_test(5686.222 as f32);
}

#[test]
fn encoding_f64() {
    serialize_test(0 as f64);
    serialize_test(12.43424324234 as f64);
    serialize_test(5686.222342342 as f64);
    // IEEE 754 little endian
    serialize_and_compare(1.0 as f64, &[0, 0, 0, 0, 0, 0, 0xF0, 0x3F]);
}

#[test]
fn encoding_string() {
    // Null
    serialize_test(UAString::null());
    // UTF-8 strings
    serialize_test(UAString::from(""));
    serialize_test(UAString::from("ショッピング"));
    serialize_test(UAString::from("This is a test"));
}

#[test]
fn encoding_string_null_and_empty_differ() {
    serialize_and_compare(UAString::null(), &[0xFF, 0xFF, 0xFF, 0xFF]);
    serialize_and_compare(UAString::from(""), &[0x00, 0x00, 0x00, 0x00]);
}

#[test]
fn encode_string_part_6_5224() {
    // Sample from OPCUA Part 6 - 5.2.2.4
    let expected = [0x06, 0x00, 0x00, 0x00, 0xE6, 0xB0, 0xB4, 0x42, 0x6F, 0x79];
    let input = UAString::from("水Boy");
    serialize_and_compare(input, &expected);
}

#[test]
fn decode_string_malformed_utf8() {
    // Bytes below are a mangled 水Boy, missing a byte
    let bytes = [0x06, 0x00, 0x00, 0xE6, 0xB0, 0xB4, 0x42, 0x6F, 0x79];
    let mut stream = Cursor::new(bytes);
    let decoding_options = DecodingOptions::test();
    assert_eq!(
        UAString::decode(&mut stream, &decoding_options).unwrap_err(),
        StatusCode::BadDecodingError
    );
}

#[test]
fn decode_string_truncated() {
    // Declares 6 bytes but holds 3
    decode_fails::<UAString>(
        &[0x06, 0x00, 0x00, 0x00, 0x41, 0x42, 0x43],
        &DecodingOptions::test(),
        StatusCode::BadEndOfStream,
    );
}

#[test]
fn decode_string_negative_length() {
    decode_fails::<UAString>(
        &[0xFE, 0xFF, 0xFF, 0xFF],
        &DecodingOptions::test(),
        StatusCode::BadDecodingError,
    );
}

#[test]
fn decode_string_limit() {
    let decoding_options = DecodingOptions {
        max_string_length: 3,
        ..DecodingOptions::test()
    };
    let bytes = UAString::from("abcd").encode_to_vec();
    decode_fails::<UAString>(&bytes, &decoding_options, StatusCode::BadEncodingLimitsExceeded);

    // At the limit is fine
    let bytes = UAString::from("abc").encode_to_vec();
    let mut stream = Cursor::new(bytes);
    assert_eq!(
        UAString::decode(&mut stream, &decoding_options).unwrap(),
        UAString::from("abc")
    );
}

#[test]
fn decode_truncated_number() {
    decode_fails::<i32>(&[0x01, 0x02], &DecodingOptions::test(), StatusCode::BadEndOfStream);
    decode_fails::<f64>(&[], &DecodingOptions::test(), StatusCode::BadEndOfStream);
}

#[test]
fn encoding_datetime() {
    let now = DateTime::now();
    serialize_test(now);

    let epoch = DateTime::epoch();
    serialize_test(epoch);

    let endtimes = DateTime::endtimes();
    serialize_test(endtimes);
}

#[test]
fn encoding_guid() {
    let guid = Guid::from_str("F0001234-FACE-BEEF-0102-030405060708").unwrap();
    assert_eq!("f0001234-face-beef-0102-030405060708", format!("{:?}", guid));
    let new_guid = serialize_test_and_return(guid.clone());
    assert_eq!("f0001234-face-beef-0102-030405060708", format!("{:?}", new_guid));
    serialize_test(Guid::new());
}

#[test]
fn encoding_bytestring() {
    serialize_test(ByteString::null());
    serialize_test(ByteString::from(Vec::<u8>::new()));
    serialize_test(ByteString::from(&[0x01, 0x02, 0x03, 0x04]));
    serialize_and_compare(ByteString::from(&[0xAB]), &[0x01, 0x00, 0x00, 0x00, 0xAB]);
}

#[test]
fn decode_bytestring_limit() {
    let decoding_options = DecodingOptions {
        max_byte_string_length: 2,
        ..DecodingOptions::test()
    };
    let bytes = ByteString::from(&[1, 2, 3]).encode_to_vec();
    decode_fails::<ByteString>(&bytes, &decoding_options, StatusCode::BadEncodingLimitsExceeded);
}

#[test]
fn encoding_status_code() {
    serialize_test(StatusCode::Good);
    serialize_test(StatusCode::BadDecodingError);
    serialize_and_compare(StatusCode::BadDecodingError, &[0x00, 0x00, 0x07, 0x80]);
}

#[test]
fn encoding_qualified_name() {
    serialize_test(QualifiedName::null());
    serialize_test(QualifiedName::new(2, "Temperature"));
    serialize_and_compare(
        QualifiedName::new(1, "ab"),
        &[0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x61, 0x62],
    );
}

#[test]
fn encoding_localized_text() {
    serialize_test(LocalizedText::null());
    serialize_test(LocalizedText::new("en-US", "Hello"));
    serialize_test(LocalizedText::new("", "Only text"));
    // The mask says which of locale and text follow
    serialize_and_compare(
        LocalizedText::new("en", "Hi"),
        &[
            0x03, 0x02, 0x00, 0x00, 0x00, b'e', b'n', 0x02, 0x00, 0x00, 0x00, b'H', b'i',
        ],
    );
    serialize_and_compare(LocalizedText::null(), &[0x00]);
}

#[test]
fn encoding_data_value() {
    serialize_test(DataValue::null());
    serialize_and_compare(
        DataValue::value_only(5i32),
        &[0x01, 0x06, 0x05, 0x00, 0x00, 0x00],
    );

    let now = DateTime::now();
    let data_value = DataValue {
        value: Some(Variant::from("hello")),
        status: Some(StatusCode::BadDecodingError),
        source_timestamp: Some(now),
        source_picoseconds: Some(100),
        server_timestamp: Some(now),
        server_picoseconds: Some(200),
    };
    serialize_test(data_value);
}

#[test]
fn encoding_absent_and_empty_arrays() {
    // An absent array has length -1, an empty one has length 0
    let absent = Variant::from(Array::null(VariantTypeId::Int32));
    serialize_and_compare(absent.clone(), &[0x86, 0xFF, 0xFF, 0xFF, 0xFF]);
    serialize_test(absent);

    let empty = Variant::from(Array::new(VariantTypeId::Int32, Vec::<Variant>::new()).unwrap());
    serialize_and_compare(empty.clone(), &[0x86, 0x00, 0x00, 0x00, 0x00]);
    serialize_test(empty);
}

#[test]
fn decode_array_limit() {
    let decoding_options = DecodingOptions {
        max_array_length: 2,
        ..DecodingOptions::test()
    };
    let value = Variant::from(vec![1i32, 2, 3]);
    let bytes = value.encode_to_vec();
    decode_fails::<Variant>(&bytes, &decoding_options, StatusCode::BadEncodingLimitsExceeded);
}

#[test]
fn decode_array_length_is_checked_before_reading() {
    // A huge declared length fails on the limit, not on running out of input
    let bytes = [0x86, 0xFF, 0xFF, 0xFF, 0x7F];
    decode_fails::<Variant>(&bytes, &DecodingOptions::test(), StatusCode::BadEncodingLimitsExceeded);
}

#[test]
fn depth_gauge() {
    let decoding_options = DecodingOptions::test().with_max_depth(2);
    let gauge = decoding_options.decoding_depth_gauge.clone();
    {
        let _l1 = decoding_options.depth_lock().unwrap();
        assert_eq!(gauge.lock().current_depth(), 1);
        let _l2 = decoding_options.depth_lock().unwrap();
        assert_eq!(gauge.lock().current_depth(), 2);
        assert_eq!(
            decoding_options.depth_lock().unwrap_err(),
            StatusCode::BadEncodingLimitsExceeded
        );
        assert_eq!(gauge.lock().current_depth(), 2);
    }
    // Dropping the locks unwinds the gauge
    assert_eq!(gauge.lock().current_depth(), 0);
}

#[test]
fn per_call_options_do_not_share_state() {
    let decoding_options = DecodingOptions::test().with_max_depth(3);
    let _lock = decoding_options.depth_lock().unwrap();
    decoding_options.record_failed_field("Outer");

    let per_call = decoding_options.per_call();
    assert_eq!(per_call.max_depth(), 3);
    assert_eq!(per_call.decoding_depth_gauge.lock().current_depth(), 0);
    assert!(per_call.failed_field().is_none());
    assert_eq!(decoding_options.failed_field().unwrap(), "Outer");
}

#[test]
fn decode_trail_nests_outer_first() {
    let decoding_options = DecodingOptions::test();
    decoding_options.record_failed_field("Inner");
    decoding_options.record_failed_field("Outer");
    assert_eq!(decoding_options.failed_field().unwrap(), "Outer.Inner");
}
