// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

#![no_main]
use libfuzzer_sys::fuzz_target;

use opcua_codec::types::*;
use std::io::Cursor;

pub fn deserialize(data: &[u8], decoding_options: &DecodingOptions) -> Result<Variant, StatusCode> {
    let mut stream = Cursor::new(data);
    Variant::decode(&mut stream, decoding_options)
}

fuzz_target!(|data: &[u8]| {
    opcua_codec::console_logging::init();
    let decoding_options = DecodingOptions::default();
    // Arbitrary input must decode to a variant or fail with an error, never panic
    if let Ok(value) = deserialize(data, &decoding_options) {
        // Whatever decodes must encode again
        let _ = codec::encode(EncodingKind::Binary, &value);
    }
});
