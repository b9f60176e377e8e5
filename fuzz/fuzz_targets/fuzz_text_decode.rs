// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

#![no_main]
use libfuzzer_sys::fuzz_target;

use opcua_codec::types::*;

fuzz_target!(|data: &[u8]| {
    opcua_codec::console_logging::init();
    let decoding_options = DecodingOptions::default();
    let _ = codec::decode(EncodingKind::Xml, data, None, &decoding_options);
    let _ = codec::decode(EncodingKind::Json, data, None, &decoding_options);
});
