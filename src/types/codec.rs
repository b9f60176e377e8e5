// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! The entry points most callers use. Each call picks an encoding, gets fresh per-call decoding
//! state and turns a failure into a `CodecError` that says where it happened.

use std::{io::Cursor, sync::Arc};

use crate::{
    debug,
    types::{
        encoding::{BinaryEncoder, DecodingOptions, EncodingResult},
        error::CodecError,
        extension_object::ExtensionObject,
        json,
        node_id::NodeId,
        status_codes::StatusCode,
        type_registry::{DynEncodable, EncodingKind, TypeCodec, TypeRegistry},
        variant::Variant,
        xml,
    },
};

/// Encodes a variant in the chosen encoding. XML and JSON are returned as UTF-8.
pub fn encode(kind: EncodingKind, value: &Variant) -> Result<Vec<u8>, CodecError> {
    let bytes = match kind {
        EncodingKind::Binary => {
            let mut stream = Cursor::new(Vec::with_capacity(value.byte_len()));
            value.encode(&mut stream)?;
            stream.into_inner()
        }
        EncodingKind::Xml => xml::encode_xml_variant(value)?.into_bytes(),
        EncodingKind::Json => to_json_bytes(&json::encode_json_variant(value)?)?,
    };
    Ok(bytes)
}

/// Encodes a structure body on its own, without the extension object around it.
pub fn encode_structure(kind: EncodingKind, value: &dyn DynEncodable) -> Result<Vec<u8>, CodecError> {
    let bytes = match kind {
        EncodingKind::Binary => {
            let mut bytes = Vec::with_capacity(value.byte_len_dyn());
            value.encode_binary(&mut bytes)?;
            bytes
        }
        EncodingKind::Xml => xml::encode_xml_structure(value)?.into_bytes(),
        EncodingKind::Json => to_json_bytes(&value.encode_json()?)?,
    };
    Ok(bytes)
}

fn to_json_bytes(value: &serde_json::Value) -> EncodingResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|err| {
        error!("Cannot write JSON document, {}", err);
        StatusCode::BadEncodingError
    })
}

/// Decodes a value from the input.
///
/// With no expected type the input is a variant. With one, the input is the body of a structure
/// of that type, found in the registry of the options by encoding id or data type id, and it is
/// returned as an extension object holding the decoded body.
///
/// The whole input must be consumed. The depth gauge and field trail of the options are not
/// shared with the caller, so concurrent calls with the same options do not interfere.
pub fn decode(
    kind: EncodingKind,
    bytes: &[u8],
    expected_type: Option<&NodeId>,
    decoding_options: &DecodingOptions,
) -> Result<Variant, CodecError> {
    let decoding_options = decoding_options.per_call();
    if decoding_options.max_message_size > 0 && bytes.len() > decoding_options.max_message_size {
        error!(
            "Input of {} bytes exceeds the message size limit {}",
            bytes.len(),
            decoding_options.max_message_size
        );
        return Err(CodecError::new(StatusCode::BadEncodingLimitsExceeded).with_offset(0));
    }
    let (result, offset) = match kind {
        EncodingKind::Binary => {
            let mut stream = Cursor::new(bytes);
            let result = decode_binary(&mut stream, expected_type, &decoding_options);
            (result, Some(stream.position() as usize))
        }
        EncodingKind::Xml => (decode_xml(bytes, expected_type, &decoding_options), None),
        EncodingKind::Json => (decode_json(bytes, expected_type, &decoding_options), None),
    };
    result.map_err(|status| {
        debug::log_buffer("Input of failed decode", bytes);
        let mut err = CodecError::new(status).with_field(decoding_options.failed_field());
        err.offset = offset;
        error!("Decoding {} input failed, {}", kind, err);
        err
    })
}

fn lookup_codec(
    type_id: &NodeId,
    kind: EncodingKind,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Arc<dyn TypeCodec>> {
    let registry = &decoding_options.type_registry;
    registry
        .lookup(type_id, kind)
        .or_else(|| registry.lookup_data_type(type_id))
        .ok_or_else(|| {
            error!("No codec is registered for {}", type_id);
            StatusCode::BadDataTypeIdUnknown
        })
}

fn decode_binary(
    stream: &mut Cursor<&[u8]>,
    expected_type: Option<&NodeId>,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    let value = match expected_type {
        None => Variant::decode(stream, decoding_options)?,
        Some(type_id) => {
            let codec = lookup_codec(type_id, EncodingKind::Binary, decoding_options)?;
            let body = codec.decode_binary(stream, decoding_options)?;
            Variant::from(ExtensionObject::from_dyn(body))
        }
    };
    let len = stream.get_ref().len() as u64;
    if stream.position() < len {
        error!(
            "Input has {} bytes left over after the value",
            len - stream.position()
        );
        return Err(StatusCode::BadDecodingError);
    }
    Ok(value)
}

fn decode_xml(
    bytes: &[u8],
    expected_type: Option<&NodeId>,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    let text = std::str::from_utf8(bytes).map_err(|err| {
        error!("XML input is not UTF-8, {}", err);
        StatusCode::BadDecodingError
    })?;
    match expected_type {
        None => xml::decode_xml_variant(text, decoding_options),
        Some(type_id) => {
            let body = xml::decode_xml_structure(text, type_id, decoding_options)?;
            Ok(Variant::from(ExtensionObject::from_dyn(body)))
        }
    }
}

fn decode_json(
    bytes: &[u8],
    expected_type: Option<&NodeId>,
    decoding_options: &DecodingOptions,
) -> EncodingResult<Variant> {
    let value = json::parse_document(bytes)?;
    match expected_type {
        None => json::decode_json_variant(&value, decoding_options),
        Some(type_id) => {
            let body = json::decode_json_structure(&value, type_id, decoding_options)?;
            Ok(Variant::from(ExtensionObject::from_dyn(body)))
        }
    }
}

/// Registers a codec with the process wide registry under an encoding id. Returns the codec that
/// was registered under the id before, if any.
pub fn register_type(
    type_id: NodeId,
    kind: EncodingKind,
    codec: Arc<dyn TypeCodec>,
) -> Option<Arc<dyn TypeCodec>> {
    TypeRegistry::global().register(type_id, kind, codec)
}

