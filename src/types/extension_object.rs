// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Contains the implementation of `ExtensionObject`.
//!
//! Decoding an extension object happens in two phases. The first always succeeds for well formed
//! input and leaves the body as the raw bytes, XML or JSON it was carried in. The second looks the
//! encoding id up in the type registry and, if a codec is found, turns the body into a concrete
//! value. A type that is not registered is not an error, the body simply stays raw.

use std::{
    any::Any,
    io::{Cursor, Read, Write},
};

use crate::types::{
    byte_string::ByteString,
    encoding::*,
    node_id::NodeId,
    status_codes::StatusCode,
    string::XmlElement,
    type_registry::{DynEncodable, EncodingKind, TypeRegistry},
};

/// Enumeration that holds the kinds of encoding that an ExtensionObject data may be encoded with.
#[derive(PartialEq, Debug, Clone)]
pub enum ExtensionObjectEncoding {
    /// For an extension object with nothing encoded with it
    None,
    /// For an extension object with data encoded in a ByteString
    ByteString(ByteString),
    /// For an extension object with data encoded in an XML string
    XmlElement(XmlElement),
    /// For an extension object whose body came from a JSON document
    Json(serde_json::Value),
    /// For an extension object whose body has been decoded into a concrete value
    Decoded(Box<dyn DynEncodable>),
}

/// An extension object holds a serialized object identified by its node id.
#[derive(PartialEq, Debug, Clone)]
pub struct ExtensionObject {
    pub node_id: NodeId,
    pub body: ExtensionObjectEncoding,
}

impl Default for ExtensionObject {
    fn default() -> Self {
        Self::null()
    }
}

impl BinaryEncoder<ExtensionObject> for ExtensionObject {
    fn byte_len(&self) -> usize {
        let mut size = self.binary_node_id().byte_len();
        size += match self.body {
            ExtensionObjectEncoding::None | ExtensionObjectEncoding::Json(_) => 1,
            ExtensionObjectEncoding::ByteString(ref value) => {
                // Encoding mask + data
                1 + value.byte_len()
            }
            ExtensionObjectEncoding::XmlElement(ref value) => {
                // Encoding mask + data
                1 + value.byte_len()
            }
            ExtensionObjectEncoding::Decoded(ref value) => 1 + 4 + value.byte_len_dyn(),
        };
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        let mut size = 0;
        size += self.binary_node_id().encode(stream)?;
        match self.body {
            ExtensionObjectEncoding::None => {
                size += write_u8(stream, 0x0)?;
            }
            ExtensionObjectEncoding::ByteString(ref value) => {
                // Encoding mask + data
                size += write_u8(stream, 0x1)?;
                size += value.encode(stream)?;
            }
            ExtensionObjectEncoding::XmlElement(ref value) => {
                // Encoding mask + data
                size += write_u8(stream, 0x2)?;
                size += value.encode(stream)?;
            }
            ExtensionObjectEncoding::Decoded(ref value) => {
                let mut body = Vec::with_capacity(value.byte_len_dyn());
                value.encode_binary(&mut body)?;
                size += write_u8(stream, 0x1)?;
                size += write_length_prefixed_bytes(stream, Some(&body))?;
            }
            ExtensionObjectEncoding::Json(_) => {
                error!(
                    "Extension object {} has a JSON body that must be resolved before binary encoding",
                    self.node_id
                );
                return Err(StatusCode::BadEncodingError);
            }
        }
        Ok(size)
    }

    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        // Extension object is depth checked to prevent deep recursion
        let _depth_lock = decoding_options.depth_lock()?;
        let node_id = NodeId::decode(stream, decoding_options)?;
        let encoding_type = u8::decode(stream, decoding_options)?;
        let body = match encoding_type {
            0x0 => ExtensionObjectEncoding::None,
            0x1 => {
                ExtensionObjectEncoding::ByteString(ByteString::decode(stream, decoding_options)?)
            }
            0x2 => {
                ExtensionObjectEncoding::XmlElement(XmlElement::decode(stream, decoding_options)?)
            }
            _ => {
                error!("Invalid encoding type {} in stream", encoding_type);
                return Err(StatusCode::BadDecodingError);
            }
        };
        let extension_object = ExtensionObject { node_id, body };
        extension_object.eager_resolve(decoding_options)
    }
}

impl ExtensionObject {
    /// Creates a null extension object, i.e. one with no value or payload
    pub fn null() -> ExtensionObject {
        ExtensionObject {
            node_id: NodeId::null(),
            body: ExtensionObjectEncoding::None,
        }
    }

    /// Tests for null node id.
    pub fn is_null(&self) -> bool {
        self.node_id.is_null()
    }

    /// Tests for empty body.
    pub fn is_empty(&self) -> bool {
        self.is_null() || matches!(self.body, ExtensionObjectEncoding::None)
    }

    /// Tests if the body has been decoded into a concrete value
    pub fn is_decoded(&self) -> bool {
        matches!(self.body, ExtensionObjectEncoding::Decoded(_))
    }

    /// Returns the data type held by the extension object. For a raw body the data type is found
    /// by looking the encoding id up in the process wide registry.
    pub fn data_type_id(&self) -> Option<NodeId> {
        self.data_type_id_in(&TypeRegistry::global())
    }

    /// As `data_type_id` but a raw body is looked up in the supplied registry, normally the one
    /// in the decoding options the object was read with.
    pub fn data_type_id_in(&self, registry: &TypeRegistry) -> Option<NodeId> {
        if let ExtensionObjectEncoding::Decoded(ref value) = self.body {
            return Some(value.data_type_id());
        }
        [EncodingKind::Binary, EncodingKind::Xml, EncodingKind::Json]
            .iter()
            .find_map(|kind| registry.lookup(&self.node_id, *kind))
            .map(|codec| codec.data_type_id())
    }

    /// Creates an extension object with the specified node id and the encodable object as its payload.
    /// The body is set to a byte string containing the encoded struct.
    pub fn from_encodable<N, T>(node_id: N, encodable: &T) -> ExtensionObject
    where
        N: Into<NodeId>,
        T: BinaryEncoder<T>,
    {
        ExtensionObject {
            node_id: node_id.into(),
            body: ExtensionObjectEncoding::ByteString(ByteString::from(encodable.encode_to_vec())),
        }
    }

    /// Creates an extension object holding an already decoded value. The node id is the binary
    /// encoding id of the value, or its data type id if it has none.
    pub fn from_dyn(value: Box<dyn DynEncodable>) -> ExtensionObject {
        let node_id = value
            .encoding_id(EncodingKind::Binary)
            .unwrap_or_else(|| value.data_type_id());
        ExtensionObject {
            node_id,
            body: ExtensionObjectEncoding::Decoded(value),
        }
    }

    /// Returns the decoded body as the concrete type, if it has been decoded into that type.
    pub fn decoded_as<T: Any>(&self) -> Option<&T> {
        match self.body {
            ExtensionObjectEncoding::Decoded(ref value) => value.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Looks the type up in the registry and decodes the body with it. `Ok(None)` means the type
    /// is not registered for the encoding the body is in, or there is no body at all.
    pub fn decode_body(
        &self,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Option<Box<dyn DynEncodable>>> {
        let registry = &decoding_options.type_registry;
        match self.body {
            ExtensionObjectEncoding::None => Ok(None),
            ExtensionObjectEncoding::Decoded(ref value) => Ok(Some(value.clone())),
            ExtensionObjectEncoding::ByteString(ref byte_string) => {
                let Some(codec) = registry.lookup(&self.node_id, EncodingKind::Binary) else {
                    return Ok(None);
                };
                let Some(ref value) = byte_string.value else {
                    error!("Extension object {} has a null body", self.node_id);
                    return Err(StatusCode::BadDecodingError);
                };
                let mut stream = Cursor::new(value.as_slice());
                let decoded = codec.decode_binary(&mut stream, decoding_options)?;
                if (stream.position() as usize) < value.len() {
                    debug!(
                        "Extension object {} body has {} unread bytes",
                        self.node_id,
                        value.len() - stream.position() as usize
                    );
                }
                Ok(Some(decoded))
            }
            ExtensionObjectEncoding::XmlElement(ref xml) => {
                let Some(codec) = registry.lookup(&self.node_id, EncodingKind::Xml) else {
                    return Ok(None);
                };
                let document = roxmltree::Document::parse(xml.as_ref()).map_err(|err| {
                    error!("Extension object {} has a malformed XML body, {}", self.node_id, err);
                    StatusCode::BadDecodingError
                })?;
                codec
                    .decode_xml(document.root_element(), decoding_options)
                    .map(Some)
            }
            ExtensionObjectEncoding::Json(ref value) => {
                let Some(codec) = registry.lookup(&self.node_id, EncodingKind::Json) else {
                    return Ok(None);
                };
                codec.decode_json(value, decoding_options).map(Some)
            }
        }
    }

    /// Decodes the body into a concrete value. Unlike `decode_body` it is an error if the type
    /// is not registered. The result is tagged with the binary encoding id whatever encoding the
    /// body arrived in.
    pub fn resolve(&self, decoding_options: &DecodingOptions) -> EncodingResult<ExtensionObject> {
        if let ExtensionObjectEncoding::None = self.body {
            return Ok(self.clone());
        }
        match self.decode_body(decoding_options)? {
            Some(value) => Ok(ExtensionObject::from_dyn(value)),
            None => {
                error!("No codec is registered for extension object {}", self.node_id);
                Err(StatusCode::BadDataTypeIdUnknown)
            }
        }
    }

    /// Runs the second phase straight away if the options ask for it. Unknown types, and bodies
    /// that do not decode as their registered type, stay raw. Calling `resolve` on such an
    /// object reports the failure.
    pub(crate) fn eager_resolve(
        self,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<ExtensionObject> {
        if !decoding_options.decode_extension_objects {
            return Ok(self);
        }
        match self.decode_body(decoding_options) {
            Ok(Some(value)) => Ok(ExtensionObject::from_dyn(value)),
            Ok(None) => Ok(self),
            Err(status_code) => {
                debug!(
                    "Extension object {} is kept undecoded, body failed with {}",
                    self.node_id, status_code
                );
                decoding_options.clear_failed_field();
                Ok(self)
            }
        }
    }

    /// Decodes the inner content of the extension object and returns it. The node id is ignored
    /// for decoding. The caller supplies the binary encoder impl that should be used to extract
    /// the data. Errors result in a decoding error.
    pub fn decode_inner<T>(&self, decoding_options: &DecodingOptions) -> EncodingResult<T>
    where
        T: BinaryEncoder<T>,
    {
        match self.body {
            ExtensionObjectEncoding::ByteString(ref byte_string) => {
                if let Some(ref value) = byte_string.value {
                    let mut stream = Cursor::new(value);
                    T::decode(&mut stream, decoding_options)
                } else {
                    Err(StatusCode::BadDecodingError)
                }
            }
            ExtensionObjectEncoding::Decoded(ref value) => {
                let mut buffer = Vec::with_capacity(value.byte_len_dyn());
                value.encode_binary(&mut buffer)?;
                T::decode(&mut Cursor::new(buffer), decoding_options)
            }
            _ => {
                error!("decode_inner called on an unsupported ExtensionObject type");
                Err(StatusCode::BadDecodingError)
            }
        }
    }

    /// The node id written in the binary encoding. A decoded body is tagged with its own binary
    /// encoding id.
    fn binary_node_id(&self) -> NodeId {
        match self.body {
            ExtensionObjectEncoding::Decoded(ref value) => value
                .encoding_id(EncodingKind::Binary)
                .unwrap_or_else(|| self.node_id.clone()),
            _ => self.node_id.clone(),
        }
    }
}
