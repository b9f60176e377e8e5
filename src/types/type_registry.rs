// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! The type registry maps encoding ids to the codecs that can decode them. It is how an
//! extension object whose type is only known at runtime gets turned into a concrete value.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    io::{Read, Write},
    sync::Arc,
};

use crate::{
    sync::RwLock,
    types::{
        encoding::{DecodingOptions, EncodingResult},
        node_id::NodeId,
        standard_types,
        xml::XmlWriter,
    },
};

/// The encodings a structure body can be carried in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingKind {
    Binary,
    Xml,
    Json,
}

impl fmt::Display for EncodingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingKind::Binary => write!(f, "binary"),
            EncodingKind::Xml => write!(f, "xml"),
            EncodingKind::Json => write!(f, "json"),
        }
    }
}

/// A decoded structure value whose concrete type is not known to the holder. This is what a
/// decoded extension object body is stored as.
pub trait DynEncodable: Any + Send + Sync + fmt::Debug {
    /// The node id of the data type
    fn data_type_id(&self) -> NodeId;

    /// The encoding id the body is tagged with for the supplied encoding
    fn encoding_id(&self, kind: EncodingKind) -> Option<NodeId>;

    /// Byte length of the binary encoding of the body
    fn byte_len_dyn(&self) -> usize;

    fn encode_binary(&self, stream: &mut dyn Write) -> EncodingResult<usize>;

    /// Writes the body as a single element, named after the type, holding the fields
    fn encode_xml(&self, writer: &mut XmlWriter) -> EncodingResult<()>;

    fn encode_json(&self) -> EncodingResult<serde_json::Value>;

    fn as_any(&self) -> &dyn Any;

    fn clone_box(&self) -> Box<dyn DynEncodable>;

    fn dyn_eq(&self, other: &dyn DynEncodable) -> bool;
}

impl Clone for Box<dyn DynEncodable> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for Box<dyn DynEncodable> {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other.as_ref())
    }
}

/// A codec knows how to decode the body of one data type from each encoding it supports.
pub trait TypeCodec: Send + Sync {
    /// The node id of the data type
    fn data_type_id(&self) -> NodeId;

    /// The encoding id for the encoding, or `None` if the type does not support it
    fn encoding_id(&self, kind: EncodingKind) -> Option<NodeId>;

    fn decode_binary(
        &self,
        stream: &mut dyn Read,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Box<dyn DynEncodable>>;

    /// Decodes the body from the element named after the type, whose children are the fields
    fn decode_xml(
        &self,
        node: roxmltree::Node,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Box<dyn DynEncodable>>;

    fn decode_json(
        &self,
        value: &serde_json::Value,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Box<dyn DynEncodable>>;
}

type CodecMap = HashMap<(NodeId, EncodingKind), Arc<dyn TypeCodec>>;

lazy_static! {
    static ref GLOBAL_REGISTRY: Arc<TypeRegistry> = {
        let registry = TypeRegistry::new();
        standard_types::register_standard_types(&registry);
        Arc::new(registry)
    };
}

/// Registry of codecs keyed by encoding id and encoding kind. Registrations are never removed
/// and the last registration for a key wins. Lookups of unknown ids are a normal outcome.
#[derive(Default)]
pub struct TypeRegistry {
    codecs: RwLock<CodecMap>,
    data_types: RwLock<HashMap<NodeId, Arc<dyn TypeCodec>>>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("codecs", &self.len())
            .finish()
    }
}

impl TypeRegistry {
    /// Creates an empty registry
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    /// Creates a registry holding the standard types, independent of the process wide one
    pub fn with_standard_types() -> TypeRegistry {
        let registry = TypeRegistry::new();
        standard_types::register_standard_types(&registry);
        registry
    }

    /// The process wide registry
    pub fn global() -> Arc<TypeRegistry> {
        GLOBAL_REGISTRY.clone()
    }

    /// Binds an encoding id to a codec, returning the codec that was previously bound to it.
    pub fn register(
        &self,
        encoding_id: NodeId,
        kind: EncodingKind,
        codec: Arc<dyn TypeCodec>,
    ) -> Option<Arc<dyn TypeCodec>> {
        debug!(
            "Registering {} encoding {} for data type {}",
            kind,
            encoding_id,
            codec.data_type_id()
        );
        {
            let mut data_types = trace_write_lock!(self.data_types);
            data_types.insert(codec.data_type_id(), codec.clone());
        }
        let mut codecs = trace_write_lock!(self.codecs);
        codecs.insert((encoding_id, kind), codec)
    }

    /// Registers the codec under every encoding id it reports
    pub fn register_type(&self, codec: Arc<dyn TypeCodec>) {
        for kind in [EncodingKind::Binary, EncodingKind::Xml, EncodingKind::Json] {
            if let Some(encoding_id) = codec.encoding_id(kind) {
                self.register(encoding_id, kind, codec.clone());
            }
        }
    }

    pub fn lookup(&self, encoding_id: &NodeId, kind: EncodingKind) -> Option<Arc<dyn TypeCodec>> {
        let codecs = trace_read_lock!(self.codecs);
        codecs.get(&(encoding_id.clone(), kind)).cloned()
    }

    /// Finds the codec of a data type by the data type's own id
    pub fn lookup_data_type(&self, data_type_id: &NodeId) -> Option<Arc<dyn TypeCodec>> {
        let data_types = trace_read_lock!(self.data_types);
        data_types.get(data_type_id).cloned()
    }

    pub fn contains(&self, encoding_id: &NodeId, kind: EncodingKind) -> bool {
        let codecs = trace_read_lock!(self.codecs);
        codecs.contains_key(&(encoding_id.clone(), kind))
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        trace_read_lock!(self.codecs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
