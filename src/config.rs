// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Configuration of the codec limits, loaded from and saved to YAML.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::result::Result;
use std::sync::Arc;

use crate::types::{
    constants,
    encoding::{DecodingOptions, DepthGauge},
    type_registry::TypeRegistry,
};
use crate::sync::Mutex;

/// A trait that handles the loading / saving and validity of configuration information.
pub trait Config: serde::Serialize {
    fn save(&self, path: &Path) -> Result<(), ()> {
        if !self.is_valid() {
            error!("Config isn't valid and won't be saved");
            return Err(());
        }
        let s = serde_yaml::to_string(&self).map_err(|err| {
            error!("Cannot serialize configuration, error reason: {}", err);
        })?;
        let mut f = File::create(path).map_err(|err| {
            error!(
                "Cannot create the path {} to save the config, error = {:?}",
                path.to_string_lossy(),
                err
            );
        })?;
        f.write_all(s.as_bytes()).map_err(|err| {
            error!("Could not save config - error = {:?}", err);
        })
    }

    fn load<A>(path: &Path) -> Result<A, ()>
    where
        for<'de> A: Config + serde::Deserialize<'de>,
    {
        if let Ok(mut f) = File::open(path) {
            let mut s = String::new();
            if f.read_to_string(&mut s).is_ok() {
                serde_yaml::from_str(&s).map_err(|err| {
                    error!(
                        "Cannot deserialize configuration from {}, error reason: {}",
                        path.to_string_lossy(),
                        err
                    );
                })
            } else {
                error!(
                    "Cannot read configuration file {} to string",
                    path.to_string_lossy()
                );
                Err(())
            }
        } else {
            error!("Cannot open configuration file {}", path.to_string_lossy());
            Err(())
        }
    }

    fn is_valid(&self) -> bool;
}

/// Limits applied when decoding, and whether extension objects are decoded as they are read.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Maximum size of a message in bytes. 0 means no limit.
    pub max_message_size: usize,
    /// Maximum length in bytes of a string
    pub max_string_length: usize,
    /// Maximum length in bytes of a byte string
    pub max_byte_string_length: usize,
    /// Maximum number of elements in an array
    pub max_array_length: usize,
    /// Maximum nesting of variants, extension objects, structures and diagnostic infos
    pub max_decoding_depth: usize,
    /// Decode extension objects of registered types while decoding the message that holds them
    #[serde(default = "CodecConfig::default_decode_extension_objects")]
    pub decode_extension_objects: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            max_message_size: constants::MAX_MESSAGE_SIZE,
            max_string_length: constants::MAX_STRING_LENGTH,
            max_byte_string_length: constants::MAX_BYTE_STRING_LENGTH,
            max_array_length: constants::MAX_ARRAY_LENGTH,
            max_decoding_depth: constants::MAX_DECODING_DEPTH,
            decode_extension_objects: true,
        }
    }
}

impl Config for CodecConfig {
    fn is_valid(&self) -> bool {
        let mut valid = true;
        if self.max_decoding_depth == 0 {
            error!("Max decoding depth must be at least 1");
            valid = false;
        }
        if self.max_message_size > 0 && self.max_string_length > self.max_message_size {
            warn!(
                "Max string length {} is larger than the max message size {}",
                self.max_string_length, self.max_message_size
            );
        }
        valid
    }
}

impl CodecConfig {
    fn default_decode_extension_objects() -> bool {
        true
    }

    /// Decoding options with these limits, resolving types against the process wide registry
    pub fn decoding_options(&self) -> DecodingOptions {
        self.decoding_options_with_registry(TypeRegistry::global())
    }

    /// Decoding options with these limits, resolving types against the supplied registry
    pub fn decoding_options_with_registry(&self, type_registry: Arc<TypeRegistry>) -> DecodingOptions {
        DecodingOptions {
            max_message_size: self.max_message_size,
            max_string_length: self.max_string_length,
            max_byte_string_length: self.max_byte_string_length,
            max_array_length: self.max_array_length,
            decode_extension_objects: self.decode_extension_objects,
            decoding_depth_gauge: Arc::new(Mutex::new(DepthGauge::new(self.max_decoding_depth))),
            type_registry,
            ..Default::default()
        }
    }
}
