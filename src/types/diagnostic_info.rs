// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Contains the implementation of `DiagnosticInfo`.

use std::io::{Read, Write};

use crate::types::{constants, encoding::*, status_codes::StatusCode, string::UAString};

bitflags! {
    pub struct DiagnosticInfoMask: u8 {
        const HAS_SYMBOLIC_ID = 0x01;
        const HAS_NAMESPACE = 0x02;
        const HAS_LOCALIZED_TEXT = 0x04;
        const HAS_LOCALE = 0x08;
        const HAS_ADDITIONAL_INFO = 0x10;
        const HAS_INNER_STATUS_CODE = 0x20;
        const HAS_INNER_DIAGNOSTIC_INFO = 0x40;
    }
}

/// Diagnostic information. Every field is optional and the inner diagnostic info makes it a
/// recursive chain. Its length is bounded on both decode and encode, separately from the depth
/// of whatever the diagnostic info is nested in.
#[derive(PartialEq, Debug, Clone)]
pub struct DiagnosticInfo {
    /// A symbolic name for the status code.
    pub symbolic_id: Option<i32>,
    /// A namespace that qualifies the symbolic id.
    pub namespace_uri: Option<i32>,
    /// The locale used for the localized text.
    pub locale: Option<i32>,
    /// A human readable summary of the status code.
    pub localized_text: Option<i32>,
    /// Detailed application specific diagnostic information.
    pub additional_info: Option<UAString>,
    /// A status code provided by an underlying system.
    pub inner_status_code: Option<StatusCode>,
    /// Diagnostic info associated with the inner status code.
    pub inner_diagnostic_info: Option<Box<DiagnosticInfo>>,
}

impl BinaryEncoder<DiagnosticInfo> for DiagnosticInfo {
    fn byte_len(&self) -> usize {
        let mut size: usize = 1;
        if let Some(ref symbolic_id) = self.symbolic_id {
            size += symbolic_id.byte_len();
        }
        if let Some(ref namespace_uri) = self.namespace_uri {
            size += namespace_uri.byte_len()
        }
        if let Some(ref localized_text) = self.localized_text {
            size += localized_text.byte_len()
        }
        if let Some(ref locale) = self.locale {
            size += locale.byte_len()
        }
        if let Some(ref additional_info) = self.additional_info {
            size += additional_info.byte_len()
        }
        if let Some(ref inner_status_code) = self.inner_status_code {
            size += inner_status_code.byte_len()
        }
        if let Some(ref inner_diagnostic_info) = self.inner_diagnostic_info {
            size += inner_diagnostic_info.byte_len()
        }
        size
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        check_chain_depth(self.depth(), constants::MAX_DECODING_DEPTH)?;
        self.encode_unchecked(stream)
    }

    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        Self::decode_level(stream, decoding_options, 1)
    }
}

/// Fails when a chain of inner diagnostic infos is `level` deep and only `max_depth` levels are
/// allowed. The chain does not count against the shared depth gauge.
pub(crate) fn check_chain_depth(level: usize, max_depth: usize) -> EncodingResult<()> {
    if level > max_depth {
        error!(
            "Diagnostic info nests {} levels deep which exceeds the limit of {}",
            level, max_depth
        );
        Err(StatusCode::BadEncodingLimitsExceeded)
    } else {
        Ok(())
    }
}

impl Default for DiagnosticInfo {
    fn default() -> Self {
        DiagnosticInfo::null()
    }
}

impl DiagnosticInfo {
    pub fn null() -> DiagnosticInfo {
        DiagnosticInfo {
            symbolic_id: None,
            namespace_uri: None,
            locale: None,
            localized_text: None,
            additional_info: None,
            inner_status_code: None,
            inner_diagnostic_info: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.encoding_mask().is_empty()
    }

    /// Number of levels in the tree, counting this one
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self;
        while let Some(ref inner) = current.inner_diagnostic_info {
            depth += 1;
            current = inner;
        }
        depth
    }

    pub fn encoding_mask(&self) -> DiagnosticInfoMask {
        let mut encoding_mask = DiagnosticInfoMask::empty();
        if self.symbolic_id.is_some() {
            encoding_mask |= DiagnosticInfoMask::HAS_SYMBOLIC_ID;
        }
        if self.namespace_uri.is_some() {
            encoding_mask |= DiagnosticInfoMask::HAS_NAMESPACE;
        }
        if self.localized_text.is_some() {
            encoding_mask |= DiagnosticInfoMask::HAS_LOCALIZED_TEXT;
        }
        if self.locale.is_some() {
            encoding_mask |= DiagnosticInfoMask::HAS_LOCALE;
        }
        if self.additional_info.is_some() {
            encoding_mask |= DiagnosticInfoMask::HAS_ADDITIONAL_INFO;
        }
        if self.inner_status_code.is_some() {
            encoding_mask |= DiagnosticInfoMask::HAS_INNER_STATUS_CODE;
        }
        if self.inner_diagnostic_info.is_some() {
            encoding_mask |= DiagnosticInfoMask::HAS_INNER_DIAGNOSTIC_INFO;
        }
        encoding_mask
    }

    fn decode_level<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
        level: usize,
    ) -> EncodingResult<Self> {
        // Checked before the mask so an over deep tree reads nothing further
        check_chain_depth(level, decoding_options.max_depth())?;

        let encoding_mask =
            DiagnosticInfoMask::from_bits_truncate(u8::decode(stream, decoding_options)?);
        let mut diagnostic_info = DiagnosticInfo::default();

        if encoding_mask.contains(DiagnosticInfoMask::HAS_SYMBOLIC_ID) {
            diagnostic_info.symbolic_id = Some(i32::decode(stream, decoding_options)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_NAMESPACE) {
            diagnostic_info.namespace_uri = Some(i32::decode(stream, decoding_options)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_LOCALIZED_TEXT) {
            diagnostic_info.localized_text = Some(i32::decode(stream, decoding_options)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_LOCALE) {
            diagnostic_info.locale = Some(i32::decode(stream, decoding_options)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_ADDITIONAL_INFO) {
            diagnostic_info.additional_info = Some(UAString::decode(stream, decoding_options)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_INNER_STATUS_CODE) {
            diagnostic_info.inner_status_code = Some(StatusCode::decode(stream, decoding_options)?);
        }
        if encoding_mask.contains(DiagnosticInfoMask::HAS_INNER_DIAGNOSTIC_INFO) {
            diagnostic_info.inner_diagnostic_info = Some(Box::new(DiagnosticInfo::decode_level(
                stream,
                decoding_options,
                level + 1,
            )?));
        }
        Ok(diagnostic_info)
    }

    fn encode_unchecked<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        let mut size: usize = 0;
        size += write_u8(stream, self.encoding_mask().bits())?;
        if let Some(symbolic_id) = self.symbolic_id {
            size += write_i32(stream, symbolic_id)?;
        }
        if let Some(namespace_uri) = self.namespace_uri {
            size += write_i32(stream, namespace_uri)?;
        }
        if let Some(localized_text) = self.localized_text {
            size += write_i32(stream, localized_text)?;
        }
        if let Some(locale) = self.locale {
            size += write_i32(stream, locale)?;
        }
        if let Some(ref additional_info) = self.additional_info {
            size += additional_info.encode(stream)?;
        }
        if let Some(ref inner_status_code) = self.inner_status_code {
            size += inner_status_code.encode(stream)?;
        }
        if let Some(ref inner_diagnostic_info) = self.inner_diagnostic_info {
            size += inner_diagnostic_info.encode_unchecked(stream)?;
        }
        Ok(size)
    }
}
