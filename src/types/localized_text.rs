// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! `LocalizedText`, a text with an optional locale.

use std::{
    fmt,
    io::{Read, Write},
};

use crate::types::{encoding::*, string::*};

const LOCALE_FLAG: u8 = 0x1;
const TEXT_FLAG: u8 = 0x2;

/// Either part may be null. A null part is left out of the binary form and its mask bit is clear.
#[derive(PartialEq, Default, Debug, Clone)]
pub struct LocalizedText {
    pub locale: UAString,
    pub text: UAString,
}

impl LocalizedText {
    pub fn new(locale: &str, text: &str) -> LocalizedText {
        LocalizedText {
            locale: UAString::from(locale),
            text: UAString::from(text),
        }
    }

    pub fn null() -> LocalizedText {
        LocalizedText::default()
    }

    fn encoding_mask(&self) -> u8 {
        let locale = if self.locale.is_null() { 0 } else { LOCALE_FLAG };
        let text = if self.text.is_null() { 0 } else { TEXT_FLAG };
        locale | text
    }

    /// The parts that are written, in order
    fn present_parts(&self) -> impl Iterator<Item = &UAString> {
        [&self.locale, &self.text].into_iter().filter(|s| !s.is_null())
    }
}

/// Text with no locale
impl<'a> From<&'a str> for LocalizedText {
    fn from(value: &'a str) -> Self {
        LocalizedText {
            locale: UAString::null(),
            text: UAString::from(value),
        }
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl BinaryEncoder<LocalizedText> for LocalizedText {
    fn byte_len(&self) -> usize {
        1 + self.present_parts().map(|s| s.byte_len()).sum::<usize>()
    }

    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> EncodingResult<usize> {
        let mut size = self.encoding_mask().encode(stream)?;
        for part in self.present_parts() {
            size += part.encode(stream)?;
        }
        Ok(size)
    }

    fn decode<S: Read + ?Sized>(
        stream: &mut S,
        decoding_options: &DecodingOptions,
    ) -> EncodingResult<Self> {
        let encoding_mask = u8::decode(stream, decoding_options)?;
        let mut read_part = |flag: u8| {
            if encoding_mask & flag != 0 {
                UAString::decode(stream, decoding_options)
            } else {
                Ok(UAString::null())
            }
        };
        let locale = read_part(LOCALE_FLAG)?;
        let text = read_part(TEXT_FLAG)?;
        Ok(LocalizedText { locale, text })
    }
}
