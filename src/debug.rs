// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Debugging helpers for looking at encoded payloads.

/// Writes the slice out as hex and printable characters to the `hex` log target at trace level.
/// The codec calls this with the input of a decode that failed.
pub fn log_buffer(message: &str, buf: &[u8]) {
    if !log_enabled!(target: "hex", log::Level::Trace) {
        return;
    }
    for line in hex_dump(buf) {
        trace!(target: "hex", "{}: {}", message, line);
    }
}

/// Formats the buffer as lines of 16 bytes, each line holding the offset, the hex values and
/// the printable characters.
pub fn hex_dump(buf: &[u8]) -> Vec<String> {
    const LINE_LEN: usize = 16;
    buf.chunks(LINE_LEN)
        .enumerate()
        .map(|(line, chunk)| {
            let hex = chunk
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(" ");
            let chars: String = chunk
                .iter()
                .map(|b| if (32..=126).contains(b) { *b as char } else { '.' })
                .collect();
            format!(
                "{:08x}: {:<width$} {}",
                line * LINE_LEN,
                hex,
                chars,
                width = LINE_LEN * 3 - 1
            )
        })
        .collect()
}

#[test]
fn hex_dump_lines() {
    let buf: Vec<u8> = (0u8..20).chain(b"AB".iter().copied()).collect();
    let lines = hex_dump(&buf);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("00000000: 00 01 02"));
    assert!(lines[1].starts_with("00000010: 10 11 12 13 41 42"));
    assert!(lines[1].ends_with("....AB"));
}
