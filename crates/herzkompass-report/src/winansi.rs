// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! WinAnsi (CP1252) string encoding.
//!
//! The report declares its fonts with `WinAnsiEncoding`, so text operands
//! must be single-byte CP1252. Latin-1 maps through directly; the 0x80-0x9F
//! range holds the typographic punctuation the German copy uses. Anything
//! unmappable becomes `?` rather than failing the render.

/// Encode one character, if representable.
pub fn encode_char(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        // ASCII and Latin-1 map 1:1, minus the C1 control block.
        0x20..=0x7E => Some(code as u8),
        0xA0..=0xFF => Some(code as u8),
        _ => match c {
            '€' => Some(0x80),
            '\u{201A}' => Some(0x82),
            '\u{201E}' => Some(0x84),
            '\u{2026}' => Some(0x85),
            '\u{2018}' => Some(0x91),
            '\u{2019}' => Some(0x92),
            '\u{201C}' => Some(0x93),
            '\u{201D}' => Some(0x94),
            '\u{2013}' => Some(0x96),
            '\u{2014}' => Some(0x97),
            '\u{0160}' => Some(0x8A),
            '\u{0161}' => Some(0x9A),
            '\u{017D}' => Some(0x8E),
            '\u{017E}' => Some(0x9E),
            '\u{0152}' => Some(0x8C),
            '\u{0153}' => Some(0x9C),
            '\u{0178}' => Some(0x9F),
            _ => None,
        },
    }
}

/// Encode a string, replacing unmappable characters with `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars().map(|c| encode_char(c).unwrap_or(b'?')).collect()
}
