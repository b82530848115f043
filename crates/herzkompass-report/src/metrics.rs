// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Font metrics for the two standard faces the report uses.
//!
//! The PDF viewer supplies Helvetica and Helvetica-Bold itself (base-14
//! fonts), so only the advance widths are needed here for line wrapping.
//! Widths are the AFM values in 1/1000 em. Characters outside the table
//! fall back to an average width; wrapping stays conservative either way.

/// Glyph advance widths for ASCII 0x20..=0x7E, Helvetica.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Glyph advance widths for ASCII 0x20..=0x7E, Helvetica-Bold.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for characters without a table entry.
const FALLBACK_WIDTH: u16 = 556;

/// One of the two report faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    /// Regular body text.
    Helvetica,
    /// Emphasis.
    HelveticaBold,
}

impl FontFamily {
    /// Advance width of one character in 1/1000 em.
    pub fn char_width(&self, c: char) -> u16 {
        let code = c as u32;
        if (0x20..=0x7E).contains(&code) {
            let table = match self {
                Self::Helvetica => &HELVETICA,
                Self::HelveticaBold => &HELVETICA_BOLD,
            };
            return table[(code - 0x20) as usize];
        }
        self.extended_width(c)
    }

    /// Width of a string at the given size, in points.
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| u32::from(self.char_width(c))).sum();
        f64::from(units) * size / 1000.0
    }

    // German and typographic characters the report copy actually uses.
    fn extended_width(&self, c: char) -> u16 {
        match self {
            Self::Helvetica => match c {
                'ä' | 'ö' | 'ü' | 'é' | 'è' | 'á' | 'à' => 556,
                'Ä' => 667,
                'Ö' => 778,
                'Ü' => 722,
                'ß' => 611,
                'ç' => 500,
                '\u{2018}' | '\u{2019}' | '\u{201A}' => 222,
                '\u{201C}' | '\u{201D}' | '\u{201E}' => 333,
                '\u{2013}' => 556,
                '\u{2014}' | '\u{2026}' => 1000,
                '€' => 556,
                '°' => 400,
                _ => FALLBACK_WIDTH,
            },
            Self::HelveticaBold => match c {
                'ä' | 'é' | 'è' | 'á' | 'à' => 556,
                'ö' | 'ü' => 611,
                'Ä' | 'Ü' => 722,
                'Ö' => 778,
                'ß' => 611,
                'ç' => 556,
                '\u{2018}' | '\u{2019}' | '\u{201A}' => 278,
                '\u{201C}' | '\u{201D}' | '\u{201E}' => 500,
                '\u{2013}' => 556,
                '\u{2014}' | '\u{2026}' => 1000,
                '€' => 556,
                '°' => 400,
                _ => FALLBACK_WIDTH,
            },
        }
    }
}
