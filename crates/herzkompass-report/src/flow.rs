// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Box-flow text layout.
//!
//! Pure geometry: greedy word wrap against measured widths, line placement
//! inside a rectangle, and overflow into the next box of the chain. Text
//! that exhausts the whole chain is truncated at a line boundary; the
//! remainder is reported to the caller for logging but never rendered.
//! No PDF types appear here, so all of it is unit-testable.

use crate::layout::LayoutBox;
use crate::metrics::FontFamily;

/// A line placed at an absolute page position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    /// Line text.
    pub text: String,
    /// Baseline x.
    pub x: f64,
    /// Baseline y.
    pub y: f64,
}

/// All lines one box of the chain received.
#[derive(Debug, Clone)]
pub struct BoxFill {
    /// Zero-based page index.
    pub page: usize,
    /// Font size in points.
    pub size: f64,
    /// Bold face.
    pub bold: bool,
    /// Placed lines, top to bottom.
    pub lines: Vec<PlacedLine>,
}

/// Result of flowing one paragraph through its chain.
#[derive(Debug, Clone, Default)]
pub struct FlowResult {
    /// Fills in chain order; boxes that received no line are omitted.
    pub fills: Vec<BoxFill>,
    /// Text that did not fit anywhere, at a line boundary.
    pub truncated: Option<String>,
}

/// Line advance for a font size. Small sizes still get a readable leading.
pub fn line_height(size: f64) -> f64 {
    (size + 2.0).max(14.0)
}

/// Greedy word wrap.
///
/// A word longer than `max_width` gets a line of its own and may overhang;
/// words are never split.
pub fn wrap_words(font: FontFamily, size: f64, text: &str, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let test = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if font.text_width(&test, size) > max_width && !line.is_empty() {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = test;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }

    lines
}

/// Flow a paragraph through its overflow chain.
///
/// Each box wraps the remaining text against its own width and size, takes
/// as many lines as its height allows, and passes the rest on. Lines are
/// placed from the top edge of the box downward.
pub fn flow_into_chain(chain: &[&LayoutBox], text: &str) -> FlowResult {
    let mut result = FlowResult::default();
    let mut rest = text.trim().to_string();

    for bx in chain {
        if rest.is_empty() {
            break;
        }

        let font = if bx.bold {
            FontFamily::HelveticaBold
        } else {
            FontFamily::Helvetica
        };
        let line_h = line_height(bx.size);
        let capacity = (bx.rect.h / line_h).floor() as usize;

        let lines = wrap_words(font, bx.size, &rest, bx.rect.w);
        let used = lines.len().min(capacity);

        let placed: Vec<PlacedLine> = lines[..used]
            .iter()
            .enumerate()
            .map(|(i, line)| PlacedLine {
                text: line.clone(),
                x: bx.rect.x,
                y: bx.rect.y + bx.rect.h - (i as f64 + 1.0) * line_h + 2.0,
            })
            .collect();

        rest = lines[used..].join(" ");

        if !placed.is_empty() {
            result.fills.push(BoxFill {
                page: bx.page,
                size: bx.size,
                bold: bx.bold,
                lines: placed,
            });
        }
    }

    if !rest.is_empty() {
        result.truncated = Some(rest);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockKey;
    use crate::layout::Rect;

    fn test_box(page: usize, rect: Rect, size: f64) -> LayoutBox {
        LayoutBox {
            key: BlockKey::Analyse1,
            page,
            rect,
            size,
            bold: false,
        }
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect { x, y, w, h }
    }

    #[test]
    fn test_wrap_keeps_words_intact() {
        let lines = wrap_words(
            FontFamily::Helvetica,
            11.0,
            "Echtheit schlägt Taktik in jedem Gespräch",
            120.0,
        );
        assert!(lines.len() > 1);
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, "Echtheit schlägt Taktik in jedem Gespräch");
        for line in &lines {
            assert!(!line.starts_with(' ') && !line.ends_with(' '));
        }
    }

    #[test]
    fn test_wrap_lines_respect_width() {
        let max = 150.0;
        let lines = wrap_words(
            FontFamily::Helvetica,
            11.0,
            "klare Worte kleine Gesten und Verbindlichkeit helfen dir am meisten",
            max,
        );
        for line in &lines {
            // A line may only exceed the width if it is a single word.
            if line.contains(' ') {
                assert!(FontFamily::Helvetica.text_width(line, 11.0) <= max);
            }
        }
    }

    #[test]
    fn test_oversized_word_gets_own_line() {
        let lines = wrap_words(
            FontFamily::Helvetica,
            11.0,
            "ein Donaudampfschifffahrtsgesellschaftskapitän kam",
            80.0,
        );
        assert_eq!(
            lines,
            vec![
                "ein".to_string(),
                "Donaudampfschifffahrtsgesellschaftskapitän".to_string(),
                "kam".to_string()
            ]
        );
    }

    #[test]
    fn test_line_height_floor() {
        assert_eq!(line_height(11.0), 14.0);
        assert_eq!(line_height(12.0), 14.0);
        assert_eq!(line_height(16.0), 18.0);
    }

    #[test]
    fn test_lines_place_from_top_edge() {
        let bx = test_box(0, rect(50.0, 600.0, 495.0, 120.0), 11.0);
        let result = flow_into_chain(&[&bx], "kurzer Text");

        assert_eq!(result.fills.len(), 1);
        let line = &result.fills[0].lines[0];
        assert_eq!(line.x, 50.0);
        // y = rect.y + rect.h - 1 * line_height + 2
        assert_eq!(line.y, 600.0 + 120.0 - 14.0 + 2.0);
        assert!(result.truncated.is_none());
    }

    #[test]
    fn test_overflow_continues_in_next_box() {
        let first = test_box(0, rect(50.0, 700.0, 200.0, 28.0), 11.0); // 2 lines
        let second = test_box(0, rect(50.0, 400.0, 200.0, 140.0), 11.0);
        let text = "Dieses Bedürfnis ist ein verlässlicher Kompass dafür, welche Menschen \
                    dir wirklich guttun und welche nicht.";

        let result = flow_into_chain(&[&first, &second], text);

        assert_eq!(result.fills.len(), 2);
        assert_eq!(result.fills[0].lines.len(), 2);
        assert!(!result.fills[1].lines.is_empty());
        assert!(result.truncated.is_none());

        // No word is lost or duplicated across the chain.
        let all: Vec<String> = result
            .fills
            .iter()
            .flat_map(|f| f.lines.iter().map(|l| l.text.clone()))
            .collect();
        assert_eq!(all.join(" "), text);
    }

    #[test]
    fn test_exhausted_chain_truncates_at_line_boundary() {
        let only = test_box(0, rect(50.0, 700.0, 150.0, 14.0), 11.0); // 1 line
        let text = "Erlaube dir genau so aufzutreten echt freundlich und klar";

        let result = flow_into_chain(&[&only], text);

        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].lines.len(), 1);

        let kept = &result.fills[0].lines[0].text;
        let cut = result.truncated.as_deref().expect("text must overflow");
        assert_eq!(format!("{kept} {cut}"), text, "cut exactly at a line break");
    }

    #[test]
    fn test_empty_text_renders_nothing() {
        let bx = test_box(0, rect(50.0, 700.0, 495.0, 80.0), 11.0);
        let result = flow_into_chain(&[&bx], "   ");
        assert!(result.fills.is_empty());
        assert!(result.truncated.is_none());
    }

    #[test]
    fn test_zero_capacity_box_passes_text_on() {
        let flat = test_box(0, rect(50.0, 700.0, 495.0, 5.0), 11.0); // floor(5/14) = 0
        let tall = test_box(1, rect(50.0, 400.0, 495.0, 140.0), 11.0);

        let result = flow_into_chain(&[&flat, &tall], "alles landet hinten");
        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].page, 1);
    }
}
