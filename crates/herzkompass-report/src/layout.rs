// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Page layout.
//!
//! The report template is a fixed eight-page A4 document. Each paragraph
//! key owns one or more rectangles; multiple rectangles with the same key
//! form an overflow chain in declaration order. Coordinates follow PDF
//! conventions: origin bottom-left, `y` is the bottom edge of the box.

use crate::blocks::BlockKey;

/// A4 page size in points.
pub const A4: (f64, f64) = (595.28, 841.89);

/// A target rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Bottom edge.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

/// One paragraph target region on a page.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    /// Paragraph key this box renders.
    pub key: BlockKey,
    /// Zero-based page index.
    pub page: usize,
    /// Target rectangle.
    pub rect: Rect,
    /// Font size in points.
    pub size: f64,
    /// Bold face.
    pub bold: bool,
}

impl LayoutBox {
    fn new(key: BlockKey, page: usize, rect: Rect, size: f64) -> Self {
        Self {
            key,
            page,
            rect,
            size,
            bold: false,
        }
    }
}

const fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
    Rect { x, y, w, h }
}

/// The full box layout of a report.
#[derive(Debug, Clone)]
pub struct Layout {
    boxes: Vec<LayoutBox>,
}

impl Layout {
    /// The standard eight-page report layout.
    pub fn standard() -> Self {
        use BlockKey::*;

        let boxes = vec![
            // Page 1
            LayoutBox::new(Begruessung1, 0, rect(50.0, 700.0, 495.0, 80.0), 12.0),
            LayoutBox::new(Analyse1, 0, rect(50.0, 600.0, 495.0, 120.0), 11.0),
            // Overflow region for the analysis on the same page
            LayoutBox::new(Analyse1, 0, rect(50.0, 460.0, 495.0, 100.0), 11.0),
            // Page 2
            LayoutBox::new(Analyse2, 1, rect(50.0, 680.0, 495.0, 180.0), 11.0),
            LayoutBox::new(Analyse2, 1, rect(50.0, 480.0, 495.0, 140.0), 11.0),
            // Page 3
            LayoutBox::new(Fakten1, 2, rect(50.0, 680.0, 495.0, 100.0), 11.0),
            // Page 4, two columns
            LayoutBox::new(Staerken1, 3, rect(50.0, 680.0, 230.0, 160.0), 11.0),
            LayoutBox::new(Schwaechen1, 3, rect(315.0, 680.0, 230.0, 160.0), 11.0),
            // Page 5
            LayoutBox::new(Ergebnis, 4, rect(50.0, 660.0, 495.0, 220.0), 12.0),
            // Page 6
            LayoutBox::new(Empfehlung1, 5, rect(50.0, 680.0, 495.0, 120.0), 11.0),
            LayoutBox::new(Empfehlung2, 5, rect(50.0, 540.0, 495.0, 120.0), 11.0),
            LayoutBox::new(Empfehlung3, 5, rect(50.0, 400.0, 495.0, 120.0), 11.0),
            // Page 7
            LayoutBox::new(Zukunft1, 6, rect(50.0, 680.0, 495.0, 140.0), 11.0),
            LayoutBox::new(Zukunft2, 6, rect(50.0, 520.0, 495.0, 140.0), 11.0),
            // Page 8
            LayoutBox::new(Abschluss, 7, rect(50.0, 660.0, 495.0, 160.0), 11.0),
            LayoutBox::new(Wuensche, 7, rect(50.0, 480.0, 495.0, 120.0), 11.0),
        ];

        Self { boxes }
    }

    /// The overflow chain for a key, in declaration order.
    pub fn chain_for(&self, key: BlockKey) -> Vec<&LayoutBox> {
        self.boxes.iter().filter(|b| b.key == key).collect()
    }

    /// Number of pages the layout spans.
    pub fn page_count(&self) -> usize {
        self.boxes.iter().map(|b| b.page + 1).max().unwrap_or(1)
    }
}
