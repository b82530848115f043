// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PDF assembly.
//!
//! Renders the flowed paragraphs into a PDF: either on top of a designed
//! template (the content streams are appended, so the template artwork
//! stays underneath) or onto synthesized blank A4 pages when no template
//! is configured.
//!
//! Output is deterministic for identical input. The header timestamp comes
//! from the caller, nothing else in the file depends on wall-clock time, so
//! re-rendering an unchanged order reproduces the stored bytes exactly.

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use thiserror::Error;
use tracing::{debug, warn};

use crate::blocks::{BlockKey, BlockMap};
use crate::flow::{BoxFill, flow_into_chain};
use crate::layout::{A4, Layout};
use crate::winansi;

/// Resource names the appended streams use for the two faces.
const FONT_REGULAR: &str = "HkF1";
const FONT_BOLD: &str = "HkF2";

/// Rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template could not be parsed or the document not serialized.
    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Serialization produced something that is not a PDF.
    #[error("rendered document is empty or malformed")]
    InvalidOutput,
}

/// First-page header fields.
#[derive(Debug, Clone)]
pub struct HeaderInfo {
    /// Customer name, rendered as `-` when unknown.
    pub name: Option<String>,
    /// Customer email, omitted when unknown.
    pub email: Option<String>,
    /// Order creation time shown as `Erstellt am`. Taken from the order,
    /// not the clock, to keep re-renders reproducible.
    pub created_at: DateTime<Utc>,
}

/// Render the report.
///
/// `template` is an existing PDF to draw over; without one, blank A4 pages
/// are synthesized for the whole layout. Boxes whose page does not exist in
/// the template are skipped with a warning rather than failing the render.
pub fn render(
    template: Option<&[u8]>,
    header: &HeaderInfo,
    blocks: &BlockMap,
    layout: &Layout,
) -> Result<Vec<u8>, RenderError> {
    let mut doc = match template {
        Some(bytes) => Document::load_mem(bytes)?,
        None => blank_document(layout.page_count()),
    };

    let pages = doc.get_pages();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    // Collect operations per page, then append one content stream each.
    let mut per_page: Vec<(usize, Vec<Operation>)> = Vec::new();

    if pages.contains_key(&1) {
        per_page.push((0, header_ops(header)));
    }

    for key in BlockKey::ALL {
        let Some(text) = blocks.get(&key) else {
            continue;
        };
        let chain = layout.chain_for(key);
        if chain.is_empty() {
            continue;
        }

        let flowed = flow_into_chain(&chain, text);
        if let Some(rest) = &flowed.truncated {
            debug!(
                block = key.as_str(),
                dropped_chars = rest.len(),
                "paragraph exceeded its layout chain, tail truncated"
            );
        }

        for fill in flowed.fills {
            if !pages.contains_key(&(fill.page as u32 + 1)) {
                warn!(
                    block = key.as_str(),
                    page = fill.page,
                    "layout page missing from template, skipping box"
                );
                continue;
            }
            push_fill_ops(&mut per_page, &fill);
        }
    }

    // Merge operation lists page by page, in page order.
    let mut page_indexes: Vec<usize> = per_page.iter().map(|(p, _)| *p).collect();
    page_indexes.sort_unstable();
    page_indexes.dedup();

    for page_index in page_indexes {
        let page_id = pages[&(page_index as u32 + 1)];
        let mut operations = Vec::new();
        for (p, ops) in &per_page {
            if *p == page_index {
                operations.extend(ops.iter().cloned());
            }
        }
        let content = Content { operations };
        append_content(&mut doc, page_id, content.encode()?)?;
        ensure_fonts(&mut doc, page_id, regular_id, bold_id)?;
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(lopdf::Error::IO)?;

    if !buffer.starts_with(b"%PDF") {
        return Err(RenderError::InvalidOutput);
    }
    Ok(buffer)
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn text_op(s: &str) -> Object {
    Object::String(winansi::encode(s), StringFormat::Literal)
}

fn header_ops(header: &HeaderInfo) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![FONT_REGULAR.into(), real(10.0)]),
        Operation::new("rg", vec![real(0.25), real(0.25), real(0.25)]),
    ];

    let mut line = |text: String, y: f64| {
        ops.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                real(50.0),
                real(A4.1 - y),
            ],
        ));
        ops.push(Operation::new("Tj", vec![text_op(&text)]));
    };

    line(format!("Name: {}", header.name.as_deref().unwrap_or("-")), 60.0);
    if let Some(email) = &header.email {
        line(format!("E-Mail: {email}"), 75.0);
    }
    line(
        format!(
            "Erstellt am: {}",
            header.created_at.format("%d.%m.%Y, %H:%M")
        ),
        90.0,
    );

    ops.push(Operation::new("ET", vec![]));
    ops
}

fn push_fill_ops(per_page: &mut Vec<(usize, Vec<Operation>)>, fill: &BoxFill) {
    let font = if fill.bold { FONT_BOLD } else { FONT_REGULAR };

    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), real(fill.size)]),
        Operation::new("rg", vec![real(0.12), real(0.12), real(0.12)]),
    ];
    for line in &fill.lines {
        ops.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                real(line.x),
                real(line.y),
            ],
        ));
        ops.push(Operation::new("Tj", vec![text_op(&line.text)]));
    }
    ops.push(Operation::new("ET", vec![]));

    per_page.push((fill.page, ops));
}

/// Synthesize a blank A4 document with `page_count` pages.
fn blank_document(page_count: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(page_count);
    for _ in 0..page_count {
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), real(A4.0), real(A4.1)],
            "Resources" => dictionary! {},
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc
}

/// Append a content stream after the page's existing content so the text
/// draws on top of the template artwork.
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    encoded: Vec<u8>,
) -> Result<(), RenderError> {
    let stream_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let existing = page.get(b"Contents").ok().cloned();
    match existing {
        Some(Object::Reference(id)) => {
            page.set(
                "Contents",
                vec![Object::Reference(id), Object::Reference(stream_id)],
            );
        }
        Some(Object::Array(mut streams)) => {
            streams.push(Object::Reference(stream_id));
            page.set("Contents", streams);
        }
        _ => {
            page.set("Contents", Object::Reference(stream_id));
        }
    }

    Ok(())
}

/// Register the two report faces in the page's font resources.
///
/// Templates may hold `Resources` (and its `Font` entry) inline or behind a
/// reference; both shapes are handled one level deep, which covers every
/// document the common generators produce.
fn ensure_fonts(
    doc: &mut Document,
    page_id: ObjectId,
    regular_id: ObjectId,
    bold_id: ObjectId,
) -> Result<(), RenderError> {
    // Locate (or create) the resources dictionary.
    let resources_ref = {
        let page = doc.get_object(page_id)?.as_dict()?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    let resources: &mut Dictionary = match resources_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => {
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            if !page.has(b"Resources") {
                page.set("Resources", Dictionary::new());
            }
            page.get_mut(b"Resources")?.as_dict_mut()?
        }
    };

    // The Font entry itself may also be a reference.
    let font_ref = match resources.get(b"Font") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    let fonts: &mut Dictionary = match font_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => {
            if !resources.has(b"Font") {
                resources.set("Font", Dictionary::new());
            }
            resources.get_mut(b"Font")?.as_dict_mut()?
        }
    };

    fonts.set(FONT_REGULAR, regular_id);
    fonts.set(FONT_BOLD, bold_id);
    Ok(())
}
