// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Herzkompass report rendering.
//!
//! Turns a customer's questionnaire answers into the final analysis PDF.
//! The pipeline has three pure stages and one assembly stage:
//!
//! ```text
//!   answers (JSON)
//!        |
//!        v
//!   builder::build_blocks      answers -> German paragraphs per block key
//!        |
//!        v
//!   layout::Layout::standard   block key -> target rectangles (8 pages)
//!        |
//!        v
//!   flow::flow_into_chain      paragraph -> wrapped, positioned lines
//!        |
//!        v
//!   pdf::render                lines -> PDF bytes (template or blank A4)
//! ```
//!
//! Everything above `pdf` is plain data and geometry, which keeps the
//! wrapping and overflow behavior testable without a PDF reader. Rendering
//! is deterministic: the same answers, header and layout always produce the
//! same bytes.

#![deny(missing_docs)]

pub mod blocks;
pub mod builder;
pub mod flow;
pub mod layout;
pub mod metrics;
pub mod pdf;
pub mod winansi;

pub use blocks::{BlockKey, BlockMap};
pub use builder::build_blocks;
pub use layout::Layout;
pub use pdf::{HeaderInfo, RenderError, render};
