// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Report paragraph keys.
//!
//! Every paragraph the report can contain has a fixed key. The layout maps
//! keys to page regions; the builder decides which keys get content for a
//! given answer set. Declaration order is render order.

use std::collections::BTreeMap;

/// A paragraph slot in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockKey {
    /// Personal greeting on page 1.
    Begruessung1,
    /// Core-needs analysis, page 1.
    Analyse1,
    /// Conflict and affection analysis, page 2.
    Analyse2,
    /// Fact summary, page 3.
    Fakten1,
    /// Strengths column, page 4.
    Staerken1,
    /// Growth-areas column, page 4.
    Schwaechen1,
    /// Verdict, page 5.
    Ergebnis,
    /// First recommendation, page 6.
    Empfehlung1,
    /// Second recommendation, page 6.
    Empfehlung2,
    /// Third recommendation, page 6.
    Empfehlung3,
    /// Next steps, page 7.
    Zukunft1,
    /// Follow-up habits, page 7.
    Zukunft2,
    /// Closing words, page 8.
    Abschluss,
    /// Personal wish, page 8.
    Wuensche,
}

impl BlockKey {
    /// All keys in render order.
    pub const ALL: [BlockKey; 14] = [
        Self::Begruessung1,
        Self::Analyse1,
        Self::Analyse2,
        Self::Fakten1,
        Self::Staerken1,
        Self::Schwaechen1,
        Self::Ergebnis,
        Self::Empfehlung1,
        Self::Empfehlung2,
        Self::Empfehlung3,
        Self::Zukunft1,
        Self::Zukunft2,
        Self::Abschluss,
        Self::Wuensche,
    ];

    /// Stable string name, used in logs and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Begruessung1 => "begruessung_block1",
            Self::Analyse1 => "analyse_block1",
            Self::Analyse2 => "analyse_block2",
            Self::Fakten1 => "fakten_block1",
            Self::Staerken1 => "staerken_block1",
            Self::Schwaechen1 => "schwaechen_block1",
            Self::Ergebnis => "ergebnis_block",
            Self::Empfehlung1 => "empfehlung1",
            Self::Empfehlung2 => "empfehlung2",
            Self::Empfehlung3 => "empfehlung3",
            Self::Zukunft1 => "zukunft_block1",
            Self::Zukunft2 => "zukunft_block2",
            Self::Abschluss => "abschluss_block",
            Self::Wuensche => "wuensche_block",
        }
    }
}

/// Paragraph content per key. Absent keys render nothing.
pub type BlockMap = BTreeMap<BlockKey, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_keys_unique() {
        let mut names: Vec<&str> = BlockKey::ALL.iter().map(BlockKey::as_str).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), BlockKey::ALL.len());
    }
}
