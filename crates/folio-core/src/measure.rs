//! Headless [`LayoutMeasure`] implementations.
//!
//! Browser hosts measure real geometry. These stand in for it: a plain
//! character budget for tests and a word-wrapping line budget for terminal
//! and batch pagination.

use serde::{Deserialize, Serialize};
use textwrap::Options;

use crate::arena::NodeArena;
use crate::fragment::{Block, BlockKind};
use crate::platform::{LayoutMeasure, PlatformError};
use crate::region::TextRegion;

/// Capacity expressed in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharBudget {
    pub capacity: usize,
    /// Extra cost charged per block, standing in for block margins.
    pub block_overhead: usize,
}

impl CharBudget {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            block_overhead: 0,
        }
    }

    pub fn with_block_overhead(mut self, overhead: usize) -> Self {
        self.block_overhead = overhead;
        self
    }
}

impl LayoutMeasure for CharBudget {
    fn overflow(&self, region: &TextRegion, arena: &NodeArena) -> Result<u32, PlatformError> {
        let used: usize = region
            .blocks(arena)
            .map(|b| b.char_len() + self.block_overhead)
            .sum();
        Ok(saturate(used.saturating_sub(self.capacity)))
    }
}

/// Page geometry for line-based pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Display columns per line.
    pub columns: usize,
    pub lines_per_page: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            columns: 72,
            lines_per_page: 40,
        }
    }
}

/// Capacity expressed in wrapped display lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBudget {
    pub columns: usize,
    pub lines_per_page: usize,
}

impl LineBudget {
    pub fn new(columns: usize, lines_per_page: usize) -> Self {
        Self {
            columns,
            lines_per_page,
        }
    }

    /// Lines a block occupies once wrapped.
    pub fn block_lines(&self, block: &Block) -> usize {
        let text = block.plain_text();
        match block.kind {
            BlockKind::Rule => 1,
            // Headings get a spacing line below.
            BlockKind::Heading(_) => wrapped_lines(&text, self.columns) + 1,
            BlockKind::ListItem(_) | BlockKind::Quote => {
                wrapped_lines(&text, self.columns.saturating_sub(2))
            }
            BlockKind::Paragraph => wrapped_lines(&text, self.columns),
        }
    }
}

impl From<PaginationConfig> for LineBudget {
    fn from(config: PaginationConfig) -> Self {
        Self::new(config.columns, config.lines_per_page)
    }
}

impl LayoutMeasure for LineBudget {
    fn overflow(&self, region: &TextRegion, arena: &NodeArena) -> Result<u32, PlatformError> {
        if self.columns == 0 {
            return Err("page has no usable width".into());
        }
        let used: usize = region.blocks(arena).map(|b| self.block_lines(b)).sum();
        Ok(saturate(used.saturating_sub(self.lines_per_page)))
    }
}

/// Number of display lines `text` wraps to at `width` columns (at least one).
///
/// Words wider than a line are broken; wide characters count double.
pub fn wrapped_lines(text: &str, width: usize) -> usize {
    textwrap::wrap(text, Options::new(width.max(1))).len().max(1)
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
