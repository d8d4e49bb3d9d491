//! Rich text payload: block-level nodes made of styled inline runs.
//!
//! A page's content is an ordered list of [`Block`]s. Blocks are the unit of
//! measurement and of transfer between pages; inline runs never cross block
//! boundaries. All offsets are in chars, not bytes.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::types::{Align, Color, HeadingLevel, ListKind};

/// Kind of a block-level node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading(HeadingLevel),
    /// One item of a list. Consecutive items of the same kind form a list.
    ListItem(ListKind),
    Quote,
    /// Horizontal rule. Carries no text.
    Rule,
}

impl BlockKind {
    /// Whether this is a list item of the given kind.
    pub fn is_list_item_of(&self, kind: ListKind) -> bool {
        matches!(self, BlockKind::ListItem(k) if *k == kind)
    }

    pub fn list_kind(&self) -> Option<ListKind> {
        match self {
            BlockKind::ListItem(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Kind used for the tail of a block split by a paragraph break.
    ///
    /// Headings and rules do not continue past a break; lists and quotes do.
    pub fn continuation(&self) -> BlockKind {
        match self {
            BlockKind::Heading(_) | BlockKind::Rule => BlockKind::Paragraph,
            other => *other,
        }
    }
}

/// Inline formatting of a run of text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineStyle {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,
    /// Font size in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<SmolStr>,
    /// Uncommitted assist output awaiting approval.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub preview: bool,
}

impl InlineStyle {
    pub fn is_plain(&self) -> bool {
        *self == InlineStyle::default()
    }
}

/// A run of text sharing one [`InlineStyle`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InlineRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "InlineStyle::is_plain")]
    pub style: InlineStyle,
}

impl InlineRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: InlineStyle::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: InlineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A block-level node: the unit a page's text region is made of.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "is_default_align")]
    pub align: Align,
    #[serde(default)]
    pub runs: Vec<InlineRun>,
}

fn is_default_align(align: &Align) -> bool {
    *align == Align::Left
}

impl Block {
    /// Create an empty block of the given kind.
    pub fn empty(kind: BlockKind) -> Self {
        Self {
            kind,
            align: Align::Left,
            runs: Vec::new(),
        }
    }

    /// Create a block holding one unstyled run.
    pub fn with_text(kind: BlockKind, text: impl Into<String>) -> Self {
        let text = text.into();
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![InlineRun::plain(text)]
        };
        Self {
            kind,
            align: Align::Left,
            runs,
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::with_text(BlockKind::Paragraph, text)
    }

    pub fn heading(level: HeadingLevel, text: impl Into<String>) -> Self {
        Self::with_text(BlockKind::Heading(level), text)
    }

    pub fn list_item(kind: ListKind, text: impl Into<String>) -> Self {
        Self::with_text(BlockKind::ListItem(kind), text)
    }

    pub fn quote(text: impl Into<String>) -> Self {
        Self::with_text(BlockKind::Quote, text)
    }

    pub fn rule() -> Self {
        Self::empty(BlockKind::Rule)
    }

    /// Plain-text projection: the runs' text concatenated.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Length in chars.
    pub fn char_len(&self) -> usize {
        self.runs.iter().map(InlineRun::char_len).sum()
    }

    /// True when the block has no non-whitespace text (rules are never blank).
    pub fn is_blank(&self) -> bool {
        self.kind != BlockKind::Rule && self.runs.iter().all(|r| r.text.trim().is_empty())
    }

    pub fn word_count(&self) -> usize {
        count_words(&self.plain_text())
    }

    /// Whether any run is an uncommitted preview.
    pub fn has_preview(&self) -> bool {
        self.runs.iter().any(|r| r.style.preview)
    }

    /// Ensure a run boundary exists at `offset`.
    ///
    /// Returns the index of the first run starting at or after `offset`.
    /// Offsets past the end clamp to the end.
    pub fn split_runs_at(&mut self, offset: usize) -> usize {
        let mut pos = 0;
        for i in 0..self.runs.len() {
            if offset == pos {
                return i;
            }
            let len = self.runs[i].char_len();
            if offset < pos + len {
                let byte = char_to_byte(&self.runs[i].text, offset - pos);
                let tail = self.runs[i].text.split_off(byte);
                let style = self.runs[i].style.clone();
                self.runs.insert(i + 1, InlineRun::styled(tail, style));
                return i + 1;
            }
            pos += len;
        }
        self.runs.len()
    }

    /// Apply `f` to the style of every run covering `range`.
    pub fn apply_style(&mut self, range: Range<usize>, f: impl Fn(&mut InlineStyle)) {
        if range.start >= range.end {
            return;
        }
        let start = self.split_runs_at(range.start);
        let end = self.split_runs_at(range.end);
        for run in &mut self.runs[start..end] {
            f(&mut run.style);
        }
        self.normalize();
    }

    /// Whether every non-empty run overlapping `range` satisfies `pred`.
    ///
    /// An empty range covers nothing and returns false.
    pub fn style_covers(&self, range: Range<usize>, pred: impl Fn(&InlineStyle) -> bool) -> bool {
        if range.start >= range.end {
            return false;
        }
        let mut pos = 0;
        let mut seen = false;
        for run in &self.runs {
            let len = run.char_len();
            let run_range = pos..pos + len;
            pos += len;
            if len == 0 || run_range.end <= range.start || run_range.start >= range.end {
                continue;
            }
            seen = true;
            if !pred(&run.style) {
                return false;
            }
        }
        seen
    }

    /// Insert text at `offset`, inheriting the style of the run it lands in
    /// (the run to the left when on a boundary).
    pub fn insert_text(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.runs.is_empty() {
            self.runs.push(InlineRun::plain(text));
            return;
        }
        let mut pos = 0;
        for run in &mut self.runs {
            let len = run.char_len();
            if offset <= pos + len {
                let byte = char_to_byte(&run.text, offset.saturating_sub(pos));
                run.text.insert_str(byte, text);
                return;
            }
            pos += len;
        }
        if let Some(last) = self.runs.last_mut() {
            last.text.push_str(text);
        }
    }

    /// Delete the chars in `range`.
    pub fn delete_range(&mut self, range: Range<usize>) {
        self.replace_range(range, Vec::new());
    }

    /// Replace the chars in `range` with `runs`, returning the removed runs.
    pub fn replace_range(&mut self, range: Range<usize>, runs: Vec<InlineRun>) -> Vec<InlineRun> {
        let start = self.split_runs_at(range.start);
        let end = self.split_runs_at(range.end.max(range.start));
        let removed: Vec<InlineRun> = self.runs.splice(start..end, runs).collect();
        self.normalize();
        removed
    }

    /// Split off the runs after `offset`, leaving `[0, offset)` in `self`.
    pub fn split_off(&mut self, offset: usize) -> Vec<InlineRun> {
        let at = self.split_runs_at(offset);
        let tail = self.runs.split_off(at);
        self.normalize();
        tail
    }

    /// Append runs at the end of the block.
    pub fn append_runs(&mut self, runs: impl IntoIterator<Item = InlineRun>) {
        self.runs.extend(runs);
        self.normalize();
    }

    /// Drop empty runs and merge neighbours with identical style.
    pub fn normalize(&mut self) {
        let mut merged: Vec<InlineRun> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.text.is_empty() {
                continue;
            }
            match merged.last_mut() {
                Some(prev) if prev.style == run.style => prev.text.push_str(&run.text),
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }
}

/// Count whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Convert a char offset into a byte offset, clamping to the end.
pub(crate) fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> InlineStyle {
        InlineStyle {
            bold: true,
            ..Default::default()
        }
    }

    fn styled_block() -> Block {
        Block {
            kind: BlockKind::Paragraph,
            align: Align::Left,
            runs: vec![
                InlineRun::plain("héllo "),
                InlineRun::styled("wörld", bold()),
                InlineRun::plain("!"),
            ],
        }
    }

    #[test]
    fn test_plain_text_and_len() {
        let block = styled_block();
        assert_eq!(block.plain_text(), "héllo wörld!");
        assert_eq!(block.char_len(), 12);
        assert_eq!(block.word_count(), 2);
    }

    #[test]
    fn test_split_runs_at_boundaries() {
        let mut block = styled_block();
        assert_eq!(block.split_runs_at(0), 0);
        assert_eq!(block.split_runs_at(6), 1);
        assert_eq!(block.split_runs_at(2), 1);
        assert_eq!(block.runs[0].text, "hé");
        assert_eq!(block.runs[1].text, "llo ");
        assert_eq!(block.split_runs_at(99), block.runs.len());
    }

    #[test]
    fn test_apply_style_merges_neighbours() {
        let mut block = styled_block();
        block.apply_style(0..6, |s| s.bold = true);
        assert_eq!(block.runs.len(), 2);
        assert_eq!(block.runs[0].text, "héllo wörld");
        assert!(block.runs[0].style.bold);
        assert_eq!(block.runs[1].text, "!");
    }

    #[test]
    fn test_style_covers() {
        let block = styled_block();
        assert!(block.style_covers(6..11, |s| s.bold));
        assert!(!block.style_covers(5..11, |s| s.bold));
        assert!(!block.style_covers(3..3, |s| s.bold));
    }

    #[test]
    fn test_insert_text_inherits_left_style() {
        let mut block = styled_block();
        block.insert_text(11, "s");
        assert_eq!(block.plain_text(), "héllo wörlds!");
        assert_eq!(block.runs[1].text, "wörlds");

        let mut empty = Block::empty(BlockKind::Paragraph);
        empty.insert_text(0, "abc");
        assert_eq!(empty.plain_text(), "abc");
    }

    #[test]
    fn test_replace_range_returns_removed() {
        let mut block = styled_block();
        let removed = block.replace_range(4..8, vec![InlineRun::plain("__")]);
        let removed_text: String = removed.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(removed_text, "o wö");
        assert_eq!(block.plain_text(), "héll__rld!");
    }

    #[test]
    fn test_split_off_and_append() {
        let mut block = styled_block();
        let tail = block.split_off(6);
        assert_eq!(block.plain_text(), "héllo ");
        assert_eq!(tail.len(), 2);
        block.append_runs(tail);
        assert_eq!(block, styled_block());
    }

    #[test]
    fn test_blank_blocks() {
        assert!(Block::paragraph("  ").is_blank());
        assert!(Block::empty(BlockKind::Quote).is_blank());
        assert!(!Block::rule().is_blank());
        assert!(!Block::paragraph("x").is_blank());
    }
}
