//! Core editor types: identifiers, positions, selection, and block attributes.
//!
//! These types are framework-agnostic. Positions address blocks by their
//! stable [`NodeId`] rather than by index, so they survive reflow moving a
//! block from one page to another.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EditError;

/// Stable identifier of a block-level node inside a chapter's arena.
///
/// Ids are never reused within one arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identifier of a chapter within a book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(pub u32);

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A position inside a block: the block id plus a char offset into the
/// block's plain text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePosition {
    pub node: NodeId,
    /// Character offset (NOT byte offset!) into the block's plain text.
    pub offset: usize,
}

impl NodePosition {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// Position at the very start of a block.
    pub fn start_of(node: NodeId) -> Self {
        Self { node, offset: 0 }
    }
}

/// Text selection with anchor and focus positions.
///
/// The anchor is where the selection started, the focus is where the cursor
/// is now. Ordering across blocks depends on the region the blocks live in,
/// see [`TextRegion::order_selection`](crate::TextRegion::order_selection).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: NodePosition,
    pub focus: NodePosition,
}

impl Selection {
    pub fn new(anchor: NodePosition, focus: NodePosition) -> Self {
        Self { anchor, focus }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(position: NodePosition) -> Self {
        Self {
            anchor: position,
            focus: position,
        }
    }

    /// Check if the selection is collapsed (cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Whether both ends sit in the same block.
    pub fn is_single_block(&self) -> bool {
        self.anchor.node == self.focus.node
    }
}

/// Where the editor's focus currently is: a page and optionally a caret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub page: usize,
    pub position: Option<NodePosition>,
}

impl PageCursor {
    pub fn new(page: usize, position: Option<NodePosition>) -> Self {
        Self { page, position }
    }
}

/// Horizontal alignment of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    pub fn as_css(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
            Align::Justify => "justify",
        }
    }
}

/// Heading level, always within `1..=6`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const H1: Self = Self(1);
    pub const H2: Self = Self(2);
    pub const H3: Self = Self(3);

    pub fn new(level: u8) -> Option<Self> {
        (1..=6).contains(&level).then_some(Self(level))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = EditError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        HeadingLevel::new(value).ok_or(EditError::InvalidHeadingLevel(value))
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

/// Kind of list a list item belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// `<ul>`
    Bullet,
    /// `<ol>`
    Numbered,
}

impl ListKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ListKind::Bullet => "ul",
            ListKind::Numbered => "ol",
        }
    }
}

/// An RGB color, parsed from and printed as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const YELLOW: Self = Self::rgb(0xff, 0xff, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EditError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = EditError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}
