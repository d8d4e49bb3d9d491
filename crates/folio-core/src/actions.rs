//! Formatting commands.
//!
//! Platform-agnostic definitions of the closed set of formatting operations
//! the toolbar, keyboard shortcuts and slash menu can issue. Each command is
//! classified as inline, block or list so the executor knows which
//! [`EditingCapability`](crate::EditingCapability) primitive to try first.

use smol_str::SmolStr;

use crate::fragment::BlockKind;
use crate::types::{Align, Color, HeadingLevel, ListKind};

/// A formatting command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Align(Align),
    Heading(HeadingLevel),
    /// Reset the block to a plain paragraph.
    Paragraph,
    List(ListKind),
    Blockquote,
    /// Insert a horizontal rule after the current block.
    Rule,
    /// Font size in pixels.
    FontSize(u16),
    TextColor(Color),
    /// Background highlight. White removes the highlight.
    Highlight(Color),
    Link(SmolStr),
}

/// Formatting applied to runs of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineFormat {
    Bold,
    Italic,
    Underline,
    FontSize(u16),
    TextColor(Color),
    Highlight(Color),
    Link(SmolStr),
}

/// Formatting applied to whole blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFormat {
    /// Change the block's kind, keeping its text.
    Kind(BlockKind),
    Align(Align),
    Rule,
}

/// Which kind of primitive a command needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandClass {
    Inline(InlineFormat),
    Block(BlockFormat),
    List(ListKind),
}

impl FormatCommand {
    pub fn classify(&self) -> CommandClass {
        match self {
            FormatCommand::Bold => CommandClass::Inline(InlineFormat::Bold),
            FormatCommand::Italic => CommandClass::Inline(InlineFormat::Italic),
            FormatCommand::Underline => CommandClass::Inline(InlineFormat::Underline),
            FormatCommand::FontSize(px) => CommandClass::Inline(InlineFormat::FontSize(*px)),
            FormatCommand::TextColor(c) => CommandClass::Inline(InlineFormat::TextColor(*c)),
            FormatCommand::Highlight(c) => CommandClass::Inline(InlineFormat::Highlight(*c)),
            FormatCommand::Link(href) => CommandClass::Inline(InlineFormat::Link(href.clone())),
            FormatCommand::Align(align) => CommandClass::Block(BlockFormat::Align(*align)),
            FormatCommand::Heading(level) => {
                CommandClass::Block(BlockFormat::Kind(BlockKind::Heading(*level)))
            }
            FormatCommand::Paragraph => {
                CommandClass::Block(BlockFormat::Kind(BlockKind::Paragraph))
            }
            FormatCommand::Blockquote => CommandClass::Block(BlockFormat::Kind(BlockKind::Quote)),
            FormatCommand::Rule => CommandClass::Block(BlockFormat::Rule),
            FormatCommand::List(kind) => CommandClass::List(*kind),
        }
    }

    /// Short human-readable name, used in notices.
    pub fn label(&self) -> &'static str {
        match self {
            FormatCommand::Bold => "bold",
            FormatCommand::Italic => "italic",
            FormatCommand::Underline => "underline",
            FormatCommand::Align(_) => "alignment",
            FormatCommand::Heading(_) => "heading",
            FormatCommand::Paragraph => "paragraph",
            FormatCommand::List(ListKind::Bullet) => "bullet list",
            FormatCommand::List(ListKind::Numbered) => "numbered list",
            FormatCommand::Blockquote => "quote",
            FormatCommand::Rule => "divider",
            FormatCommand::FontSize(_) => "font size",
            FormatCommand::TextColor(_) => "text color",
            FormatCommand::Highlight(_) => "highlight",
            FormatCommand::Link(_) => "link",
        }
    }
}

/// Entries of the slash menu shown when `/` is typed at the start of an
/// empty block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    Heading1,
    Heading2,
    Heading3,
    BulletList,
    NumberedList,
    Blockquote,
    Divider,
}

impl SlashCommand {
    pub const ALL: [SlashCommand; 7] = [
        SlashCommand::Heading1,
        SlashCommand::Heading2,
        SlashCommand::Heading3,
        SlashCommand::BulletList,
        SlashCommand::NumberedList,
        SlashCommand::Blockquote,
        SlashCommand::Divider,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SlashCommand::Heading1 => "Heading 1",
            SlashCommand::Heading2 => "Heading 2",
            SlashCommand::Heading3 => "Heading 3",
            SlashCommand::BulletList => "Bullet List",
            SlashCommand::NumberedList => "Numbered List",
            SlashCommand::Blockquote => "Quote",
            SlashCommand::Divider => "Divider",
        }
    }

    pub fn command(&self) -> FormatCommand {
        match self {
            SlashCommand::Heading1 => FormatCommand::Heading(HeadingLevel::H1),
            SlashCommand::Heading2 => FormatCommand::Heading(HeadingLevel::H2),
            SlashCommand::Heading3 => FormatCommand::Heading(HeadingLevel::H3),
            SlashCommand::BulletList => FormatCommand::List(ListKind::Bullet),
            SlashCommand::NumberedList => FormatCommand::List(ListKind::Numbered),
            SlashCommand::Blockquote => FormatCommand::Blockquote,
            SlashCommand::Divider => FormatCommand::Rule,
        }
    }

    /// Menu entries whose label contains `query`, case-insensitively.
    pub fn filter(query: &str) -> impl Iterator<Item = SlashCommand> + '_ {
        let query = query.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(move |c| c.label().to_lowercase().contains(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            FormatCommand::Bold.classify(),
            CommandClass::Inline(InlineFormat::Bold)
        );
        assert_eq!(
            FormatCommand::Heading(HeadingLevel::H2).classify(),
            CommandClass::Block(BlockFormat::Kind(BlockKind::Heading(HeadingLevel::H2)))
        );
        assert_eq!(
            FormatCommand::List(ListKind::Numbered).classify(),
            CommandClass::List(ListKind::Numbered)
        );
    }

    #[test]
    fn test_slash_filter() {
        let found: Vec<_> = SlashCommand::filter("head").collect();
        assert_eq!(found.len(), 3);
        let found: Vec<_> = SlashCommand::filter("LIST").collect();
        assert_eq!(found, vec![SlashCommand::BulletList, SlashCommand::NumberedList]);
        assert_eq!(SlashCommand::filter("").count(), SlashCommand::ALL.len());
    }
}
