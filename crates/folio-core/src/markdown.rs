//! Import chapter text written in Markdown.
//!
//! Paragraphs, headings, lists, block quotes, rules, emphasis, strong and
//! links map onto blocks and inline styles. Everything else keeps its text
//! and loses its markup.

use pulldown_cmark::{Event, HeadingLevel as MdLevel, Options, Parser, Tag};
use smol_str::SmolStr;

use crate::fragment::{Block, BlockKind, InlineRun, InlineStyle};
use crate::types::{HeadingLevel, ListKind};

#[derive(Debug, Clone)]
enum Frame {
    Paragraph,
    Heading(HeadingLevel),
    Quote,
    List(ListKind),
    Item,
    Code,
    Strong,
    Emphasis,
    Link(SmolStr),
    Other,
}

impl Frame {
    fn from_tag(tag: &Tag<'_>) -> Self {
        match tag {
            Tag::Paragraph => Frame::Paragraph,
            Tag::Heading { level, .. } => {
                let n = match level {
                    MdLevel::H1 => 1,
                    MdLevel::H2 => 2,
                    MdLevel::H3 => 3,
                    MdLevel::H4 => 4,
                    MdLevel::H5 => 5,
                    MdLevel::H6 => 6,
                };
                Frame::Heading(HeadingLevel::new(n).unwrap_or(HeadingLevel::H1))
            }
            Tag::BlockQuote(_) => Frame::Quote,
            Tag::List(Some(_)) => Frame::List(ListKind::Numbered),
            Tag::List(None) => Frame::List(ListKind::Bullet),
            Tag::Item => Frame::Item,
            Tag::CodeBlock(_) => Frame::Code,
            Tag::Strong => Frame::Strong,
            Tag::Emphasis => Frame::Emphasis,
            Tag::Link { dest_url, .. } => Frame::Link(SmolStr::new(dest_url.as_ref())),
            _ => Frame::Other,
        }
    }

    /// Frames that own a block of their own.
    fn is_block(&self) -> bool {
        matches!(
            self,
            Frame::Paragraph | Frame::Heading(_) | Frame::Item | Frame::Code
        )
    }
}

struct Importer {
    stack: Vec<Frame>,
    blocks: Vec<Block>,
    current: Option<Block>,
}

impl Importer {
    /// Kind of block the innermost open frames call for.
    fn context_kind(&self) -> BlockKind {
        for (i, frame) in self.stack.iter().enumerate().rev() {
            match frame {
                Frame::Heading(level) => return BlockKind::Heading(*level),
                Frame::Item => {
                    let kind = self.stack[..i]
                        .iter()
                        .rev()
                        .find_map(|f| match f {
                            Frame::List(kind) => Some(*kind),
                            _ => None,
                        })
                        .unwrap_or(ListKind::Bullet);
                    return BlockKind::ListItem(kind);
                }
                Frame::Quote => return BlockKind::Quote,
                _ => {}
            }
        }
        BlockKind::Paragraph
    }

    fn style(&self) -> InlineStyle {
        let mut style = InlineStyle::default();
        for frame in &self.stack {
            match frame {
                Frame::Strong => style.bold = true,
                Frame::Emphasis => style.italic = true,
                Frame::Link(href) => style.link = Some(href.clone()),
                _ => {}
            }
        }
        style
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            if block.char_len() > 0 {
                self.blocks.push(block);
            }
        }
    }

    fn open(&mut self) {
        self.flush();
        self.current = Some(Block::empty(self.context_kind()));
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let style = self.style();
        let kind = self.context_kind();
        let block = self.current.get_or_insert_with(|| Block::empty(kind));
        block.append_runs([InlineRun::styled(text, style)]);
    }

    fn start(&mut self, tag: &Tag<'_>) {
        let frame = Frame::from_tag(tag);
        let is_block = frame.is_block();
        // Loose list items wrap their text in a paragraph; keep the item's
        // block instead of opening another.
        let reuse_item = matches!(frame, Frame::Paragraph)
            && matches!(self.stack.last(), Some(Frame::Item))
            && self.current.as_ref().is_some_and(|b| b.char_len() == 0);
        self.stack.push(frame);
        if is_block && !reuse_item {
            self.open();
        }
    }

    fn end(&mut self) {
        if self.stack.pop().is_some_and(|frame| frame.is_block()) {
            self.flush();
        }
    }

    fn code(&mut self, text: &str) {
        for line in text.lines() {
            self.open();
            self.push_text(line);
        }
        self.flush();
    }
}

/// Parse Markdown source into blocks.
pub fn parse_blocks(src: &str) -> Vec<Block> {
    let mut importer = Importer {
        stack: Vec::new(),
        blocks: Vec::new(),
        current: None,
    };

    for event in Parser::new_ext(src, Options::empty()) {
        match event {
            Event::Start(tag) => importer.start(&tag),
            Event::End(_) => importer.end(),
            Event::Text(text) if matches!(importer.stack.last(), Some(Frame::Code)) => {
                importer.code(&text)
            }
            Event::Text(text) | Event::Code(text) => importer.push_text(&text),
            Event::SoftBreak => importer.push_text(" "),
            Event::HardBreak => importer.open(),
            Event::Rule => {
                importer.flush();
                importer.blocks.push(Block::rule());
            }
            _ => {}
        }
    }
    importer.flush();
    importer.blocks
}
