//! HTML projection of page content.
//!
//! This is the serialized form a page's `stored` content takes. It mirrors
//! what a contenteditable surface produces for the same content, so a
//! browser host can load it straight back into a page.

use std::fmt::Write;

use quick_xml::escape::{escape, partial_escape};

use crate::arena::NodeArena;
use crate::fragment::{Block, BlockKind, InlineRun, InlineStyle};
use crate::region::TextRegion;
use crate::types::{Align, ListKind};

/// Class carried by uncommitted assist output.
pub const PREVIEW_CLASS: &str = "ai-preview-text";

/// Render a page's text region.
pub fn render_region(region: &TextRegion, arena: &NodeArena) -> String {
    render_blocks(region.blocks(arena))
}

/// Render blocks in order, grouping consecutive list items of one kind into
/// a single list element.
pub fn render_blocks<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> String {
    let mut out = String::new();
    let mut open_list: Option<ListKind> = None;

    for block in blocks {
        let list = block.kind.list_kind();
        if open_list != list {
            if let Some(kind) = open_list {
                let _ = write!(out, "</{}>", kind.tag());
            }
            if let Some(kind) = list {
                let _ = write!(out, "<{}>", kind.tag());
            }
            open_list = list;
        }
        render_block(&mut out, block);
    }
    if let Some(kind) = open_list {
        let _ = write!(out, "</{}>", kind.tag());
    }
    out
}

fn render_block(out: &mut String, block: &Block) {
    let tag = match block.kind {
        BlockKind::Rule => {
            out.push_str("<hr>");
            return;
        }
        BlockKind::Paragraph => "p".to_string(),
        BlockKind::Heading(level) => format!("h{}", level.get()),
        BlockKind::ListItem(_) => "li".to_string(),
        BlockKind::Quote => "blockquote".to_string(),
    };

    out.push('<');
    out.push_str(&tag);
    if block.align != Align::Left {
        let _ = write!(out, " style=\"text-align: {}\"", block.align.as_css());
    }
    out.push('>');
    for run in &block.runs {
        render_run(out, run);
    }
    let _ = write!(out, "</{tag}>");
}

fn render_run(out: &mut String, run: &InlineRun) {
    let style = &run.style;
    let css = span_css(style);

    if style.preview {
        let _ = write!(out, "<span class=\"{PREVIEW_CLASS}\">");
    }
    if let Some(href) = &style.link {
        let _ = write!(out, "<a href=\"{}\">", escape(href.as_str()));
    }
    if let Some(css) = &css {
        let _ = write!(out, "<span style=\"{css}\">");
    }
    if style.bold {
        out.push_str("<strong>");
    }
    if style.italic {
        out.push_str("<em>");
    }
    if style.underline {
        out.push_str("<u>");
    }

    out.push_str(&partial_escape(run.text.as_str()));

    if style.underline {
        out.push_str("</u>");
    }
    if style.italic {
        out.push_str("</em>");
    }
    if style.bold {
        out.push_str("</strong>");
    }
    if css.is_some() {
        out.push_str("</span>");
    }
    if style.link.is_some() {
        out.push_str("</a>");
    }
    if style.preview {
        out.push_str("</span>");
    }
}

fn span_css(style: &InlineStyle) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(size) = style.font_size {
        parts.push(format!("font-size: {size}px"));
    }
    if let Some(color) = style.color {
        parts.push(format!("color: {color}"));
    }
    if let Some(highlight) = style.highlight {
        parts.push(format!("background-color: {highlight}"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
