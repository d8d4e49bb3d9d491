//! Command execution for chapter documents.
//!
//! [`CommandExecutor`] applies [`FormatCommand`]s to a [`Document`]. It asks
//! the injected [`EditingCapability`] first and falls back to editing the
//! model directly when the host has no native primitive. Either way the
//! touched page is marked dirty so the next reconcile re-checks its layout.

use crate::actions::{BlockFormat, CommandClass, FormatCommand, InlineFormat, SlashCommand};
use crate::document::Document;
use crate::error::EditError;
use crate::fragment::{Block, BlockKind, InlineStyle};
use crate::platform::{EditingCapability, NativeOutcome, PlatformError};
use crate::types::{Color, ListKind, NodeId, NodePosition, PageCursor, Selection};

/// A selection remembered before focus left the page (for example when a
/// toolbar button was pressed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedSelection {
    pub page: usize,
    pub selection: Selection,
}

/// What executing a command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command ran; `native` tells whether the host applied it.
    Applied { page: usize, native: bool },
    /// The command could not be applied. `notice` is user-facing.
    Failed { notice: String },
    /// The target page refuses edits.
    Rejected(EditError),
    /// No page or selection to apply the command to.
    NoTarget,
}

/// Applies formatting through an editing capability.
#[derive(Debug, Clone)]
pub struct CommandExecutor<E> {
    capability: E,
    saved: Option<SavedSelection>,
}

impl<E: EditingCapability> CommandExecutor<E> {
    pub fn new(capability: E) -> Self {
        Self {
            capability,
            saved: None,
        }
    }

    pub fn capability(&self) -> &E {
        &self.capability
    }

    pub fn capability_mut(&mut self) -> &mut E {
        &mut self.capability
    }

    /// Remember the host's live selection as belonging to `page`.
    ///
    /// Returns false if the host has no selection; the previous saved
    /// selection is kept in that case.
    pub fn save_selection(&mut self, page: usize) -> bool {
        match self.capability.selection() {
            Some(selection) => {
                self.saved = Some(SavedSelection { page, selection });
                true
            }
            None => false,
        }
    }

    pub fn saved_selection(&self) -> Option<SavedSelection> {
        self.saved
    }

    pub fn clear_saved_selection(&mut self) {
        self.saved = None;
    }

    /// Target of the next command: the saved selection, or the document's
    /// focus when nothing was saved.
    fn target(&self, doc: &Document) -> Option<(usize, Option<Selection>)> {
        let (page, selection) = match self.saved {
            Some(saved) => (saved.page, Some(saved.selection)),
            None => {
                let focus = doc.focus()?;
                (focus.page, focus.position.map(Selection::collapsed))
            }
        };
        // Reflow moves blocks between pages; the selection's block decides.
        let page = selection
            .and_then(|s| doc.locate(s.focus.node))
            .map_or(page, |(page, _)| page);
        Some((page, selection))
    }

    /// Apply a formatting command.
    pub fn execute(&mut self, doc: &mut Document, command: &FormatCommand) -> CommandOutcome {
        let Some((page, selection)) = self.target(doc) else {
            return CommandOutcome::NoTarget;
        };
        if let Err(err) = doc.check_editable(page) {
            tracing::debug!(page, %err, "command rejected");
            return CommandOutcome::Rejected(err);
        }
        // A selection whose blocks moved away (reflow, deletion) is stale.
        let selection = selection.filter(|s| {
            let region = &doc.pages()[page].region;
            region.contains(s.anchor.node) && region.contains(s.focus.node)
        });

        if let Err(err) = self.capability.focus(page) {
            return failed(command, &err);
        }
        self.capability.set_selection(selection);

        let class = command.classify();
        let native = match &class {
            CommandClass::Inline(format) => self.capability.apply_inline_style(format),
            CommandClass::Block(format) => self.capability.apply_block_style(format),
            CommandClass::List(kind) => self.capability.toggle_list(*kind),
        };

        let native = match native {
            Ok(NativeOutcome::Applied) => true,
            Ok(NativeOutcome::Unsupported)
                if matches!(class, CommandClass::Inline(_))
                    && !selection.is_some_and(|s| !s.is_collapsed()) =>
            {
                tracing::debug!(command = command.label(), "no text selected to format");
                return CommandOutcome::Failed {
                    notice: format!("Select some text to apply {}", command.label()),
                };
            }
            Ok(NativeOutcome::Unsupported) => {
                let applied = match class {
                    CommandClass::Inline(format) => apply_inline(doc, page, selection, &format),
                    CommandClass::Block(format) => apply_block(doc, page, selection, format),
                    CommandClass::List(kind) => toggle_list(doc, page, selection, kind),
                };
                if let Err(err) = applied {
                    tracing::warn!(command = command.label(), %err, "formatting failed");
                    return CommandOutcome::Failed {
                        notice: format!("Couldn't apply {}: {err}", command.label()),
                    };
                }
                false
            }
            Err(err) => return failed(command, &err),
        };

        doc.mark_dirty(page);
        if let Some(selection) = selection {
            doc.set_focus(Some(PageCursor::new(page, Some(selection.focus))));
        }
        CommandOutcome::Applied { page, native }
    }

    /// Run a slash-menu entry at the caret.
    ///
    /// An empty block is converted in place; otherwise a new empty block is
    /// inserted after the caret's block and converted.
    pub fn execute_slash(&mut self, doc: &mut Document, slash: SlashCommand) -> CommandOutcome {
        let Some((page, selection)) = self.target(doc) else {
            return CommandOutcome::NoTarget;
        };
        if let Err(err) = doc.check_editable(page) {
            return CommandOutcome::Rejected(err);
        }

        let caret = selection.map(|s| s.focus);
        let needs_block = match caret {
            Some(pos) => doc.block(pos.node).is_none_or(|b| b.char_len() > 0),
            None => true,
        };
        if needs_block {
            let index = caret
                .and_then(|pos| doc.pages()[page].region.position_of(pos.node))
                .map_or(usize::MAX, |i| i + 1);
            let id = match doc.insert_block(page, index, Block::paragraph("")) {
                Ok(id) => id,
                Err(err) => return CommandOutcome::Rejected(err),
            };
            self.saved = Some(SavedSelection {
                page,
                selection: Selection::collapsed(NodePosition::start_of(id)),
            });
        }
        self.execute(doc, &slash.command())
    }
}

fn failed(command: &FormatCommand, err: &PlatformError) -> CommandOutcome {
    tracing::warn!(command = command.label(), %err, "editing capability failed");
    CommandOutcome::Failed {
        notice: format!("Couldn't apply {}: {err}", command.label()),
    }
}

/// Blocks covered by a selection, each with the char range selected in it.
fn covered_ranges(
    doc: &Document,
    page: usize,
    selection: &Selection,
) -> Result<Vec<(NodeId, std::ops::Range<usize>)>, EditError> {
    let region = &doc.pages()[page].region;
    let not_on_page = EditError::NodeNotOnPage {
        node: selection.anchor.node,
        page,
    };
    let (start, end) = region.order_selection(selection).ok_or(not_on_page.clone())?;
    let nodes = region.covered_nodes(selection).ok_or(not_on_page)?;

    Ok(nodes
        .into_iter()
        .map(|id| {
            let len = doc.block(id).map_or(0, Block::char_len);
            let from = if id == start.node { start.offset.min(len) } else { 0 };
            let to = if id == end.node { end.offset.min(len) } else { len };
            (id, from..to)
        })
        .collect())
}

/// Ids of the blocks a block-level command applies to.
fn covered_blocks(
    doc: &Document,
    page: usize,
    selection: &Selection,
) -> Result<Vec<NodeId>, EditError> {
    Ok(covered_ranges(doc, page, selection)?
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| doc.block(*id).is_some_and(|b| b.kind != BlockKind::Rule))
        .collect())
}

fn apply_inline(
    doc: &mut Document,
    page: usize,
    selection: Option<Selection>,
    format: &InlineFormat,
) -> Result<(), EditError> {
    let Some(selection) = selection.filter(|s| !s.is_collapsed()) else {
        return Ok(());
    };
    let ranges = covered_ranges(doc, page, &selection)?;

    let toggle = |pred: fn(&InlineStyle) -> bool| {
        !ranges
            .iter()
            .filter(|(_, r)| !r.is_empty())
            .all(|(id, r)| doc.block(*id).is_some_and(|b| b.style_covers(r.clone(), pred)))
    };
    let setter: Box<dyn Fn(&mut InlineStyle)> = match format {
        InlineFormat::Bold => {
            let on = toggle(|s| s.bold);
            Box::new(move |s: &mut InlineStyle| s.bold = on)
        }
        InlineFormat::Italic => {
            let on = toggle(|s| s.italic);
            Box::new(move |s: &mut InlineStyle| s.italic = on)
        }
        InlineFormat::Underline => {
            let on = toggle(|s| s.underline);
            Box::new(move |s: &mut InlineStyle| s.underline = on)
        }
        InlineFormat::FontSize(px) => {
            let px = *px;
            Box::new(move |s: &mut InlineStyle| s.font_size = Some(px))
        }
        InlineFormat::TextColor(color) => {
            let color = *color;
            Box::new(move |s: &mut InlineStyle| s.color = Some(color))
        }
        InlineFormat::Highlight(color) => {
            let highlight = (*color != Color::WHITE).then_some(*color);
            Box::new(move |s: &mut InlineStyle| s.highlight = highlight)
        }
        InlineFormat::Link(href) => {
            let href = href.clone();
            Box::new(move |s: &mut InlineStyle| s.link = Some(href.clone()))
        }
    };

    for (id, range) in ranges {
        if let Some(block) = doc.block_mut(id) {
            block.apply_style(range, &setter);
        }
    }
    Ok(())
}

fn apply_block(
    doc: &mut Document,
    page: usize,
    selection: Option<Selection>,
    format: BlockFormat,
) -> Result<(), EditError> {
    let Some(selection) = selection else {
        // No enclosing block: start one.
        let block = match format {
            BlockFormat::Kind(kind) => Block::empty(kind),
            BlockFormat::Align(align) => {
                let mut block = Block::paragraph("");
                block.align = align;
                block
            }
            BlockFormat::Rule => Block::rule(),
        };
        doc.push_block(page, block)?;
        return Ok(());
    };

    match format {
        BlockFormat::Rule => {
            let (_, end) = doc.pages()[page]
                .region
                .order_selection(&selection)
                .ok_or(EditError::NodeNotOnPage {
                    node: selection.focus.node,
                    page,
                })?;
            let index = doc.pages()[page]
                .region
                .position_of(end.node)
                .map_or(usize::MAX, |i| i + 1);
            doc.insert_block(page, index, Block::rule())?;
        }
        BlockFormat::Kind(kind) => {
            for id in covered_blocks(doc, page, &selection)? {
                if let Some(block) = doc.block_mut(id) {
                    block.kind = kind;
                }
            }
        }
        BlockFormat::Align(align) => {
            for id in covered_blocks(doc, page, &selection)? {
                if let Some(block) = doc.block_mut(id) {
                    block.align = align;
                }
            }
        }
    }
    Ok(())
}

/// Same kind of list: outdent to paragraphs. Other kind: convert. Not a
/// list: make one.
fn toggle_list(
    doc: &mut Document,
    page: usize,
    selection: Option<Selection>,
    kind: ListKind,
) -> Result<(), EditError> {
    let Some(selection) = selection else {
        doc.push_block(page, Block::empty(BlockKind::ListItem(kind)))?;
        return Ok(());
    };
    let ids = covered_blocks(doc, page, &selection)?;
    let already = !ids.is_empty()
        && ids
            .iter()
            .all(|id| doc.block(*id).is_some_and(|b| b.kind.is_list_item_of(kind)));
    let target = if already {
        BlockKind::Paragraph
    } else {
        BlockKind::ListItem(kind)
    };
    for id in ids {
        if let Some(block) = doc.block_mut(id) {
            block.kind = target;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::CharBudget;
    use crate::platform::ModelEditing;
    use crate::types::{Align, ChapterId, HeadingLevel};

    fn setup(texts: &[&str]) -> (Document, Vec<NodeId>) {
        let doc = Document::from_blocks(
            ChapterId(1),
            "c",
            texts.iter().map(|t| Block::paragraph(*t)),
        );
        let ids = doc.page(0).unwrap().region.nodes().collect();
        (doc, ids)
    }

    fn select(
        exec: &mut CommandExecutor<ModelEditing>,
        anchor: (NodeId, usize),
        focus: (NodeId, usize),
    ) {
        exec.capability_mut().set_selection(Some(Selection::new(
            NodePosition::new(anchor.0, anchor.1),
            NodePosition::new(focus.0, focus.1),
        )));
        assert!(exec.save_selection(0));
    }

    #[test]
    fn test_bold_toggles() {
        let (mut doc, ids) = setup(&["hello world"]);
        let mut exec = CommandExecutor::new(ModelEditing::new());
        select(&mut exec, (ids[0], 0), (ids[0], 5));

        let outcome = exec.execute(&mut doc, &FormatCommand::Bold);
        assert_eq!(outcome, CommandOutcome::Applied { page: 0, native: false });
        let block = doc.block(ids[0]).unwrap();
        assert_eq!(block.runs.len(), 2);
        assert!(block.runs[0].style.bold);
        assert_eq!(block.runs[0].text, "hello");

        exec.execute(&mut doc, &FormatCommand::Bold);
        assert_eq!(doc.block(ids[0]).unwrap().runs.len(), 1);
        assert!(doc.is_dirty(0));
    }

    #[test]
    fn test_saved_selection_wins_over_live() {
        let (mut doc, ids) = setup(&["hello world"]);
        let mut exec = CommandExecutor::new(ModelEditing::new());
        select(&mut exec, (ids[0], 6), (ids[0], 11));
        // Focus moved to a toolbar input; the live selection is gone.
        exec.capability_mut().set_selection(None);
        exec.execute(&mut doc, &FormatCommand::Italic);
        let block = doc.block(ids[0]).unwrap();
        assert_eq!(block.runs[1].text, "world");
        assert!(block.runs[1].style.italic);
        assert_eq!(exec.capability().focused_page(), Some(0));
    }

    #[test]
    fn test_white_highlight_removes() {
        let (mut doc, ids) = setup(&["marked"]);
        let mut exec = CommandExecutor::new(ModelEditing::new());
        select(&mut exec, (ids[0], 0), (ids[0], 6));
        exec.execute(&mut doc, &FormatCommand::Highlight(Color::YELLOW));
        assert_eq!(doc.block(ids[0]).unwrap().runs[0].style.highlight, Some(Color::YELLOW));
        exec.execute(&mut doc, &FormatCommand::Highlight(Color::WHITE));
        assert!(doc.block(ids[0]).unwrap().runs[0].style.is_plain());
    }

    #[test]
    fn test_heading_keeps_text() {
        let (mut doc, ids) = setup(&["Title", "body"]);
        let mut exec = CommandExecutor::new(ModelEditing::new());
        select(&mut exec, (ids[0], 2), (ids[0], 2));
        exec.execute(&mut doc, &FormatCommand::Heading(HeadingLevel::H1));
        let block = doc.block(ids[0]).unwrap();
        assert_eq!(block.kind, BlockKind::Heading(HeadingLevel::H1));
        assert_eq!(block.plain_text(), "Title");
        assert_eq!(doc.block(ids[1]).unwrap().kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_align_across_blocks() {
        let (mut doc, ids) = setup(&["a", "b", "c"]);
        let mut exec = CommandExecutor::new(ModelEditing::new());
        select(&mut exec, (ids[1], 0), (ids[0], 0));
        exec.execute(&mut doc, &FormatCommand::Align(Align::Right));
        assert_eq!(doc.block(ids[0]).unwrap().align, Align::Right);
        assert_eq!(doc.block(ids[1]).unwrap().align, Align::Right);
        assert_eq!(doc.block(ids[2]).unwrap().align, Align::Left);
    }

    #[test]
    fn test_list_toggle_cycle() {
        let (mut doc, ids) = setup(&["one", "two"]);
        let mut exec = CommandExecutor::new(ModelEditing::new());
        select(&mut exec, (ids[0], 0), (ids[1], 1));

        exec.execute(&mut doc, &FormatCommand::List(ListKind::Bullet));
        assert!(
            ids.iter()
                .all(|id| doc.block(*id).unwrap().kind.is_list_item_of(ListKind::Bullet))
        );

        exec.execute(&mut doc, &FormatCommand::List(ListKind::Numbered));
        assert!(
            ids.iter()
                .all(|id| doc.block(*id).unwrap().kind.is_list_item_of(ListKind::Numbered))
        );

        exec.execute(&mut doc, &FormatCommand::List(ListKind::Numbered));
        assert!(ids.iter().all(|id| doc.block(*id).unwrap().kind == BlockKind::Paragraph));
    }

    #[test]
    fn test_block_format_on_empty_page_inserts_block() {
        let mut doc = Document::new(ChapterId(1), "c");
        doc.set_focus(Some(PageCursor::new(0, None)));
        let mut exec = CommandExecutor::new(ModelEditing::new());
        exec.execute(&mut doc, &FormatCommand::Blockquote);
        let page = doc.page(0).unwrap();
        assert_eq!(page.region.len(), 1);
        let id = page.region.leading().unwrap();
        assert_eq!(doc.block(id).unwrap().kind, BlockKind::Quote);
    }

    #[test]
    fn test_rule_inserted_after_block() {
        let (mut doc, ids) = setup(&["a", "b"]);
        let mut exec = CommandExecutor::new(ModelEditing::new());
        select(&mut exec, (ids[0], 1), (ids[0], 1));
        exec.execute(&mut doc, &FormatCommand::Rule);
        let kinds: Vec<_> = doc
            .page(0)
            .unwrap()
            .region
            .blocks(doc.arena())
            .map(|b| b.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Paragraph, BlockKind::Rule, BlockKind::Paragraph]
        );
    }

    #[test]
    fn test_locked_page_rejected() {
        let (mut doc, ids) = setup(&["a"]);
        doc.set_locked(0, true).unwrap();
        let mut exec = CommandExecutor::new(ModelEditing::new());
        select(&mut exec, (ids[0], 0), (ids[0], 1));
        assert_eq!(
            exec.execute(&mut doc, &FormatCommand::Bold),
            CommandOutcome::Rejected(EditError::PageLocked(0))
        );
        assert!(doc.block(ids[0]).unwrap().runs[0].style.is_plain());
    }

    #[test]
    fn test_no_target() {
        let (mut doc, _) = setup(&["a"]);
        let mut exec = CommandExecutor::new(ModelEditing::new());
        assert_eq!(exec.execute(&mut doc, &FormatCommand::Bold), CommandOutcome::NoTarget);
    }

    /// A host whose formatting primitive throws.
    #[derive(Default)]
    struct Broken {
        selection: Option<Selection>,
    }

    impl EditingCapability for Broken {
        fn selection(&self) -> Option<Selection> {
            self.selection
        }

        fn set_selection(&mut self, selection: Option<Selection>) {
            self.selection = selection;
        }

        fn focus(&mut self, _page: usize) -> Result<(), PlatformError> {
            Ok(())
        }

        fn apply_inline_style(&mut self, _: &InlineFormat) -> Result<NativeOutcome, PlatformError> {
            Err("execCommand threw".into())
        }

        fn apply_block_style(&mut self, _: &BlockFormat) -> Result<NativeOutcome, PlatformError> {
            Ok(NativeOutcome::Applied)
        }

        fn toggle_list(&mut self, _: ListKind) -> Result<NativeOutcome, PlatformError> {
            Ok(NativeOutcome::Applied)
        }
    }

    #[test]
    fn test_capability_failure_reports_notice() {
        let (mut doc, ids) = setup(&["a"]);
        doc.reconcile(&CharBudget::new(100));
        let mut exec = CommandExecutor::new(Broken::default());
        exec.capability_mut().set_selection(Some(Selection::new(
            NodePosition::new(ids[0], 0),
            NodePosition::new(ids[0], 1),
        )));
        exec.save_selection(0);

        match exec.execute(&mut doc, &FormatCommand::Bold) {
            CommandOutcome::Failed { notice } => assert!(notice.contains("execCommand threw")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(doc.dirty_pages().count(), 0);

        assert_eq!(
            exec.execute(&mut doc, &FormatCommand::Blockquote),
            CommandOutcome::Applied { page: 0, native: true }
        );
        // Native application leaves the model to the host.
        assert_eq!(doc.block(ids[0]).unwrap().kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_slash_command_on_empty_block() {
        let (mut doc, ids) = setup(&[""]);
        let mut exec = CommandExecutor::new(ModelEditing::new());
        select(&mut exec, (ids[0], 0), (ids[0], 0));
        exec.execute_slash(&mut doc, SlashCommand::Heading2);
        assert_eq!(doc.page(0).unwrap().region.len(), 1);
        assert_eq!(
            doc.block(ids[0]).unwrap().kind,
            BlockKind::Heading(HeadingLevel::H2)
        );
    }

    #[test]
    fn test_slash_command_after_text() {
        let (mut doc, ids) = setup(&["intro"]);
        let mut exec = CommandExecutor::new(ModelEditing::new());
        select(&mut exec, (ids[0], 5), (ids[0], 5));
        exec.execute_slash(&mut doc, SlashCommand::BulletList);
        let page = doc.page(0).unwrap();
        assert_eq!(page.region.len(), 2);
        let new = page.region.get(1).unwrap();
        assert_eq!(doc.block(new).unwrap().kind, BlockKind::ListItem(ListKind::Bullet));
        assert_eq!(exec.saved_selection().map(|s| s.selection.focus.node), Some(new));
    }

    #[test]
    fn test_caret_block_is_found_after_it_moves_up() {
        let mut doc = Document::new(ChapterId(1), "c");
        doc.add_page();
        doc.add_page();
        for (page, texts) in [&["aaaa", "bbbb"][..], &["cc", "dddd"], &["eeee"]]
            .into_iter()
            .enumerate()
        {
            doc.set_page_blocks(page, texts.iter().map(|t| Block::paragraph(*t)))
                .unwrap();
        }
        let measure = CharBudget::new(8);
        doc.reconcile(&measure);
        let first = doc.page(0).unwrap().region.leading().unwrap();
        let caret = doc.page(1).unwrap().region.leading().unwrap();
        doc.set_focus(Some(PageCursor::new(1, Some(NodePosition::new(caret, 1)))));

        doc.remove_block(0, first).unwrap();
        doc.reconcile(&measure);
        assert_eq!(doc.locate(caret), Some((0, 1)));

        let mut exec = CommandExecutor::new(ModelEditing::new());
        assert_eq!(
            exec.execute(&mut doc, &FormatCommand::Heading(HeadingLevel::H1)),
            CommandOutcome::Applied { page: 0, native: false }
        );
        assert_eq!(
            doc.block(caret).unwrap().kind,
            BlockKind::Heading(HeadingLevel::H1)
        );
        assert_eq!(doc.page(1).unwrap().region.len(), 2);
        assert_eq!(doc.page_text(1).unwrap(), "dddd\neeee");
    }

    #[test]
    fn test_inline_format_without_selection_gives_notice() {
        let (mut doc, ids) = setup(&["hello"]);
        doc.reconcile(&CharBudget::new(100));
        doc.set_focus(Some(PageCursor::new(0, Some(NodePosition::new(ids[0], 2)))));
        let mut exec = CommandExecutor::new(ModelEditing::new());

        match exec.execute(&mut doc, &FormatCommand::Bold) {
            CommandOutcome::Failed { notice } => assert!(notice.contains("bold")),
            other => panic!("expected a notice, got {other:?}"),
        }
        assert_eq!(doc.dirty_pages().count(), 0);
        assert!(doc.block(ids[0]).unwrap().runs[0].style.is_plain());
    }
}
