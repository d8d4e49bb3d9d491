//! Chapter documents: an ordered run of pages over one node arena.
//!
//! Edits are the first phase of a two-phase commit. They mutate the model
//! immediately and record which pages they touched; the second phase,
//! [`Document::reconcile`], runs once the host knows the layout and settles
//! overflow, shrinkage and persistence in one pass.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::arena::NodeArena;
use crate::error::EditError;
use crate::fragment::{Block, count_words};
use crate::html;
use crate::page::Page;
use crate::platform::LayoutMeasure;
use crate::reflow::{self, ReconcileReport};
use crate::region::TextRegion;
use crate::types::{ChapterId, NodeId, NodePosition, PageCursor, Selection};

/// One chapter: at least one page, and the arena holding every block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: ChapterId,
    pub title: String,
    #[serde(deserialize_with = "non_empty_pages")]
    pub(crate) pages: Vec<Page>,
    pub(crate) arena: NodeArena,
    /// Pages edited since the last reconcile.
    #[serde(skip)]
    pub(crate) dirty: BTreeSet<usize>,
    #[serde(skip)]
    pub(crate) focus: Option<PageCursor>,
}

fn non_empty_pages<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Page>, D::Error> {
    let mut pages = Vec::<Page>::deserialize(deserializer)?;
    if pages.is_empty() {
        pages.push(Page::new());
    }
    Ok(pages)
}

impl Document {
    /// A chapter with a single empty page.
    pub fn new(id: ChapterId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            pages: vec![Page::new()],
            arena: NodeArena::new(),
            dirty: BTreeSet::new(),
            focus: None,
        }
    }

    /// A chapter whose first page holds all of `blocks`.
    ///
    /// The page is marked dirty, so the first reconcile paginates it.
    pub fn from_blocks(
        id: ChapterId,
        title: impl Into<String>,
        blocks: impl IntoIterator<Item = Block>,
    ) -> Self {
        let mut doc = Self::new(id, title);
        for block in blocks {
            let node = doc.arena.alloc(block);
            doc.pages[0].region.append_trailing(node);
        }
        doc.dirty.insert(0);
        doc
    }

    // === Queries ===

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn block(&self, id: NodeId) -> Option<&Block> {
        self.arena.get(id)
    }

    /// Find which page holds a block, and at what index within the page.
    pub fn locate(&self, id: NodeId) -> Option<(usize, usize)> {
        self.pages
            .iter()
            .enumerate()
            .find_map(|(page, p)| p.region.position_of(id).map(|index| (page, index)))
    }

    /// Plain text of the whole chapter: every block of every page, joined
    /// with `\n`. Moving blocks between pages never changes it.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .flat_map(|p| p.region.blocks(&self.arena))
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn page_text(&self, index: usize) -> Option<String> {
        self.pages.get(index).map(|p| p.region.plain_text(&self.arena))
    }

    pub fn word_count(&self) -> usize {
        count_words(&self.plain_text())
    }

    pub fn page_word_count(&self, index: usize) -> Option<usize> {
        self.pages.get(index).map(|p| p.region.word_count(&self.arena))
    }

    pub fn is_dirty(&self, index: usize) -> bool {
        self.dirty.contains(&index)
    }

    pub fn dirty_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.dirty.iter().copied()
    }

    /// Where the editor's focus is, as last moved by an edit or by reflow.
    pub fn focus(&self) -> Option<PageCursor> {
        self.focus
    }

    pub fn set_focus(&mut self, focus: Option<PageCursor>) {
        self.focus = focus;
    }

    // === Checks ===

    pub(crate) fn check_index(&self, index: usize) -> Result<(), EditError> {
        if index < self.pages.len() {
            Ok(())
        } else {
            Err(EditError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })
        }
    }

    /// The page exists and accepts content mutation.
    pub(crate) fn check_editable(&self, index: usize) -> Result<(), EditError> {
        self.check_index(index)?;
        if self.pages[index].locked {
            return Err(EditError::PageLocked(index));
        }
        Ok(())
    }

    /// Locate a position and verify it addresses an editable page and an
    /// offset inside its block.
    fn resolve(&self, position: NodePosition) -> Result<usize, EditError> {
        let (page, _) = self
            .locate(position.node)
            .ok_or(EditError::UnknownNode(position.node))?;
        self.check_editable(page)?;
        let len = self
            .arena
            .get(position.node)
            .map(Block::char_len)
            .ok_or(EditError::UnknownNode(position.node))?;
        if position.offset > len {
            return Err(EditError::OffsetOutOfRange {
                node: position.node,
                offset: position.offset,
                len,
            });
        }
        Ok(page)
    }

    pub(crate) fn mark_dirty(&mut self, index: usize) {
        self.dirty.insert(index);
    }

    pub(crate) fn block_mut(&mut self, id: NodeId) -> Option<&mut Block> {
        self.arena.get_mut(id)
    }

    // === Block edits ===

    /// Append a block to the end of a page.
    pub fn push_block(&mut self, page: usize, block: Block) -> Result<NodeId, EditError> {
        self.check_editable(page)?;
        let id = self.arena.alloc(block);
        self.pages[page].region.append_trailing(id);
        self.mark_dirty(page);
        Ok(id)
    }

    /// Insert a block at `index` within a page (clamped to the end).
    pub fn insert_block(
        &mut self,
        page: usize,
        index: usize,
        block: Block,
    ) -> Result<NodeId, EditError> {
        self.check_editable(page)?;
        let id = self.arena.alloc(block);
        self.pages[page].region.insert(index, id);
        self.mark_dirty(page);
        Ok(id)
    }

    /// Remove a block from a page and release it from the arena.
    pub fn remove_block(&mut self, page: usize, id: NodeId) -> Result<Block, EditError> {
        self.check_editable(page)?;
        if !self.pages[page].region.remove(id) {
            return Err(EditError::NodeNotOnPage { node: id, page });
        }
        self.mark_dirty(page);
        self.arena.remove(id).ok_or(EditError::UnknownNode(id))
    }

    /// Replace a page's whole content.
    ///
    /// This is how a host that edits natively reports the resulting content
    /// back. The page's previous blocks are released.
    pub fn set_page_blocks(
        &mut self,
        page: usize,
        blocks: impl IntoIterator<Item = Block>,
    ) -> Result<Vec<NodeId>, EditError> {
        self.check_editable(page)?;
        for old in self.pages[page].region.clear() {
            self.arena.remove(old);
        }
        let ids: Vec<NodeId> = blocks.into_iter().map(|b| self.arena.alloc(b)).collect();
        for id in &ids {
            self.pages[page].region.append_trailing(*id);
        }
        self.mark_dirty(page);
        Ok(ids)
    }

    /// Type text at a position.
    pub fn insert_text(&mut self, position: NodePosition, text: &str) -> Result<(), EditError> {
        let page = self.resolve(position)?;
        if let Some(block) = self.arena.get_mut(position.node) {
            block.insert_text(position.offset, text);
        }
        self.mark_dirty(page);
        self.focus = Some(PageCursor::new(
            page,
            Some(NodePosition::new(
                position.node,
                position.offset + text.chars().count(),
            )),
        ));
        Ok(())
    }

    /// Delete the selected content of a page.
    ///
    /// A selection spanning several blocks joins the first and last block;
    /// blocks strictly between them are released. Returns the collapsed
    /// caret position.
    pub fn delete_range(
        &mut self,
        page: usize,
        selection: &Selection,
    ) -> Result<NodePosition, EditError> {
        self.check_editable(page)?;
        let region = &self.pages[page].region;
        let (start, end) = region
            .order_selection(selection)
            .ok_or(EditError::NodeNotOnPage {
                node: selection.anchor.node,
                page,
            })?;
        self.resolve(start)?;
        self.resolve(end)?;

        if start.node == end.node {
            if let Some(block) = self.arena.get_mut(start.node) {
                block.delete_range(start.offset..end.offset);
            }
        } else {
            let covered = region.covered_nodes(selection).unwrap_or_default();
            let tail = match self.arena.get_mut(end.node) {
                Some(last) => last.split_off(end.offset),
                None => Vec::new(),
            };
            if let Some(first) = self.arena.get_mut(start.node) {
                first.split_off(start.offset);
                first.append_runs(tail);
            }
            for id in covered.into_iter().filter(|id| *id != start.node) {
                self.pages[page].region.remove(id);
                self.arena.remove(id);
            }
        }

        self.mark_dirty(page);
        self.focus = Some(PageCursor::new(page, Some(start)));
        Ok(start)
    }

    /// Break a block in two at a position (the Enter key).
    ///
    /// The new block continues the kind of the old one, except headings and
    /// rules which continue as paragraphs. Returns the new block's id.
    pub fn split_block(&mut self, position: NodePosition) -> Result<NodeId, EditError> {
        let page = self.resolve(position)?;
        let Some(block) = self.arena.get_mut(position.node) else {
            return Err(EditError::UnknownNode(position.node));
        };
        let tail = block.split_off(position.offset);
        let mut next = Block::empty(block.kind.continuation());
        next.align = block.align;
        next.append_runs(tail);

        let id = self.arena.alloc(next);
        let index = self.pages[page]
            .region
            .position_of(position.node)
            .map_or(0, |i| i + 1);
        self.pages[page].region.insert(index, id);
        self.mark_dirty(page);
        self.focus = Some(PageCursor::new(page, Some(NodePosition::start_of(id))));
        Ok(id)
    }

    /// Replace the selected content with whole blocks (paste of rich content).
    ///
    /// The block holding the selection is split at the caret and the new
    /// blocks go between the halves. Halves left without text are dropped.
    pub fn replace_range_with_blocks(
        &mut self,
        page: usize,
        selection: &Selection,
        blocks: Vec<Block>,
    ) -> Result<Vec<NodeId>, EditError> {
        let caret = self.delete_range(page, selection)?;
        if blocks.is_empty() {
            return Ok(Vec::new());
        }
        let tail = self.split_block(caret)?;

        let mut index = self.pages[page]
            .region
            .position_of(tail)
            .unwrap_or(self.pages[page].region.len());
        let mut ids = Vec::with_capacity(blocks.len());
        for block in blocks {
            let id = self.arena.alloc(block);
            self.pages[page].region.insert(index, id);
            index += 1;
            ids.push(id);
        }

        for half in [caret.node, tail] {
            if self.arena.get(half).is_some_and(|b| b.char_len() == 0) {
                self.pages[page].region.remove(half);
                self.arena.remove(half);
            }
        }

        if let Some(last) = ids.last() {
            let len = self.arena.get(*last).map_or(0, Block::char_len);
            self.focus = Some(PageCursor::new(page, Some(NodePosition::new(*last, len))));
        }
        Ok(ids)
    }

    // === Page operations ===

    /// Append an empty page; returns its index.
    pub fn add_page(&mut self) -> usize {
        self.pages.push(Page::new());
        self.pages.len() - 1
    }

    /// Insert an empty page right after `index`; returns the new index.
    pub fn insert_page_after(&mut self, index: usize) -> Result<usize, EditError> {
        self.check_index(index)?;
        self.insert_page_at(index + 1);
        Ok(index + 1)
    }

    /// Insert an empty page at `at`, shifting dirty marks and focus.
    pub(crate) fn insert_page_at(&mut self, at: usize) {
        let at = at.min(self.pages.len());
        self.pages.insert(at, Page::new());
        self.dirty = self
            .dirty
            .iter()
            .map(|&i| if i >= at { i + 1 } else { i })
            .collect();
        if let Some(focus) = &mut self.focus {
            if focus.page >= at {
                focus.page += 1;
            }
        }
    }

    /// Copy a page (with fresh block ids) right after itself.
    ///
    /// The copy starts unlocked. Returns the new page's index.
    pub fn duplicate_page(&mut self, index: usize) -> Result<usize, EditError> {
        self.check_index(index)?;
        let source: Vec<NodeId> = self.pages[index].region.nodes().collect();
        let copies: Vec<NodeId> = source
            .into_iter()
            .filter_map(|id| self.arena.duplicate(id))
            .collect();
        self.insert_page_at(index + 1);
        self.pages[index + 1].region = TextRegion::from_nodes(copies);
        self.mark_dirty(index + 1);
        Ok(index + 1)
    }

    /// Delete a page and release its blocks.
    ///
    /// The only page of a chapter cannot be deleted, nor can a locked page.
    pub fn delete_page(&mut self, index: usize) -> Result<(), EditError> {
        if self.pages.len() == 1 {
            return Err(EditError::LastPage);
        }
        self.check_editable(index)?;
        let page = self.pages.remove(index);
        for id in page.region.nodes() {
            self.arena.remove(id);
        }
        self.dirty = self
            .dirty
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();
        if let Some(focus) = self.focus {
            self.focus = if focus.page == index {
                let page = index.min(self.pages.len() - 1);
                Some(PageCursor::new(page, self.pages[page].region.start_position()))
            } else if focus.page > index {
                Some(PageCursor::new(focus.page - 1, focus.position))
            } else {
                Some(focus)
            };
        }
        Ok(())
    }

    pub fn set_locked(&mut self, index: usize, locked: bool) -> Result<(), EditError> {
        self.check_index(index)?;
        self.pages[index].locked = locked;
        Ok(())
    }

    /// Flip a page's lock; returns the new state.
    pub fn toggle_lock(&mut self, index: usize) -> Result<bool, EditError> {
        self.check_index(index)?;
        let page = &mut self.pages[index];
        page.locked = !page.locked;
        Ok(page.locked)
    }

    // === Persistence boundary ===

    /// Write a page's live content into its stored form.
    ///
    /// A page holding an uncommitted assist preview keeps its previous stored
    /// content until the preview is approved or discarded.
    pub fn persist_page(&mut self, index: usize) -> Result<(), EditError> {
        self.check_index(index)?;
        self.persist_unchecked(index);
        Ok(())
    }

    pub(crate) fn persist_unchecked(&mut self, index: usize) {
        let Some(page) = self.pages.get(index) else {
            return;
        };
        if page.region.blocks(&self.arena).any(Block::has_preview) {
            tracing::debug!(page = index, "preview pending, keeping stored content");
            return;
        }
        let rendered = html::render_region(&page.region, &self.arena);
        self.pages[index].stored = rendered;
    }

    pub fn persist_all(&mut self) {
        for index in 0..self.pages.len() {
            self.persist_unchecked(index);
        }
    }

    /// Every page's stored content, in page order.
    pub fn stored_content(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.stored.as_str()).collect()
    }

    // === Phase 2 ===

    /// Settle pagination after edits: reflow every dirty page, consolidate,
    /// prune, and persist what changed.
    pub fn reconcile<M: LayoutMeasure + ?Sized>(&mut self, measure: &M) -> ReconcileReport {
        reflow::reconcile(self, measure)
    }
}
