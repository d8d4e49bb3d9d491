//! Text regions: the editable surface of one page.
//!
//! A [`TextRegion`] is an ordered list of block ids. It is the unit of
//! measurement and mutation for reflow: the engine only ever takes blocks off
//! the trailing or leading edge and puts them on a neighbour's edge.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::arena::NodeArena;
use crate::fragment::Block;
use crate::types::{NodeId, NodePosition, Selection};

/// Ordered top-level blocks of one page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextRegion {
    nodes: VecDeque<NodeId>,
}

impl TextRegion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No child nodes at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = NodeId> + ExactSizeIterator + '_ {
        self.nodes.iter().copied()
    }

    pub fn leading(&self) -> Option<NodeId> {
        self.nodes.front().copied()
    }

    pub fn trailing(&self) -> Option<NodeId> {
        self.nodes.back().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| *n == id)
    }

    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    pub fn append_trailing(&mut self, id: NodeId) {
        self.nodes.push_back(id);
    }

    /// Take the last block. `None` when the region is empty, which tells the
    /// caller to stop migrating.
    pub fn remove_trailing(&mut self) -> Option<NodeId> {
        self.nodes.pop_back()
    }

    pub fn prepend_leading(&mut self, id: NodeId) {
        self.nodes.push_front(id);
    }

    pub fn remove_leading(&mut self) -> Option<NodeId> {
        self.nodes.pop_front()
    }

    /// Insert at `index`, clamped to the end.
    pub fn insert(&mut self, index: usize, id: NodeId) {
        let index = index.min(self.nodes.len());
        self.nodes.insert(index, id);
    }

    pub fn remove(&mut self, id: NodeId) -> bool {
        match self.position_of(id) {
            Some(index) => {
                self.nodes.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every node, returning them in order.
    pub fn clear(&mut self) -> Vec<NodeId> {
        self.nodes.drain(..).collect()
    }

    /// Resolve every id to its block, skipping ids missing from the arena.
    pub fn blocks<'a>(&'a self, arena: &'a NodeArena) -> impl Iterator<Item = &'a Block> + 'a {
        self.nodes.iter().filter_map(|id| arena.get(*id))
    }

    /// Plain-text projection: blocks joined with `\n`.
    pub fn plain_text(&self, arena: &NodeArena) -> String {
        self.blocks(arena)
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn char_len(&self, arena: &NodeArena) -> usize {
        self.blocks(arena).map(Block::char_len).sum()
    }

    pub fn word_count(&self, arena: &NodeArena) -> usize {
        self.blocks(arena).map(Block::word_count).sum()
    }

    /// Start of the region's content, if it has any.
    pub fn start_position(&self) -> Option<NodePosition> {
        self.leading().map(NodePosition::start_of)
    }

    /// Order a selection's ends by document order within this region.
    ///
    /// Returns `None` if either end is not in this region.
    pub fn order_selection(&self, selection: &Selection) -> Option<(NodePosition, NodePosition)> {
        let a = self.position_of(selection.anchor.node)?;
        let f = self.position_of(selection.focus.node)?;
        let anchor_first =
            a < f || (a == f && selection.anchor.offset <= selection.focus.offset);
        if anchor_first {
            Some((selection.anchor, selection.focus))
        } else {
            Some((selection.focus, selection.anchor))
        }
    }

    /// The ids covered by the selection, in order (inclusive of both ends).
    pub fn covered_nodes(&self, selection: &Selection) -> Option<Vec<NodeId>> {
        let (start, end) = self.order_selection(selection)?;
        let from = self.position_of(start.node)?;
        let to = self.position_of(end.node)?;
        Some(self.nodes.range(from..=to).copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_with(arena: &mut NodeArena, texts: &[&str]) -> TextRegion {
        TextRegion::from_nodes(texts.iter().map(|t| arena.alloc(Block::paragraph(*t))))
    }

    #[test]
    fn test_trailing_to_leading_preserves_order() {
        let mut arena = NodeArena::new();
        let mut page = region_with(&mut arena, &["a", "b", "c", "d"]);
        let mut next = region_with(&mut arena, &["e"]);

        for _ in 0..2 {
            let id = page.remove_trailing().unwrap();
            next.prepend_leading(id);
        }

        assert_eq!(page.plain_text(&arena), "a\nb");
        assert_eq!(next.plain_text(&arena), "c\nd\ne");
    }

    #[test]
    fn test_remove_trailing_on_empty() {
        let mut region = TextRegion::new();
        assert!(region.remove_trailing().is_none());
        assert!(region.remove_leading().is_none());
        assert!(region.start_position().is_none());
    }

    #[test]
    fn test_order_selection_across_blocks() {
        let mut arena = NodeArena::new();
        let region = region_with(&mut arena, &["one", "two", "three"]);
        let first = region.get(0).unwrap();
        let last = region.get(2).unwrap();

        let backwards = Selection::new(NodePosition::new(last, 2), NodePosition::new(first, 1));
        let (start, end) = region.order_selection(&backwards).unwrap();
        assert_eq!(start, NodePosition::new(first, 1));
        assert_eq!(end, NodePosition::new(last, 2));
        assert_eq!(region.covered_nodes(&backwards).unwrap().len(), 3);

        let foreign = Selection::collapsed(NodePosition::start_of(NodeId(1000)));
        assert!(region.order_selection(&foreign).is_none());
    }

    #[test]
    fn test_counts() {
        let mut arena = NodeArena::new();
        let region = region_with(&mut arena, &["one two", "three"]);
        assert_eq!(region.char_len(&arena), 12);
        assert_eq!(region.word_count(&arena), 3);
    }
}
