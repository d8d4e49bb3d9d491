//! Per-chapter node store.
//!
//! Pages never own blocks directly; they hold [`NodeId`]s into the chapter's
//! [`NodeArena`]. Moving content between pages is a transfer of an id from
//! one region to another, which keeps ids (and selections built on them)
//! valid across reflow.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fragment::Block;
use crate::types::NodeId;

/// Owns every block of one chapter, addressed by stable ids.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeArena {
    nodes: HashMap<NodeId, Block>,
    next_id: u64,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a block and return its fresh id.
    pub fn alloc(&mut self, block: Block) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, block);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Block> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Block> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Release a block. Its id is never handed out again.
    pub fn remove(&mut self, id: NodeId) -> Option<Block> {
        self.nodes.remove(&id)
    }

    /// Put back a block previously taken out with [`remove`](Self::remove),
    /// under its old id.
    ///
    /// Returns false (and stores nothing) if the id was never allocated by
    /// this arena or is currently in use.
    pub fn restore(&mut self, id: NodeId, block: Block) -> bool {
        if id.0 >= self.next_id || self.nodes.contains_key(&id) {
            return false;
        }
        self.nodes.insert(id, block);
        true
    }

    /// Copy a block under a fresh id. This is the only way content is
    /// duplicated rather than moved.
    pub fn duplicate(&mut self, id: NodeId) -> Option<NodeId> {
        let copy = self.nodes.get(&id)?.clone();
        Some(self.alloc(copy))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
