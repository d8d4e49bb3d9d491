//! Error types for document and page operations.

use thiserror::Error;

use crate::types::{ChapterId, NodeId};

/// Errors from edit operations on a document or book.
///
/// Every variant is recoverable: the operation is rejected and no state
/// changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditError {
    /// The page refuses content mutation.
    #[error("page {0} is locked")]
    PageLocked(usize),

    /// Page index past the end of the chapter.
    #[error("page {index} does not exist (chapter has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    /// The only page of a chapter cannot be deleted.
    #[error("you cannot delete the only page in a chapter")]
    LastPage,

    /// The only chapter of a book cannot be removed.
    #[error("you cannot remove the only chapter")]
    LastChapter,

    #[error("chapter {0} does not exist")]
    UnknownChapter(ChapterId),

    /// A block id that is not part of the page it was looked up in.
    #[error("node {node} is not on page {page}")]
    NodeNotOnPage { node: NodeId, page: usize },

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    /// Offset past the end of a block's text.
    #[error("offset {offset} is past the end of node {node} ({len} chars)")]
    OffsetOutOfRange {
        node: NodeId,
        offset: usize,
        len: usize,
    },

    /// The operation needs selected text and there is none.
    #[error("nothing is selected")]
    EmptySelection,

    #[error("invalid heading level {0}, expected 1-6")]
    InvalidHeadingLevel(u8),

    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
}
