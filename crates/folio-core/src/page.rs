//! A page: one text region, a lock flag, and its persisted content.

use serde::{Deserialize, Serialize};

use crate::region::TextRegion;

/// One visual page of a chapter.
///
/// `region` is the live content. `stored` is the serialized content last
/// persisted into the document state; it only changes when the document
/// persists the page, so uncommitted changes (such as an assist preview)
/// never leak into it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub region: TextRegion,
    /// A locked page refuses content mutation and is skipped by reflow.
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub stored: String,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(region: TextRegion) -> Self {
        Self {
            region,
            locked: false,
            stored: String::new(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// No child nodes, which also means no text.
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }
}
