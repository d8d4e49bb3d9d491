//! Platform abstraction traits for editor operations.
//!
//! These traits define the interface between the editor logic and the host
//! that actually renders pages (browser DOM, native UI, a terminal, tests).
//! The reflow engine depends on [`LayoutMeasure`] and the command executor on
//! [`EditingCapability`]; neither touches global host state directly.

use thiserror::Error;

use crate::actions::{BlockFormat, InlineFormat};
use crate::arena::NodeArena;
use crate::region::TextRegion;
use crate::types::{ListKind, Selection};

/// Error type for platform operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// Measures rendered content against a page's capacity.
///
/// Measurement needs accurate geometry, so hosts should only be asked after
/// layout has settled; see [`Document::reconcile`](crate::Document::reconcile).
pub trait LayoutMeasure {
    /// How far the region's content exceeds its allotted capacity.
    ///
    /// Zero means the content fits. An error means the region cannot be
    /// measured right now (for example it is detached from the render tree);
    /// callers treat that as no overflow.
    fn overflow(&self, region: &TextRegion, arena: &NodeArena) -> Result<u32, PlatformError>;
}

impl<M: LayoutMeasure + ?Sized> LayoutMeasure for &M {
    fn overflow(&self, region: &TextRegion, arena: &NodeArena) -> Result<u32, PlatformError> {
        (**self).overflow(region, arena)
    }
}

/// What a native editing primitive did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOutcome {
    /// The host applied the change itself and will report the resulting
    /// content through [`Document::set_page_blocks`](crate::Document::set_page_blocks).
    Applied,
    /// The host has no primitive for this; the model fallback runs.
    Unsupported,
}

/// Host selection and rich-text editing primitives.
///
/// The browser implementation wraps the Selection API and `execCommand`;
/// [`ModelEditing`] is a headless implementation with no native primitives.
pub trait EditingCapability {
    /// The live selection, if the host has one.
    fn selection(&self) -> Option<Selection>;

    /// Place the host selection.
    fn set_selection(&mut self, selection: Option<Selection>);

    /// Give keyboard focus to a page's text region.
    fn focus(&mut self, page: usize) -> Result<(), PlatformError>;

    fn apply_inline_style(&mut self, format: &InlineFormat) -> Result<NativeOutcome, PlatformError>;

    fn apply_block_style(&mut self, format: &BlockFormat) -> Result<NativeOutcome, PlatformError>;

    fn toggle_list(&mut self, kind: ListKind) -> Result<NativeOutcome, PlatformError>;
}

/// In-memory editing capability: tracks selection and focus, and leaves all
/// formatting to the model fallback.
#[derive(Debug, Clone, Default)]
pub struct ModelEditing {
    selection: Option<Selection>,
    focused: Option<usize>,
}

impl ModelEditing {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page that last received focus.
    pub fn focused_page(&self) -> Option<usize> {
        self.focused
    }
}

impl EditingCapability for ModelEditing {
    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    fn focus(&mut self, page: usize) -> Result<(), PlatformError> {
        self.focused = Some(page);
        Ok(())
    }

    fn apply_inline_style(
        &mut self,
        _format: &InlineFormat,
    ) -> Result<NativeOutcome, PlatformError> {
        Ok(NativeOutcome::Unsupported)
    }

    fn apply_block_style(&mut self, _format: &BlockFormat) -> Result<NativeOutcome, PlatformError> {
        Ok(NativeOutcome::Unsupported)
    }

    fn toggle_list(&mut self, _kind: ListKind) -> Result<NativeOutcome, PlatformError> {
        Ok(NativeOutcome::Unsupported)
    }
}
