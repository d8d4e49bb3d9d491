//! folio-core: headless paginated chapter editor.
//!
//! This crate provides:
//! - `Document` - a chapter as an ordered run of pages over one node arena
//! - `Book` - the chapters of a manuscript
//! - the reflow engine (reflow-down, consolidate-up, pruning, `reconcile`)
//! - `CommandExecutor` - formatting through an injected `EditingCapability`
//! - `AssistSession` - preview/approve/discard over a `TextTransformer`
//! - `LayoutMeasure` implementations, HTML projection and Markdown import

pub mod actions;
pub mod arena;
pub mod assist;
pub mod book;
pub mod document;
pub mod error;
pub mod execute;
pub mod fragment;
pub mod html;
pub mod markdown;
pub mod measure;
pub mod page;
pub mod platform;
pub mod reflow;
pub mod region;
pub mod types;

pub use actions::{BlockFormat, CommandClass, FormatCommand, InlineFormat, SlashCommand};
pub use arena::NodeArena;
pub use assist::{
    AssistAction, AssistOutput, AssistRequest, AssistSession, AssistState, ProofreadIssue,
    RequestTicket, TextTransformer, Tone, apply_fix,
};
pub use book::Book;
pub use document::Document;
pub use error::EditError;
pub use execute::{CommandExecutor, CommandOutcome, SavedSelection};
pub use fragment::{Block, BlockKind, InlineRun, InlineStyle, count_words};
pub use measure::{CharBudget, LineBudget, PaginationConfig};
pub use page::Page;
pub use platform::{EditingCapability, LayoutMeasure, ModelEditing, NativeOutcome, PlatformError};
pub use reflow::{
    ReconcileReport, ReflowReport, ReflowWarning, consolidate_up, prune_empty_tail, reflow_down,
};
pub use region::TextRegion;
pub use smol_str::SmolStr;
pub use types::{
    Align, ChapterId, Color, HeadingLevel, ListKind, NodeId, NodePosition, PageCursor, Selection,
};
