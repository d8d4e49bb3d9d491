//! folio-assist: client for the text transformation service behind the
//! editor's rewrite and proofread actions.
//!
//! [`GeminiClient`] implements [`folio_core::TextTransformer`], so it plugs
//! straight into [`folio_core::AssistSession::run`].

pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod response;

pub use client::GeminiClient;
pub use config::AssistConfig;
pub use error::TransformError;
