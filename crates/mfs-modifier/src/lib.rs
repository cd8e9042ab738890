//! Copy-on-write editing of MFS file trees.
//!
//! A file's content is a balanced tree of immutable nodes. This crate
//! provides the pieces that turn byte-level edits into new trees:
//!
//! - [`Chunker`] / [`FixedSizeChunker`] -- where new data is split into leaves
//! - [`layout`] -- building a balanced tree over a sequence of leaves
//! - [`Modifier`] / [`DagModifier`] -- a stateful editor bound to one
//!   snapshot that materializes a new root on flush
//! - [`ModifierConfig`] -- chunk size and fan-out, loadable from TOML

pub mod chunker;
pub mod config;
pub mod error;
pub mod layout;
pub mod modifier;

mod index;

pub use chunker::{Chunker, FixedSizeChunker};
pub use config::ModifierConfig;
pub use error::{ModifierError, ModifierResult};
pub use modifier::{DagModifier, Modifier};
