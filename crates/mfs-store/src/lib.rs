//! Immutable node model and content-addressed node storage for MFS.
//!
//! Every block of a file lives in the store as an immutable [`Node`]
//! addressed by the hash of its content. Editing a file never mutates a
//! node; it writes new nodes and produces a new root address.
//!
//! # Node Kinds
//!
//! - [`StructuredNode`] -- an [`FsNode`] payload (type tag, inline data,
//!   child block sizes) plus ordered [`Link`]s to children
//! - [`RawNode`] -- an unwrapped leaf holding only bytes
//!
//! # Storage Backends
//!
//! All backends implement the [`NodeStore`] trait:
//!
//! - [`InMemoryNodeStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Nodes are immutable once written (content-addressing guarantees this).
//! 2. Concurrent reads are always safe.
//! 3. The store never interprets node payloads.
//! 4. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod fsnode;
pub mod memory;
pub mod node;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use fsnode::{FsNode, FsNodeType};
pub use memory::InMemoryNodeStore;
pub use node::{Link, Node, RawNode, StructuredNode};
pub use traits::NodeStore;
