//! Mutable files over an immutable, content-addressed node graph.
//!
//! A [`File`] owns the most recently committed root node of one logical
//! file. Callers [`open`](File::open) it to get a [`FileDescriptor`], edit
//! through the descriptor, and [`flush`](FileDescriptor::flush) to commit a
//! new root, which is then reported to the file's [`ParentCloser`].
//!
//! # Locking
//!
//! Two locks guard a file:
//!
//! - the **access lock**, a reader/writer lock held for a descriptor's whole
//!   lifetime: any number of read-only descriptors, or exactly one writable
//!   descriptor;
//! - the **node mutex**, held only while the current root is read or
//!   replaced, so [`File::size`] and [`File::get_node`] never wait on an
//!   open writer.
//!
//! The parent is notified without holding the node mutex.

pub mod descriptor;
pub mod error;
pub mod file;
pub mod mode;
pub mod parent;

pub use descriptor::FileDescriptor;
pub use error::{FileError, FileResult};
pub use file::File;
pub use mode::OpenMode;
pub use parent::{Namespace, ParentCloser};
