//! Upward link from a file to whatever names it.
//!
//! A [`File`](crate::File) holds its parent as a `Weak<dyn ParentCloser>`:
//! a capability to report new roots, not ownership. Directories, mount
//! roots, or plain closures can implement it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use mfs_store::Node;
use mfs_types::NodeId;

use crate::error::FileResult;

/// Receives a child's new root after a flush.
///
/// `close_child` runs while the notifying descriptor still holds the
/// child's access lock, and for writable descriptors that lock is
/// exclusive. Implementations must not call [`File::open`],
/// [`File::flush`] or [`File::sync`] on the same child, as those wait for
/// that lock and never return. Reading the child's root through
/// [`File::node_id`], [`File::get_node`] or [`File::size`] is fine.
///
/// [`File::open`]: crate::File::open
/// [`File::flush`]: crate::File::flush
/// [`File::sync`]: crate::File::sync
/// [`File::node_id`]: crate::File::node_id
/// [`File::get_node`]: crate::File::get_node
/// [`File::size`]: crate::File::size
pub trait ParentCloser: Send + Sync {
    /// Record `node` as the current root of the child called `name`.
    fn close_child(&self, name: &str, node: &Node) -> FileResult<()>;
}

impl<F> ParentCloser for F
where
    F: Fn(&str, &Node) -> FileResult<()> + Send + Sync,
{
    fn close_child(&self, name: &str, node: &Node) -> FileResult<()> {
        self(name, node)
    }
}

/// Flat name-to-root table acting as the parent of any number of files.
#[derive(Debug, Default)]
pub struct Namespace {
    entries: RwLock<HashMap<String, NodeId>>,
    notifications: AtomicU64,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest root recorded for `name`.
    pub fn entry(&self, name: &str) -> Option<NodeId> {
        self.entries.read().get(name).copied()
    }

    /// Sorted child names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Total notifications received.
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::SeqCst)
    }
}

impl ParentCloser for Namespace {
    fn close_child(&self, name: &str, node: &Node) -> FileResult<()> {
        let id = node.id();
        self.entries.write().insert(name.to_string(), id);
        self.notifications.fetch_add(1, Ordering::SeqCst);
        debug!(child = name, root = %id.short_hex(), "recorded child root");
        Ok(())
    }
}
