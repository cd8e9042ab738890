//! The [`File`] handle: current root, access lock, and open protocol.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use mfs_modifier::{DagModifier, FixedSizeChunker, ModifierConfig};
use mfs_store::{FsNodeType, Node, NodeStore};
use mfs_types::NodeId;

use crate::descriptor::{AccessGuard, FileDescriptor};
use crate::error::{FileError, FileResult};
use crate::mode::OpenMode;
use crate::parent::ParentCloser;

/// One logical file whose content is a tree of immutable nodes.
///
/// The current root changes only when a writable descriptor flushes.
pub struct File {
    name: String,
    parent: Weak<dyn ParentCloser>,
    store: Arc<dyn NodeStore>,
    config: ModifierConfig,
    raw_leaves: bool,
    node: Mutex<Node>,
    desc_lock: Arc<RwLock<()>>,
}

impl File {
    /// Create a file named `name` under `parent`, rooted at `node`.
    ///
    /// Raw leaves are enabled when the root's address version is past `V0`.
    pub fn new(
        name: impl Into<String>,
        node: Node,
        parent: Weak<dyn ParentCloser>,
        store: Arc<dyn NodeStore>,
    ) -> Arc<Self> {
        Arc::new(Self::build(
            name.into(),
            node,
            parent,
            store,
            ModifierConfig::default(),
        ))
    }

    /// Like [`File::new`], with explicit layout tuning for every descriptor.
    pub fn with_config(
        name: impl Into<String>,
        node: Node,
        parent: Weak<dyn ParentCloser>,
        store: Arc<dyn NodeStore>,
        config: ModifierConfig,
    ) -> FileResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self::build(name.into(), node, parent, store, config)))
    }

    fn build(
        name: String,
        node: Node,
        parent: Weak<dyn ParentCloser>,
        store: Arc<dyn NodeStore>,
        config: ModifierConfig,
    ) -> Self {
        Self {
            raw_leaves: node.version().uses_raw_leaves(),
            name,
            parent,
            store,
            config,
            node: Mutex::new(node),
            desc_lock: Arc::new(RwLock::new(())),
        }
    }

    /// Name under which the parent knows this file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether new data is written as raw leaves.
    pub fn raw_leaves(&self) -> bool {
        self.raw_leaves
    }

    pub fn config(&self) -> &ModifierConfig {
        &self.config
    }

    /// Open a descriptor, blocking until the access lock is granted.
    ///
    /// Read-only descriptors share the lock; writable ones hold it
    /// exclusively until they are closed or dropped. With `full_sync` the
    /// descriptor reports every flush to the parent before returning.
    pub fn open(self: &Arc<Self>, mode: OpenMode, full_sync: bool) -> FileResult<FileDescriptor> {
        check_file_shape(&self.current())?;
        let access = match mode {
            OpenMode::ReadOnly => AccessGuard::Shared(self.desc_lock.read_arc()),
            OpenMode::WriteOnly | OpenMode::ReadWrite => {
                AccessGuard::Exclusive(self.desc_lock.write_arc())
            }
        };
        self.bind(mode, full_sync, access)
    }

    /// Open with numeric flags (see [`OpenMode::from_flags`]).
    ///
    /// Unknown flags fail before any lock is touched.
    pub fn open_with_flags(self: &Arc<Self>, flags: u32, full_sync: bool) -> FileResult<FileDescriptor> {
        let mode = OpenMode::from_flags(flags)?;
        self.open(mode, full_sync)
    }

    /// Like [`File::open`], but returns `Ok(None)` instead of waiting when
    /// the access lock is not immediately available.
    pub fn try_open(
        self: &Arc<Self>,
        mode: OpenMode,
        full_sync: bool,
    ) -> FileResult<Option<FileDescriptor>> {
        check_file_shape(&self.current())?;
        let access = match mode {
            OpenMode::ReadOnly => self.desc_lock.try_read_arc().map(AccessGuard::Shared),
            OpenMode::WriteOnly | OpenMode::ReadWrite => {
                self.desc_lock.try_write_arc().map(AccessGuard::Exclusive)
            }
        };
        match access {
            Some(access) => self.bind(mode, full_sync, access).map(Some),
            None => Ok(None),
        }
    }

    /// Build a descriptor around an acquired access lock.
    ///
    /// The modifier binds to the root as of *after* the lock was granted,
    /// so a writer always edits on top of the previous writer's commit.
    fn bind(
        self: &Arc<Self>,
        mode: OpenMode,
        full_sync: bool,
        access: AccessGuard,
    ) -> FileResult<FileDescriptor> {
        let node = self.current();
        check_file_shape(&node)?;

        let chunker = Arc::new(FixedSizeChunker::new(self.config.chunk_size));
        let mut modifier = DagModifier::new(node, self.store.clone(), chunker, self.config.clone())?;
        modifier.set_raw_leaves(self.raw_leaves);

        debug!(file = %self.name, %mode, full_sync, "opened descriptor");
        Ok(FileDescriptor::new(
            Arc::clone(self),
            Box::new(modifier),
            mode,
            full_sync,
            access,
        ))
    }

    /// Logical size of the last committed root.
    ///
    /// Unflushed edits in an open descriptor are not reflected.
    pub fn size(&self) -> FileResult<u64> {
        let node = self.node.lock();
        match &*node {
            Node::Structured(s) => {
                let fs = s.fs_node().map_err(|e| FileError::Decode(e.to_string()))?;
                if !fs.kind().is_file_like() {
                    return Err(FileError::CorruptState(format!(
                        "file {} is rooted at a {} node",
                        self.name,
                        fs.kind()
                    )));
                }
                Ok(fs.file_size())
            }
            Node::Raw(raw) => Ok(raw.len() as u64),
        }
    }

    /// The last committed root.
    pub fn get_node(&self) -> FileResult<Node> {
        Ok(self.current())
    }

    /// Address of the last committed root.
    pub fn node_id(&self) -> NodeId {
        self.node.lock().id()
    }

    /// Commit and report the current root to the parent.
    ///
    /// Opens a write-only, full-sync descriptor, flushes it, and closes it
    /// on every path. A flush error takes precedence over a close error.
    pub fn flush(self: &Arc<Self>) -> FileResult<()> {
        let mut fd = self.open(OpenMode::WriteOnly, true)?;
        let flushed = fd.flush();
        let closed = fd.close();
        flushed.and(closed)
    }

    /// Barrier: returns once no writable descriptor is open.
    pub fn sync(&self) -> FileResult<()> {
        drop(self.desc_lock.write());
        Ok(())
    }

    fn current(&self) -> Node {
        self.node.lock().clone()
    }

    /// Install a newly committed root.
    pub(crate) fn store_node(&self, node: Node) {
        let id = node.id();
        *self.node.lock() = node;
        debug!(file = %self.name, root = %id.short_hex(), "installed new root");
    }

    /// Report `node` to the parent. A parent that has gone away is skipped.
    pub(crate) fn notify_parent(&self, node: &Node) -> FileResult<()> {
        match self.parent.upgrade() {
            Some(parent) => parent.close_child(&self.name, node),
            None => {
                debug!(file = %self.name, "parent dropped; skipping notification");
                Ok(())
            }
        }
    }
}

/// Accept structured `File`/`Raw` nodes and raw leaves.
fn check_file_shape(node: &Node) -> FileResult<()> {
    let Node::Structured(s) = node else {
        return Ok(());
    };
    let fs = s.fs_node().map_err(|e| FileError::Decode(e.to_string()))?;
    match fs.kind() {
        FsNodeType::File | FsNodeType::Raw => Ok(()),
        FsNodeType::Symlink => Err(FileError::NotSupported("symlinks")),
        other => Err(FileError::UnsupportedNodeType(other)),
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("root", &self.node_id())
            .field("raw_leaves", &self.raw_leaves)
            .finish()
    }
}
