//! Stateful editor bound to one file snapshot.
//!
//! Edits never touch stored nodes. [`DagModifier`] keeps them as an overlay
//! of written extents on top of the snapshot it was created from; reads
//! merge the two. On [`Modifier::flush`] every snapshot leaf the edits did
//! not touch is linked into the new tree by id, only the dirty spans are
//! re-chunked into fresh leaves, and a new balanced tree is written.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use mfs_store::{Link, Node, NodeStore};
use mfs_types::{AddressVersion, NodeId};

use crate::chunker::Chunker;
use crate::config::ModifierConfig;
use crate::error::{ModifierError, ModifierResult};
use crate::index::{LeafIndex, Segment};
use crate::layout;

/// Chunks re-chunked per window when a dirty span is flushed.
const WINDOW_CHUNKS: usize = 16;

/// Byte-level editing of one file snapshot.
pub trait Modifier: Send {
    /// Logical size including unflushed edits.
    fn size(&self) -> u64;

    /// Read into `buf` starting at `offset`. Returns 0 at or past the end.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> ModifierResult<usize>;

    /// Write `data` at `offset`, zero-filling any gap past the end.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> ModifierResult<usize>;

    /// Shrink or zero-extend to `size` bytes.
    fn truncate(&mut self, size: u64) -> ModifierResult<()>;

    /// Materialize pending edits into a new stored root and rebind to it.
    ///
    /// Without pending edits this returns the current root unchanged.
    fn flush(&mut self) -> ModifierResult<Node>;

    /// Returns `true` while there are edits not yet flushed.
    fn has_changes(&self) -> bool;
}

/// [`Modifier`] over a balanced tree of nodes in a [`NodeStore`].
pub struct DagModifier {
    store: Arc<dyn NodeStore>,
    chunker: Arc<dyn Chunker>,
    config: ModifierConfig,
    raw_leaves: bool,
    root: Node,
    index: LeafIndex,
    /// Snapshot bytes at or past this offset were truncated away.
    base_limit: u64,
    size: u64,
    /// Written extents keyed by start offset; never overlapping or adjacent.
    extents: BTreeMap<u64, Vec<u8>>,
    dirty: bool,
}

impl DagModifier {
    /// Bind a modifier to `root`.
    ///
    /// The root is written to the store and its tree is indexed, so a
    /// non-file node, a missing child, or inconsistent sizes fail here.
    /// Raw leaves default to the root's addressing scheme.
    pub fn new(
        root: Node,
        store: Arc<dyn NodeStore>,
        chunker: Arc<dyn Chunker>,
        config: ModifierConfig,
    ) -> ModifierResult<Self> {
        config.validate()?;
        let index = LeafIndex::build(store.as_ref(), &root)?;
        store.put(&root)?;
        let size = index.size();
        Ok(Self {
            raw_leaves: root.version().uses_raw_leaves(),
            store,
            chunker,
            config,
            root,
            index,
            base_limit: size,
            size,
            extents: BTreeMap::new(),
            dirty: false,
        })
    }

    /// Whether newly written leaves are stored unwrapped.
    pub fn raw_leaves(&self) -> bool {
        self.raw_leaves
    }

    pub fn set_raw_leaves(&mut self, raw_leaves: bool) {
        self.raw_leaves = raw_leaves;
    }

    /// The root the modifier is currently bound to.
    pub fn root(&self) -> &Node {
        &self.root
    }

    fn version(&self) -> AddressVersion {
        if self.raw_leaves {
            AddressVersion::V1
        } else {
            self.root.version()
        }
    }

    fn segment_data(&self, seg: &Segment) -> ModifierResult<Vec<u8>> {
        let node = self
            .store
            .get(&seg.id)?
            .ok_or(ModifierError::MissingNode(seg.id))?;
        let data = layout::leaf_data(&node)?;
        if data.len() as u64 != seg.len {
            return Err(ModifierError::CorruptTree {
                id: seg.id,
                reason: format!("expected {} bytes, found {}", seg.len, data.len()),
            });
        }
        Ok(data)
    }

    fn touches_extent(&self, start: u64, end: u64) -> bool {
        self.extents
            .range(..end)
            .next_back()
            .is_some_and(|(&s, bytes)| s + bytes.len() as u64 > start)
    }

    fn is_clean(&self, seg: &Segment) -> bool {
        seg.reusable && seg.end() <= self.base_limit && !self.touches_extent(seg.offset, seg.end())
    }

    /// `[start, end)` reads as zeros: past the snapshot and unwritten.
    fn is_hole(&self, start: u64, end: u64) -> bool {
        start >= self.base_limit && !self.touches_extent(start, end)
    }

    /// Chunk the current content of `[start, end)` into new leaves.
    ///
    /// Works one window of whole chunks at a time. Holes are chunked from a
    /// shared zero buffer and each distinct zero leaf is stored once.
    fn emit_span(&self, start: u64, end: u64, links: &mut Vec<Link>) -> ModifierResult<()> {
        let window = self.config.chunk_size.saturating_mul(WINDOW_CHUNKS);
        let version = self.version();
        let mut buf = Vec::new();
        let mut zeros = Vec::new();
        let mut zero_leaves: HashMap<usize, NodeId> = HashMap::new();

        let mut at = start;
        while at < end {
            let len = (end - at).min(window as u64) as usize;
            let hole = self.is_hole(at, at + len as u64);
            let data: &[u8] = if hole {
                if zeros.len() < len {
                    zeros.resize(len, 0);
                }
                &zeros[..len]
            } else {
                buf.resize(len, 0);
                let n = self.read_at(at, &mut buf)?;
                &buf[..n]
            };

            for range in self.chunker.split(data) {
                let chunk_len = range.len();
                let cached = if hole { zero_leaves.get(&chunk_len).copied() } else { None };
                let id = match cached {
                    Some(id) => id,
                    None => {
                        let leaf = layout::leaf_node(data[range].to_vec(), self.raw_leaves, version)?;
                        let id = self.store.put(&leaf)?;
                        if hole {
                            zero_leaves.insert(chunk_len, id);
                        }
                        id
                    }
                };
                links.push(Link::new(id, chunk_len as u64));
            }
            at += len as u64;
        }
        Ok(())
    }

    fn rebind(&mut self, root: Node) -> ModifierResult<()> {
        self.index = LeafIndex::build(self.store.as_ref(), &root)?;
        self.size = self.index.size();
        self.base_limit = self.size;
        self.extents.clear();
        self.dirty = false;
        self.root = root;
        Ok(())
    }
}

impl Modifier for DagModifier {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> ModifierResult<usize> {
        if offset >= self.size || buf.is_empty() {
            return Ok(0);
        }
        let n = (buf.len() as u64).min(self.size - offset) as usize;
        let end = offset + n as u64;
        let out = &mut buf[..n];
        out.fill(0);

        let base_end = end.min(self.base_limit);
        if offset < base_end {
            for seg in self.index.overlapping(offset, base_end) {
                let data = self.segment_data(seg)?;
                let from = offset.max(seg.offset);
                let to = base_end.min(seg.end());
                out[(from - offset) as usize..(to - offset) as usize]
                    .copy_from_slice(&data[(from - seg.offset) as usize..(to - seg.offset) as usize]);
            }
        }

        for (&start, bytes) in self.extents.range(..end) {
            let ext_end = start + bytes.len() as u64;
            if ext_end <= offset {
                continue;
            }
            let from = start.max(offset);
            let to = ext_end.min(end);
            out[(from - offset) as usize..(to - offset) as usize]
                .copy_from_slice(&bytes[(from - start) as usize..(to - start) as usize]);
        }
        Ok(n)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> ModifierResult<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(ModifierError::OffsetOverflow {
                offset,
                len: data.len(),
            })?;

        // Pull out every extent overlapping or adjacent to the write.
        let touching: Vec<u64> = self
            .extents
            .range(..=end)
            .rev()
            .take_while(|(&s, bytes)| s + bytes.len() as u64 >= offset)
            .map(|(&s, _)| s)
            .collect();
        let old: Vec<(u64, Vec<u8>)> = touching
            .into_iter()
            .filter_map(|s| self.extents.remove(&s).map(|bytes| (s, bytes)))
            .collect();

        let start = old.iter().map(|(s, _)| *s).fold(offset, u64::min);
        let merged_end = old
            .iter()
            .map(|(s, bytes)| s + bytes.len() as u64)
            .fold(end, u64::max);
        let mut merged = vec![0u8; (merged_end - start) as usize];
        for (s, bytes) in &old {
            let at = (s - start) as usize;
            merged[at..at + bytes.len()].copy_from_slice(bytes);
        }
        let at = (offset - start) as usize;
        merged[at..at + data.len()].copy_from_slice(data);
        self.extents.insert(start, merged);

        self.size = self.size.max(end);
        self.dirty = true;
        Ok(data.len())
    }

    fn truncate(&mut self, size: u64) -> ModifierResult<()> {
        if size == self.size {
            return Ok(());
        }
        if size < self.size {
            self.base_limit = self.base_limit.min(size);
            self.extents.split_off(&size);
            if let Some((&s, bytes)) = self.extents.iter_mut().next_back() {
                let keep = size - s;
                if bytes.len() as u64 > keep {
                    bytes.truncate(keep as usize);
                }
            }
        }
        self.size = size;
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self) -> ModifierResult<Node> {
        if !self.dirty {
            return Ok(self.root.clone());
        }

        let mut links = Vec::new();
        let mut next = 0u64;
        let mut reused = 0usize;
        for seg in self.index.segments() {
            if seg.offset >= self.size {
                break;
            }
            if self.is_clean(seg) {
                if next < seg.offset {
                    self.emit_span(next, seg.offset, &mut links)?;
                }
                links.push(Link::new(seg.id, seg.len));
                next = seg.end();
                reused += 1;
            }
        }
        if next < self.size {
            self.emit_span(next, self.size, &mut links)?;
        }

        let leaves = links.len();
        let root = layout::build_balanced(
            self.store.as_ref(),
            links,
            &self.config,
            self.raw_leaves,
            self.version(),
        )?;
        debug!(
            root = %root.id().short_hex(),
            size = self.size,
            leaves,
            reused,
            "materialized file tree"
        );
        self.rebind(root.clone())?;
        Ok(root)
    }

    fn has_changes(&self) -> bool {
        self.dirty
    }
}

impl std::fmt::Debug for DagModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagModifier")
            .field("root", &self.root.id())
            .field("size", &self.size)
            .field("raw_leaves", &self.raw_leaves)
            .field("extents", &self.extents.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}
