use mfs_store::{Node, NodeStore};
use mfs_types::NodeId;

use crate::error::{ModifierError, ModifierResult};

/// A contiguous run of file bytes held directly by one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Segment {
    pub id: NodeId,
    pub offset: u64,
    pub len: u64,
    /// `false` for inline data of a node that also has children; such a
    /// node cannot be linked as a leaf of a rebuilt tree.
    pub reusable: bool,
}

impl Segment {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Ordered map from byte offsets to the nodes holding them.
#[derive(Clone, Debug, Default)]
pub(crate) struct LeafIndex {
    segments: Vec<Segment>,
    size: u64,
}

impl LeafIndex {
    /// Walk the tree under `root`, checking declared sizes along the way.
    pub fn build(store: &dyn NodeStore, root: &Node) -> ModifierResult<Self> {
        let mut segments = Vec::new();
        let size = walk(store, root, 0, &mut segments)?;
        Ok(Self { segments, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segments intersecting `[start, end)`.
    pub fn overlapping(&self, start: u64, end: u64) -> &[Segment] {
        let first = self.segments.partition_point(|s| s.end() <= start);
        let last = self.segments.partition_point(|s| s.offset < end);
        &self.segments[first..last.max(first)]
    }
}

fn walk(
    store: &dyn NodeStore,
    node: &Node,
    offset: u64,
    segments: &mut Vec<Segment>,
) -> ModifierResult<u64> {
    let structured = match node {
        Node::Raw(raw) => {
            if !raw.is_empty() {
                segments.push(Segment {
                    id: raw.id(),
                    offset,
                    len: raw.len() as u64,
                    reusable: true,
                });
            }
            return Ok(raw.len() as u64);
        }
        Node::Structured(s) => s,
    };

    let fs = structured.fs_node()?;
    if !fs.kind().is_file_like() {
        return Err(ModifierError::UnsupportedNode(fs.kind()));
    }
    let id = structured.id();
    if fs.block_sizes().len() != structured.links().len() {
        return Err(ModifierError::CorruptTree {
            id,
            reason: format!(
                "{} block sizes for {} links",
                fs.block_sizes().len(),
                structured.links().len()
            ),
        });
    }

    let mut covered = fs.data().len() as u64;
    if covered > 0 {
        segments.push(Segment {
            id,
            offset,
            len: covered,
            reusable: structured.links().is_empty(),
        });
    }

    for (link, &declared) in structured.links().iter().zip(fs.block_sizes()) {
        let child = store
            .get(&link.id)?
            .ok_or(ModifierError::MissingNode(link.id))?;
        let actual = walk(store, &child, offset + covered, segments)?;
        if actual != declared {
            return Err(ModifierError::CorruptTree {
                id,
                reason: format!(
                    "child {} declares {declared} bytes but holds {actual}",
                    link.id.short_hex()
                ),
            });
        }
        covered += declared;
    }
    Ok(covered)
}
