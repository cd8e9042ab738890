//! Balanced tree layout.
//!
//! Leaves are grouped under interior `File` nodes holding at most
//! `max_links` children each; levels are stacked until a single root
//! remains. Every node built here is written to the store before the root
//! is returned.

use mfs_store::{FsNode, FsNodeType, Link, Node, NodeStore, StoreResult, StructuredNode};
use mfs_types::AddressVersion;

use crate::config::ModifierConfig;
use crate::error::{ModifierError, ModifierResult};

/// A leaf holding `data`: unwrapped when `raw_leaves` is set, otherwise a
/// structured node of type `Raw`.
pub fn leaf_node(data: Vec<u8>, raw_leaves: bool, version: AddressVersion) -> StoreResult<Node> {
    if raw_leaves {
        Ok(Node::raw(data))
    } else {
        Node::structured(version, &FsNode::with_data(FsNodeType::Raw, data))
    }
}

/// Root of a zero-length file.
pub fn empty_file(raw_leaves: bool, version: AddressVersion) -> StoreResult<Node> {
    if raw_leaves {
        Ok(Node::raw(Vec::new()))
    } else {
        Node::empty_file(version)
    }
}

/// Content bytes held directly by a node (a leaf's data, or a structured
/// node's inline data).
pub fn leaf_data(node: &Node) -> StoreResult<Vec<u8>> {
    match node {
        Node::Raw(raw) => Ok(raw.data().to_vec()),
        Node::Structured(s) => Ok(s.fs_node()?.into_data()),
    }
}

/// Build a balanced tree over `leaves`, store it, and return the root.
pub fn build_balanced(
    store: &dyn NodeStore,
    leaves: Vec<Link>,
    config: &ModifierConfig,
    raw_leaves: bool,
    version: AddressVersion,
) -> ModifierResult<Node> {
    match leaves.as_slice() {
        [] => {
            let root = empty_file(raw_leaves, version)?;
            store.put(&root)?;
            return Ok(root);
        }
        [only] => {
            let leaf = store
                .get(&only.id)?
                .ok_or(ModifierError::MissingNode(only.id))?;
            if raw_leaves && leaf.is_raw() {
                return Ok(leaf);
            }
            let inline = FsNode::with_data(FsNodeType::File, leaf_data(&leaf)?);
            let root = Node::structured(version, &inline)?;
            store.put(&root)?;
            return Ok(root);
        }
        _ => {}
    }

    let mut level = leaves;
    while level.len() > config.max_links {
        level = level
            .chunks(config.max_links)
            .map(|group| {
                let node = interior_node(group, version)?;
                store.put(&node)?;
                Ok(Link::new(node.id(), total_size(group)))
            })
            .collect::<ModifierResult<Vec<_>>>()?;
    }

    let root = interior_node(&level, version)?;
    store.put(&root)?;
    Ok(root)
}

fn interior_node(children: &[Link], version: AddressVersion) -> StoreResult<Node> {
    let mut fs = FsNode::new(FsNodeType::File);
    for link in children {
        fs.add_block_size(link.size);
    }
    Ok(StructuredNode::from_fs_node(version, &fs, children.to_vec())?.into())
}

fn total_size(links: &[Link]) -> u64 {
    links.iter().map(|l| l.size).sum()
}
