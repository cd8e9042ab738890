use std::sync::Arc;

use serde::{Deserialize, Serialize};

use mfs_types::{AddressVersion, ContentHasher, NodeId};

use crate::error::StoreResult;
use crate::fsnode::{FsNode, FsNodeType};

/// Reference from a structured node to one child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Address of the child node.
    pub id: NodeId,
    /// Logical bytes of file content reachable through the child.
    pub size: u64,
}

impl Link {
    pub fn new(id: NodeId, size: u64) -> Self {
        Self { id, size }
    }
}

/// Unwrapped leaf: bytes with no metadata. Always addressed under `V1`.
///
/// Cloning shares the bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawNode {
    data: Arc<[u8]>,
}

impl RawNode {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn id(&self) -> NodeId {
        ContentHasher::RAW.hash(AddressVersion::V1, &self.data)
    }
}

/// Structured node: opaque [`FsNode`] payload plus ordered child links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuredNode {
    version: AddressVersion,
    data: Arc<[u8]>,
    links: Vec<Link>,
}

impl StructuredNode {
    /// Build from already-encoded payload bytes.
    pub fn new(version: AddressVersion, data: Vec<u8>, links: Vec<Link>) -> Self {
        Self {
            version,
            data: data.into(),
            links,
        }
    }

    /// Build by encoding an [`FsNode`] payload.
    pub fn from_fs_node(
        version: AddressVersion,
        fs: &FsNode,
        links: Vec<Link>,
    ) -> StoreResult<Self> {
        Ok(Self::new(version, fs.encode()?, links))
    }

    pub fn version(&self) -> AddressVersion {
        self.version
    }

    /// The opaque payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Decode the payload.
    pub fn fs_node(&self) -> StoreResult<FsNode> {
        FsNode::decode(&self.data)
    }

    /// Canonical byte encoding the address is computed over.
    ///
    /// Layout: link count (u64 LE), then per link the child version byte,
    /// digest and size (u64 LE), then the payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.links.len() * 41 + self.data.len());
        buf.extend_from_slice(&(self.links.len() as u64).to_le_bytes());
        for link in &self.links {
            buf.push(link.id.version().as_u8());
            buf.extend_from_slice(link.id.digest());
            buf.extend_from_slice(&link.size.to_le_bytes());
        }
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn id(&self) -> NodeId {
        ContentHasher::NODE.hash(self.version, &self.encode())
    }
}

/// An immutable node: either structured or a raw leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Structured(StructuredNode),
    Raw(RawNode),
}

impl Node {
    /// A raw leaf holding `data`.
    pub fn raw(data: Vec<u8>) -> Self {
        Self::Raw(RawNode::new(data))
    }

    /// A structured node with the given payload and no children.
    pub fn structured(version: AddressVersion, fs: &FsNode) -> StoreResult<Self> {
        Ok(Self::Structured(StructuredNode::from_fs_node(
            version,
            fs,
            Vec::new(),
        )?))
    }

    /// An empty structured `File` node.
    pub fn empty_file(version: AddressVersion) -> StoreResult<Self> {
        Self::structured(version, &FsNode::new(FsNodeType::File))
    }

    /// Content address of this node.
    pub fn id(&self) -> NodeId {
        match self {
            Self::Structured(n) => n.id(),
            Self::Raw(n) => n.id(),
        }
    }

    /// Addressing scheme version of this node.
    pub fn version(&self) -> AddressVersion {
        match self {
            Self::Structured(n) => n.version(),
            Self::Raw(_) => AddressVersion::V1,
        }
    }

    /// Child links (raw leaves have none).
    pub fn links(&self) -> &[Link] {
        match self {
            Self::Structured(n) => n.links(),
            Self::Raw(_) => &[],
        }
    }

    /// Size of the node's stored bytes, for accounting.
    pub fn stored_size(&self) -> u64 {
        match self {
            Self::Structured(n) => n.encode().len() as u64,
            Self::Raw(n) => n.len() as u64,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

impl From<RawNode> for Node {
    fn from(n: RawNode) -> Self {
        Self::Raw(n)
    }
}

impl From<StructuredNode> for Node {
    fn from(n: StructuredNode) -> Self {
        Self::Structured(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_id_is_content_derived() {
        let a = Node::raw(b"block".to_vec());
        let b = Node::raw(b"block".to_vec());
        let c = Node::raw(b"other".to_vec());
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(a.id().version(), AddressVersion::V1);
    }

    #[test]
    fn structured_id_covers_links() {
        let fs = FsNode::new(FsNodeType::File);
        let leaf = Node::raw(b"x".to_vec()).id();
        let bare = StructuredNode::from_fs_node(AddressVersion::V0, &fs, vec![]).unwrap();
        let linked =
            StructuredNode::from_fs_node(AddressVersion::V0, &fs, vec![Link::new(leaf, 1)])
                .unwrap();
        assert_ne!(bare.id(), linked.id());
    }

    #[test]
    fn structured_id_follows_version() {
        let fs = FsNode::with_data(FsNodeType::File, b"abc".to_vec());
        let v0 = Node::structured(AddressVersion::V0, &fs).unwrap();
        let v1 = Node::structured(AddressVersion::V1, &fs).unwrap();
        assert_eq!(v0.id().digest(), v1.id().digest());
        assert_ne!(v0.id(), v1.id());
        assert_eq!(v1.version(), AddressVersion::V1);
    }

    #[test]
    fn raw_and_structured_never_collide() {
        let raw = Node::raw(b"abc".to_vec());
        let fs = FsNode::with_data(FsNodeType::Raw, b"abc".to_vec());
        let wrapped = Node::structured(AddressVersion::V1, &fs).unwrap();
        assert_ne!(raw.id(), wrapped.id());
    }

    #[test]
    fn payload_decodes_through_node() {
        let fs = FsNode::with_data(FsNodeType::File, b"inline".to_vec());
        let Node::Structured(node) = Node::structured(AddressVersion::V0, &fs).unwrap() else {
            panic!("expected structured node");
        };
        assert_eq!(node.fs_node().unwrap(), fs);
        assert!(node.links().is_empty());
    }

    #[test]
    fn stored_size_for_raw_is_byte_length() {
        assert_eq!(Node::raw(vec![0u8; 17]).stored_size(), 17);
    }
}
