use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Type tag carried in a structured node's payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FsNodeType {
    /// Wrapped leaf block of file data.
    Raw,
    /// Directory listing.
    Directory,
    /// File root or interior file node.
    File,
    /// Metadata wrapper.
    Metadata,
    /// Symbolic link; `data` holds the target.
    Symlink,
    /// Sharded directory bucket.
    HamtShard,
}

impl FsNodeType {
    /// Returns `true` for the types a file handle may open.
    pub fn is_file_like(self) -> bool {
        matches!(self, Self::File | Self::Raw)
    }
}

impl std::fmt::Display for FsNodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Directory => write!(f, "directory"),
            Self::File => write!(f, "file"),
            Self::Metadata => write!(f, "metadata"),
            Self::Symlink => write!(f, "symlink"),
            Self::HamtShard => write!(f, "hamt-shard"),
        }
    }
}

/// Decoded payload of a structured node.
///
/// `data` is inline content that precedes the children; `block_sizes[i]`
/// is the logical byte length reachable through the node's `i`-th link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsNode {
    kind: FsNodeType,
    data: Vec<u8>,
    block_sizes: Vec<u64>,
}

impl FsNode {
    /// Create an empty payload of the given type.
    pub fn new(kind: FsNodeType) -> Self {
        Self {
            kind,
            data: Vec::new(),
            block_sizes: Vec::new(),
        }
    }

    /// A payload of the given type with inline data.
    pub fn with_data(kind: FsNodeType, data: Vec<u8>) -> Self {
        Self {
            kind,
            data,
            block_sizes: Vec::new(),
        }
    }

    /// A symlink payload pointing at `target`.
    pub fn symlink(target: &str) -> Self {
        Self::with_data(FsNodeType::Symlink, target.as_bytes().to_vec())
    }

    pub fn kind(&self) -> FsNodeType {
        self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn block_sizes(&self) -> &[u64] {
        &self.block_sizes
    }

    /// Record the logical size of the next child.
    pub fn add_block_size(&mut self, size: u64) {
        self.block_sizes.push(size);
    }

    /// Declared logical size: inline data plus every child block.
    pub fn file_size(&self) -> u64 {
        self.data.len() as u64 + self.block_sizes.iter().sum::<u64>()
    }

    /// Encode to the payload bytes stored in a structured node.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode a structured node's payload.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_size_counts_data_and_blocks() {
        let mut fs = FsNode::with_data(FsNodeType::File, b"head".to_vec());
        fs.add_block_size(10);
        fs.add_block_size(6);
        assert_eq!(fs.file_size(), 20);
    }

    #[test]
    fn encode_decode_preserves_fields() {
        let mut fs = FsNode::new(FsNodeType::File);
        fs.add_block_size(4096);
        let bytes = fs.encode().unwrap();
        let decoded = FsNode::decode(&bytes).unwrap();
        assert_eq!(decoded.kind(), FsNodeType::File);
        assert_eq!(decoded.block_sizes(), &[4096]);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = FsNode::decode(&[0xff, 0xff]).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn unknown_type_tag_fails_to_decode() {
        let err = FsNode::decode(&[0x2a, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn file_like_types() {
        assert!(FsNodeType::File.is_file_like());
        assert!(FsNodeType::Raw.is_file_like());
        assert!(!FsNodeType::Symlink.is_file_like());
        assert!(!FsNodeType::Directory.is_file_like());
    }

    #[test]
    fn symlink_payload_keeps_target() {
        let fs = FsNode::symlink("../other");
        assert_eq!(fs.kind(), FsNodeType::Symlink);
        assert_eq!(fs.data(), b"../other");
        assert_eq!(format!("{}", fs.kind()), "symlink");
    }
}
