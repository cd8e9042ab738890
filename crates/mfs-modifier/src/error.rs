use mfs_store::{FsNodeType, StoreError};
use mfs_types::NodeId;

/// Errors produced while editing a file tree.
#[derive(Debug, thiserror::Error)]
pub enum ModifierError {
    /// The node cannot be edited as file content.
    #[error("node of type {0} cannot be edited as a file")]
    UnsupportedNode(FsNodeType),

    /// A node referenced by the tree is missing from the store.
    #[error("missing node {0}")]
    MissingNode(NodeId),

    /// The tree's declared sizes disagree with its children.
    #[error("corrupt tree at {id}: {reason}")]
    CorruptTree { id: NodeId, reason: String },

    /// A write would end past the largest representable offset.
    #[error("write of {len} bytes at offset {offset} overflows the file size")]
    OffsetOverflow { offset: u64, len: usize },

    /// Configuration values are out of range or unparsable.
    #[error("invalid modifier config: {0}")]
    InvalidConfig(String),

    /// Error from the node store or node codec.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for modifier operations.
pub type ModifierResult<T> = Result<T, ModifierError>;
