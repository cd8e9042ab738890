use mfs_types::NodeId;

/// Errors from node model and node store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested node was not found.
    #[error("node not found: {0}")]
    NotFound(NodeId),

    /// A structured node's payload could not be decoded.
    #[error("malformed node payload: {0}")]
    Decode(String),

    /// Serialization failure while encoding a payload.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The node violates a structural rule (e.g. link/size mismatch).
    #[error("corrupt node {id}: {reason}")]
    CorruptNode { id: NodeId, reason: String },

    /// Attempted to write a node whose id is null.
    #[error("cannot store node with null id")]
    NullNodeId,

    /// Storage backend is read-only or otherwise unavailable.
    #[error("store is unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
