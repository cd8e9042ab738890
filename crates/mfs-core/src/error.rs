use mfs_modifier::ModifierError;
use mfs_store::{FsNodeType, StoreError};

use crate::mode::OpenMode;

/// Errors produced by file handles and descriptors.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The node is present but is not file-shaped.
    #[error("unsupported node type for a file: {0}")]
    UnsupportedNodeType(FsNodeType),

    /// A recognized case that is not implemented.
    #[error("{0} not yet supported")]
    NotSupported(&'static str),

    /// The open flags do not name a known mode.
    #[error("unsupported open mode: {0}")]
    UnsupportedMode(u32),

    /// The descriptor's mode does not allow the operation.
    #[error("permission denied: cannot {op} through a {mode} descriptor")]
    PermissionDenied { op: &'static str, mode: OpenMode },

    /// A stored node's payload is malformed.
    #[error("malformed node payload: {0}")]
    Decode(String),

    /// An internal invariant was violated.
    #[error("corrupt file state: {0}")]
    CorruptState(String),

    /// The descriptor was already closed.
    #[error("file descriptor is closed")]
    DescriptorClosed,

    /// A seek would move the cursor before the start of the file.
    #[error("invalid seek to offset {0}")]
    InvalidSeek(i128),

    /// The parent refused the new root.
    #[error("parent rejected new root for {name}: {reason}")]
    Parent { name: String, reason: String },

    /// Error from the modifier.
    #[error(transparent)]
    Modifier(#[from] ModifierError),

    /// Error from the node store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for file operations.
pub type FileResult<T> = Result<T, FileError>;

impl From<FileError> for std::io::Error {
    fn from(e: FileError) -> Self {
        use std::io::ErrorKind;
        let kind = match e {
            FileError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            FileError::InvalidSeek(_)
            | FileError::UnsupportedMode(_)
            | FileError::Modifier(ModifierError::OffsetOverflow { .. }) => ErrorKind::InvalidInput,
            FileError::NotSupported(_) => ErrorKind::Unsupported,
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, e)
    }
}
