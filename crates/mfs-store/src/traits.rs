use mfs_types::NodeId;

use crate::error::{StoreError, StoreResult};
use crate::node::Node;

/// Content-addressed node store.
///
/// All implementations must satisfy these invariants:
/// - Nodes are immutable once written. The same node always produces the
///   same id, so writes are idempotent.
/// - Concurrent use by many modifiers is safe.
/// - The store never interprets node payloads.
/// - All backend errors are propagated, never silently ignored.
pub trait NodeStore: Send + Sync {
    /// Read a node by its address.
    ///
    /// Returns `Ok(None)` if the node does not exist.
    fn get(&self, id: &NodeId) -> StoreResult<Option<Node>>;

    /// Write a node and return its address.
    ///
    /// If the node already exists, this is a no-op.
    fn put(&self, node: &Node) -> StoreResult<NodeId>;

    /// Check whether a node exists in the store.
    fn has(&self, id: &NodeId) -> StoreResult<bool>;

    /// Remove a node by id. Returns `true` if the node existed.
    ///
    /// Removing a node that is still referenced corrupts every file built
    /// on it.
    fn remove(&self, id: &NodeId) -> StoreResult<bool>;

    /// Read a node that must exist.
    fn fetch(&self, id: &NodeId) -> StoreResult<Node> {
        self.get(id)?.ok_or(StoreError::NotFound(*id))
    }

    /// Read multiple nodes in a batch.
    fn get_many(&self, ids: &[NodeId]) -> StoreResult<Vec<Option<Node>>> {
        ids.iter().map(|id| self.get(id)).collect()
    }

    /// Write multiple nodes in a batch and return their ids.
    fn put_many(&self, nodes: &[Node]) -> StoreResult<Vec<NodeId>> {
        nodes.iter().map(|node| self.put(node)).collect()
    }
}
