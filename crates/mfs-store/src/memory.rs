use std::collections::HashMap;
use std::sync::RwLock;

use tracing::trace;

use mfs_types::NodeId;

use crate::error::{StoreError, StoreResult};
use crate::node::Node;
use crate::traits::NodeStore;

/// In-memory, HashMap-based node store.
///
/// Intended for tests and embedding. Nodes are held behind a `RwLock` for
/// safe concurrent access and cloned on read/write.
pub struct InMemoryNodeStore {
    nodes: RwLock<HashMap<NodeId, Node>>,
}

impl InMemoryNodeStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Number of nodes currently stored.
    pub fn len(&self) -> usize {
        self.nodes.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.read().expect("lock poisoned").is_empty()
    }

    /// Total stored bytes across all nodes.
    pub fn total_bytes(&self) -> u64 {
        self.nodes
            .read()
            .expect("lock poisoned")
            .values()
            .map(Node::stored_size)
            .sum()
    }

    /// Remove all nodes from the store.
    pub fn clear(&self) {
        self.nodes.write().expect("lock poisoned").clear();
    }

    /// Return a sorted list of all node ids in the store.
    pub fn all_ids(&self) -> Vec<NodeId> {
        let map = self.nodes.read().expect("lock poisoned");
        let mut ids: Vec<NodeId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore for InMemoryNodeStore {
    fn get(&self, id: &NodeId) -> StoreResult<Option<Node>> {
        let map = self.nodes.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    fn put(&self, node: &Node) -> StoreResult<NodeId> {
        let id = node.id();
        if id.is_null() {
            return Err(StoreError::NullNodeId);
        }
        let mut map = self.nodes.write().expect("lock poisoned");
        map.entry(id).or_insert_with(|| {
            trace!(node = ?id, "stored node");
            node.clone()
        });
        Ok(id)
    }

    fn has(&self, id: &NodeId) -> StoreResult<bool> {
        let map = self.nodes.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn remove(&self, id: &NodeId) -> StoreResult<bool> {
        let mut map = self.nodes.write().expect("lock poisoned");
        Ok(map.remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryNodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryNodeStore")
            .field("node_count", &self.len())
            .finish()
    }
}
