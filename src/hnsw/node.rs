//! Graph node: an immutable vector plus per-layer mutable connection lists
//! (spec §9 "Mutable graph with back-references").

use std::sync::RwLock;

pub type NodeId = usize;

#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub level: usize,
    pub vector: Vec<f32>,
    /// `connections[layer]` holds neighbor ids at that layer; length is
    /// `level + 1`. Locked independently of the index's top-level lock.
    connections: Vec<RwLock<Vec<NodeId>>>,
}

impl Node {
    pub fn new(id: NodeId, level: usize, vector: Vec<f32>) -> Self {
        let connections = (0..=level).map(|_| RwLock::new(Vec::new())).collect();
        Self { id, level, vector, connections }
    }

    pub fn neighbors(&self, layer: usize) -> Vec<NodeId> {
        self.connections[layer].read().expect("node connection lock poisoned").clone()
    }

    pub fn connections_mut(&self, layer: usize) -> std::sync::RwLockWriteGuard<'_, Vec<NodeId>> {
        self.connections[layer].write().expect("node connection lock poisoned")
    }
}
