//! The HNSW graph index itself: insertion and search (spec §4.5).
//!
//! The top-level [`RwLock`] guards `entryPoint`, `maxLevel`, and the node
//! arena (length and backing storage); each [`Node`] has its own lock over
//! its per-layer connection lists, always acquired in ascending `nodeID`
//! order to avoid deadlock (spec §5).

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::hnsw::heap::{CandidateHeap, DistEntry, ResultHeap};
use crate::hnsw::node::{Node, NodeId};
use crate::hnsw::params::HnswParams;

struct IndexState {
    entry_point: Option<NodeId>,
    max_level: usize,
    nodes: Vec<Arc<Node>>,
}

pub struct HnswIndex {
    params: HnswParams,
    state: RwLock<IndexState>,
}

impl HnswIndex {
    pub fn new(params: HnswParams) -> Self {
        Self {
            params,
            state: RwLock::new(IndexState { entry_point: None, max_level: 0, nodes: Vec::new() }),
        }
    }

    /// Rebuilds an index from persisted node/edge data (spec §6 on-disk
    /// layout). Edges are applied after the arena is built so `nodeID`s can
    /// reference nodes at any position.
    pub fn from_parts(
        params: HnswParams,
        entry_point: Option<NodeId>,
        max_level: usize,
        nodes: Vec<Node>,
        edges: Vec<(NodeId, usize, Vec<NodeId>)>,
    ) -> Self {
        let arena: Vec<Arc<Node>> = nodes.into_iter().map(Arc::new).collect();
        for (node_id, layer, neighbors) in edges {
            *arena[node_id].connections_mut(layer) = neighbors;
        }
        Self { params, state: RwLock::new(IndexState { entry_point, max_level, nodes: arena }) }
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.state.read().expect("hnsw state lock poisoned").nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry_point(&self) -> Option<NodeId> {
        self.state.read().expect("hnsw state lock poisoned").entry_point
    }

    pub fn max_level(&self) -> usize {
        self.state.read().expect("hnsw state lock poisoned").max_level
    }

    pub fn node_level(&self, id: NodeId) -> usize {
        self.state.read().expect("hnsw state lock poisoned").nodes[id].level
    }

    pub fn node_vector(&self, id: NodeId) -> Vec<f32> {
        self.state.read().expect("hnsw state lock poisoned").nodes[id].vector.clone()
    }

    pub fn node_neighbors(&self, id: NodeId, layer: usize) -> Vec<NodeId> {
        self.state.read().expect("hnsw state lock poisoned").nodes[id].neighbors(layer)
    }

    /// Inserts `vector`, returning its new `nodeID`. Assumes `vector.len()`
    /// already matches `dimension` — dimension validation is a collection
    /// concern (spec §4.7).
    pub fn insert(&self, vector: Vec<f32>) -> NodeId {
        let level = self.params.sample_level();

        let (node_id, seed_entry, seed_max_level, is_first) = {
            let mut state = self.state.write().expect("hnsw state lock poisoned");
            let node_id = state.nodes.len();
            state.nodes.push(Arc::new(Node::new(node_id, level, vector)));
            if state.nodes.len() == 1 {
                state.entry_point = Some(node_id);
                state.max_level = level;
                (node_id, None, 0, true)
            } else {
                (node_id, state.entry_point, state.max_level, false)
            }
        };

        if is_first {
            return node_id;
        }

        let nodes = self.state.read().expect("hnsw state lock poisoned").nodes.clone();
        let query = nodes[node_id].vector.clone();
        let mut entry_point = seed_entry.expect("non-first insert always has a prior entry point");

        for layer in (level + 1..=seed_max_level).rev() {
            let result = self.search_layer(&nodes, layer, 1, &[entry_point], &query);
            if let Some(best) = result.first() {
                entry_point = best.id;
            }
        }

        let top_layer = level.min(seed_max_level);
        let mut current_entry = entry_point;
        for layer in (0..=top_layer).rev() {
            let candidates = self.search_layer(&nodes, layer, self.params.ef_construction, &[current_entry], &query);
            if let Some(best) = candidates.first() {
                current_entry = best.id;
            }
            let selected = self.select_neighbors(&nodes, &candidates, self.params.m);

            for w in &selected {
                self.connect(&nodes, node_id, w.id, layer);
            }
            for w in &selected {
                self.prune(&nodes, w.id, layer);
            }
        }

        if level > seed_max_level {
            let mut state = self.state.write().expect("hnsw state lock poisoned");
            state.entry_point = Some(node_id);
            state.max_level = level;
        }

        node_id
    }

    /// `ef = 0` means "use `max(k, ef_construction)`" per spec §4.5.
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<(NodeId, f32)> {
        let (mut entry, max_level, nodes) = {
            let state = self.state.read().expect("hnsw state lock poisoned");
            match state.entry_point {
                Some(ep) => (ep, state.max_level, state.nodes.clone()),
                None => return Vec::new(),
            }
        };

        let ef_eff = if ef == 0 { k.max(self.params.ef_construction) } else { ef };

        for layer in (1..=max_level).rev() {
            let result = self.search_layer(&nodes, layer, 1, &[entry], query);
            if let Some(best) = result.first() {
                entry = best.id;
            }
        }

        let result = self.search_layer(&nodes, 0, ef_eff, &[entry], query);
        result.into_iter().take(k).map(|e| (e.id, e.dist)).collect()
    }

    /// Greedy best-first search over one layer, starting from `seeds`
    /// (spec §4.5 "Greedy layer search").
    fn search_layer(&self, nodes: &[Arc<Node>], layer: usize, ef: usize, seeds: &[NodeId], query: &[f32]) -> Vec<DistEntry> {
        let mut visited: HashSet<NodeId> = seeds.iter().copied().collect();
        let mut candidates = CandidateHeap::new();
        let mut result = ResultHeap::new(ef);

        for &s in seeds {
            let dist = self.params.distance.distance(query, &nodes[s].vector);
            let entry = DistEntry { dist, id: s };
            candidates.push(entry);
            result.push(entry);
        }

        while let Some(current) = candidates.pop() {
            if let Some(max) = result.max() {
                if result.is_full() && current.dist > max.dist {
                    break;
                }
            }
            for n in nodes[current.id].neighbors(layer) {
                if !visited.insert(n) {
                    continue;
                }
                let dist = self.params.distance.distance(query, &nodes[n].vector);
                let better = !result.is_full() || result.max().is_some_and(|m| dist < m.dist);
                if better {
                    let entry = DistEntry { dist, id: n };
                    candidates.push(entry);
                    result.push(entry);
                }
            }
        }

        result.into_sorted_vec()
    }

    /// Diversity-preserving neighbor selection (spec §4.5.1): accept `w`
    /// from the ascending-distance pool iff it is closer to the target than
    /// to every already-accepted neighbor.
    fn select_neighbors(&self, nodes: &[Arc<Node>], pool: &[DistEntry], m: usize) -> Vec<DistEntry> {
        let mut sorted = pool.to_vec();
        sorted.sort();

        let mut selected: Vec<DistEntry> = Vec::with_capacity(m.min(sorted.len()));
        for w in sorted {
            if selected.len() >= m {
                break;
            }
            let diverse = selected.iter().all(|r| {
                let dist_wr = self.params.distance.distance(&nodes[w.id].vector, &nodes[r.id].vector);
                w.dist < dist_wr
            });
            if diverse {
                selected.push(w);
            }
        }
        selected
    }

    /// Adds the bidirectional edge `a <-> b` at `layer`, locking both nodes'
    /// connection lists in ascending id order.
    fn connect(&self, nodes: &[Arc<Node>], a: NodeId, b: NodeId, layer: usize) {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let mut lo_conns = nodes[lo].connections_mut(layer);
        let mut hi_conns = nodes[hi].connections_mut(layer);
        if !lo_conns.contains(&hi) {
            lo_conns.push(hi);
        }
        if !hi_conns.contains(&lo) {
            hi_conns.push(lo);
        }
    }

    /// Step 4d: if `w`'s connection list at `layer` exceeds `Mmax(layer)`,
    /// reselect it via the same heuristic over its current neighbors.
    fn prune(&self, nodes: &[Arc<Node>], w: NodeId, layer: usize) {
        let mmax = self.params.mmax(layer);
        let mut conns = nodes[w].connections_mut(layer);
        if conns.len() <= mmax {
            return;
        }
        let pool: Vec<DistEntry> = conns
            .iter()
            .map(|&n| DistEntry { dist: self.params.distance.distance(&nodes[w].vector, &nodes[n].vector), id: n })
            .collect();
        let selected = self.select_neighbors(nodes, &pool, mmax);
        *conns = selected.into_iter().map(|e| e.id).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMetric;

    fn index(m: usize, ef: usize) -> HnswIndex {
        HnswIndex::new(HnswParams::new(4, m, ef, DistanceMetric::L2))
    }

    #[test]
    fn single_node_is_its_own_entry_point() {
        let idx = index(16, 200);
        let id = idx.insert(vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(idx.entry_point(), Some(id));
        assert_eq!(idx.max_level(), idx.node_level(id));
    }

    #[test]
    fn search_orders_by_distance() {
        let idx = index(16, 200);
        for i in 1..=5 {
            idx.insert(vec![i as f32, 0.0, 0.0, 0.0]);
        }
        let results = idx.search(&[3.0, 0.0, 0.0, 0.0], 3, 0);
        let ids: Vec<NodeId> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids[0], 2); // vector [3,0,0,0] itself, id 2 (0-indexed)
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn connections_respect_mmax() {
        let idx = index(4, 50);
        for i in 0..30 {
            idx.insert(vec![i as f32, (i % 3) as f32, 0.0, 0.0]);
        }
        for id in 0..idx.len() {
            let level = idx.node_level(id);
            for layer in 0..=level {
                let n = idx.node_neighbors(id, layer).len();
                assert!(n <= idx.params().mmax(layer), "node {id} layer {layer} has {n} neighbors");
            }
        }
    }

    #[test]
    fn edges_are_symmetric() {
        let idx = index(8, 100);
        for i in 0..20 {
            idx.insert(vec![i as f32, 0.0, 0.0, 0.0]);
        }
        for u in 0..idx.len() {
            for layer in 0..=idx.node_level(u) {
                for v in idx.node_neighbors(u, layer) {
                    assert!(idx.node_neighbors(v, layer).contains(&u), "edge {u}-{v} not symmetric at layer {layer}");
                }
            }
        }
    }
}
