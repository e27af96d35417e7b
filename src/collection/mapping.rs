//! `docToNode` / `nodeToDoc` bijection, persisted as `mappings.json`
//! (spec §4.7, §6).

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hnsw::NodeId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mapping {
    doc_to_node: HashMap<String, NodeId>,
    node_to_doc: HashMap<NodeId, String>,
}

impl Mapping {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec(self)?)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.doc_to_node.contains_key(id)
    }

    pub fn node_of(&self, id: &str) -> Option<NodeId> {
        self.doc_to_node.get(id).copied()
    }

    pub fn id_of(&self, node: NodeId) -> Option<&str> {
        self.node_to_doc.get(&node).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.doc_to_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_to_node.is_empty()
    }

    /// Adds `id <-> node`. Overwrites any prior mapping for `id`, leaving
    /// its old node orphaned in `nodeToDoc` (the intended "update" path).
    pub fn insert(&mut self, id: String, node: NodeId) {
        if let Some(old_node) = self.doc_to_node.insert(id.clone(), node) {
            self.node_to_doc.remove(&old_node);
        }
        self.node_to_doc.insert(node, id);
    }

    pub fn remove(&mut self, id: &str) -> Option<NodeId> {
        let node = self.doc_to_node.remove(id)?;
        self.node_to_doc.remove(&node);
        Some(node)
    }

    /// Verifies the bijection invariant (spec §8 "Graph bijection").
    #[cfg(test)]
    pub fn is_bijective(&self) -> bool {
        self.doc_to_node.iter().all(|(id, &node)| self.node_to_doc.get(&node) == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup_both_directions() {
        let mut m = Mapping::default();
        m.insert("a".to_string(), 0);
        assert_eq!(m.node_of("a"), Some(0));
        assert_eq!(m.id_of(0), Some("a"));
        assert!(m.is_bijective());
    }

    #[test]
    fn reinsert_orphans_old_node() {
        let mut m = Mapping::default();
        m.insert("a".to_string(), 0);
        m.insert("a".to_string(), 1);
        assert_eq!(m.node_of("a"), Some(1));
        assert_eq!(m.id_of(0), None);
        assert!(m.is_bijective());
    }

    #[test]
    fn remove_clears_both_directions() {
        let mut m = Mapping::default();
        m.insert("a".to_string(), 0);
        m.remove("a");
        assert_eq!(m.node_of("a"), None);
        assert_eq!(m.id_of(0), None);
    }

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        let mut m = Mapping::default();
        m.insert("a".to_string(), 0);
        m.save(&path).unwrap();
        let loaded = Mapping::load(&path).unwrap();
        assert_eq!(loaded.node_of("a"), Some(0));
    }
}
