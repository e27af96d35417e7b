//! `Collection`: orchestrates the HNSW index, document storage, and the
//! `docToNode`/`nodeToDoc` mapping behind one multi-reader/single-writer
//! lock (spec §4.7, §5).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::array::{ColumnArray, Int64Array, ListArray};
use crate::cancel::CancellationToken;
use crate::collection::mapping::Mapping;
use crate::collection::stats::CollectionStats;
use crate::config::CollectionConfig;
use crate::document::Document;
use crate::error::{Result, VectorLiteError};
use crate::file::{ColumnFileReader, ColumnFileWriter, RecordBatch};
use crate::hnsw::{HnswIndex, HnswParams, Node, NodeId};
use crate::metadata::{FilterPredicate, MetadataValue};
use crate::schema::{DataType, DataTypeLeaf, Field, Schema};
use crate::storage::DocumentStorage;

const INDEX_DIR: &str = "index";
const DOCUMENTS_DIR: &str = "documents";
const NODES_FILE: &str = "nodes.vlf";
const GRAPH_FILE: &str = "graph.vlf";
const META_FILE: &str = "meta.json";
const MAPPINGS_FILE: &str = "mappings.json";

const ADAPTIVE_EXPANSION_INITIAL_FACTOR: usize = 2;
const ADAPTIVE_EXPANSION_CAP_FACTOR: usize = 20;
const ADAPTIVE_EXPANSION_MAX_ATTEMPTS: usize = 5;

#[derive(Serialize, Deserialize)]
struct IndexMeta {
    entry_point: Option<NodeId>,
    max_level: usize,
    config: CollectionConfig,
}

struct Inner {
    hnsw: HnswIndex,
    storage: DocumentStorage,
    mapping: Mapping,
    closed: bool,
}

pub struct Collection {
    dir: PathBuf,
    config: CollectionConfig,
    inner: RwLock<Inner>,
}

impl Collection {
    pub fn open(dir: impl AsRef<Path>, config: CollectionConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let meta_path = dir.join(INDEX_DIR).join(META_FILE);

        if meta_path.exists() {
            return Self::reopen(dir, config);
        }

        std::fs::create_dir_all(dir.join(INDEX_DIR))?;
        let storage = DocumentStorage::open(dir.join(DOCUMENTS_DIR), config.dimension)?;
        let params = HnswParams::new(config.dimension, config.m, config.ef_construction, config.distance);
        let inner = Inner { hnsw: HnswIndex::new(params), storage, mapping: Mapping::default(), closed: false };
        Ok(Self { dir, config, inner: RwLock::new(inner) })
    }

    fn reopen(dir: PathBuf, config: CollectionConfig) -> Result<Self> {
        let meta_bytes = std::fs::read(dir.join(INDEX_DIR).join(META_FILE))?;
        let meta: IndexMeta = serde_json::from_slice(&meta_bytes)?;

        let params = HnswParams::new(meta.config.dimension, meta.config.m, meta.config.ef_construction, meta.config.distance);
        let (nodes, edges) = Self::load_index_files(&dir)?;
        let hnsw = HnswIndex::from_parts(params, meta.entry_point, meta.max_level, nodes, edges);

        let storage = DocumentStorage::open(dir.join(DOCUMENTS_DIR), meta.config.dimension)?;
        let mapping = Mapping::load(&dir.join(MAPPINGS_FILE))?;

        Ok(Self { dir, config: meta.config, inner: RwLock::new(Inner { hnsw, storage, mapping, closed: false }) })
    }

    fn nodes_schema() -> Schema {
        Schema::new(vec![Field::new("id", DataType::Int64, false), Field::new("level", DataType::Int64, false)])
    }

    fn graph_schema() -> Schema {
        Schema::new(vec![
            Field::new("node_id", DataType::Int64, false),
            Field::new("layer", DataType::Int64, false),
            Field::new("neighbors", DataType::List { element: Box::new(DataTypeLeaf::Int32) }, false),
        ])
    }

    fn load_index_files(dir: &Path) -> Result<(Vec<Node>, Vec<(NodeId, usize, Vec<NodeId>)>)> {
        let nodes_path = dir.join(INDEX_DIR).join(NODES_FILE);
        let graph_path = dir.join(INDEX_DIR).join(GRAPH_FILE);
        if !nodes_path.exists() {
            return Ok((Vec::new(), Vec::new()));
        }

        let nodes_reader = ColumnFileReader::open(&nodes_path)?;
        let nodes_batch = nodes_reader.read_record_batch()?;
        let ids = match &nodes_batch.columns[0] {
            ColumnArray::Int64(a) => a,
            _ => return Err(VectorLiteError::SchemaMismatch("nodes file: expected id:i64".to_string())),
        };
        let levels = match &nodes_batch.columns[1] {
            ColumnArray::Int64(a) => a,
            _ => return Err(VectorLiteError::SchemaMismatch("nodes file: expected level:i64".to_string())),
        };
        // The vector column lives in documents/vectors.vlf keyed by id_hash,
        // not by nodeID, so node vectors are carried in the graph file's
        // node-local copy written by `save` (see `write_index_files`).
        let vectors_reader = ColumnFileReader::open(dir.join(INDEX_DIR).join("node_vectors.vlf"))?;
        let vectors_batch = vectors_reader.read_record_batch()?;
        let vector_col = match &vectors_batch.columns[0] {
            ColumnArray::FixedSizeList(a) => a,
            _ => return Err(VectorLiteError::SchemaMismatch("node_vectors file: expected vector column".to_string())),
        };

        let mut nodes = Vec::with_capacity(ids.len());
        for i in 0..ids.len() {
            let id = ids.get(i).expect("non-nullable") as usize;
            let level = levels.get(i).expect("non-nullable") as usize;
            let vector = vector_col.get_f32_row(i).expect("non-nullable");
            nodes.push(Node::new(id, level, vector));
        }

        let mut edges = Vec::new();
        if graph_path.exists() {
            let graph_reader = ColumnFileReader::open(&graph_path)?;
            let graph_batch = graph_reader.read_record_batch()?;
            let node_ids = match &graph_batch.columns[0] {
                ColumnArray::Int64(a) => a,
                _ => return Err(VectorLiteError::SchemaMismatch("graph file: expected node_id:i64".to_string())),
            };
            let layers = match &graph_batch.columns[1] {
                ColumnArray::Int64(a) => a,
                _ => return Err(VectorLiteError::SchemaMismatch("graph file: expected layer:i64".to_string())),
            };
            let neighbors = match &graph_batch.columns[2] {
                ColumnArray::List(a) => a,
                _ => return Err(VectorLiteError::SchemaMismatch("graph file: expected neighbors:list<i32>".to_string())),
            };
            for i in 0..node_ids.len() {
                let node_id = node_ids.get(i).expect("non-nullable") as usize;
                let layer = layers.get(i).expect("non-nullable") as usize;
                let row = neighbors.get_i32_row(i).unwrap_or_default();
                edges.push((node_id, layer, row.into_iter().map(|n| n as usize).collect()));
            }
        }

        Ok((nodes, edges))
    }

    fn write_index_files(&self, inner: &Inner) -> Result<()> {
        let index_dir = self.dir.join(INDEX_DIR);
        std::fs::create_dir_all(&index_dir)?;

        let n = inner.hnsw.len();
        let ids: Vec<i64> = (0..n as i64).collect();
        let (levels, vectors): (Vec<i64>, Vec<Vec<f32>>) =
            itertools::multiunzip((0..n).map(|i| (inner.hnsw.node_level(i) as i64, inner.hnsw.node_vector(i))));

        let nodes_schema = Self::nodes_schema();
        let mut nodes_writer = ColumnFileWriter::create(index_dir.join(NODES_FILE), nodes_schema.clone())?;
        nodes_writer.write_record_batch(RecordBatch::try_new(
            nodes_schema,
            vec![ColumnArray::Int64(Int64Array::new(ids.clone(), None)), ColumnArray::Int64(Int64Array::new(levels, None))],
        ))?;
        nodes_writer.close()?;

        let vector_schema = Schema::new(vec![Field::new(
            "vector",
            DataType::FixedSizeList { element: Box::new(DataTypeLeaf::Float32), size: self.config.dimension },
            false,
        )]);
        let mut vector_writer = ColumnFileWriter::create(index_dir.join("node_vectors.vlf"), vector_schema.clone())?;
        vector_writer.write_record_batch(RecordBatch::try_new(
            vector_schema,
            vec![ColumnArray::FixedSizeList(crate::array::FixedSizeListArray::from_f32_rows(vectors, self.config.dimension))],
        ))?;
        vector_writer.close()?;

        let mut graph_node_ids = Vec::new();
        let mut graph_layers = Vec::new();
        let mut graph_neighbors = Vec::new();
        for id in 0..n {
            for layer in 0..=inner.hnsw.node_level(id) {
                graph_node_ids.push(id as i64);
                graph_layers.push(layer as i64);
                graph_neighbors.push(inner.hnsw.node_neighbors(id, layer).into_iter().map(|x| x as i32).collect::<Vec<i32>>());
            }
        }
        let graph_schema = Self::graph_schema();
        let mut graph_writer = ColumnFileWriter::create(index_dir.join(GRAPH_FILE), graph_schema.clone())?;
        graph_writer.write_record_batch(RecordBatch::try_new(
            graph_schema,
            vec![
                ColumnArray::Int64(Int64Array::new(graph_node_ids, None)),
                ColumnArray::Int64(Int64Array::new(graph_layers, None)),
                ColumnArray::List(ListArray::from_rows(graph_neighbors, None)),
            ],
        ))?;
        graph_writer.close()?;

        let meta = IndexMeta { entry_point: inner.hnsw.entry_point(), max_level: inner.hnsw.max_level(), config: self.config.clone() };
        std::fs::write(index_dir.join(META_FILE), serde_json::to_vec(&meta)?)?;
        Ok(())
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn insert(&self, id: &str, vector: Vec<f32>, metadata: BTreeMap<String, MetadataValue>, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        let mut inner = self.inner.write().expect("collection lock poisoned");
        cancel.check()?;
        self.insert_locked(&mut inner, id, vector, metadata)
    }

    fn insert_locked(&self, inner: &mut Inner, id: &str, vector: Vec<f32>, metadata: BTreeMap<String, MetadataValue>) -> Result<()> {
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        if id.is_empty() {
            return Err(VectorLiteError::EmptyId);
        }
        if vector.len() != self.config.dimension {
            return Err(VectorLiteError::DimensionMismatch { expected: self.config.dimension, got: vector.len() });
        }
        if inner.mapping.contains_id(id) {
            return Err(VectorLiteError::DuplicateId(id.to_string()));
        }

        let node_id = inner.hnsw.insert(vector.clone());
        let doc = Document::new(id, vector).with_metadata(metadata);
        match inner.storage.insert(&doc) {
            Ok(()) => {
                inner.mapping.insert(id.to_string(), node_id);
                Ok(())
            }
            Err(e) => {
                warn!("node {node_id} orphaned after persistence failure for document {id:?}: {e}");
                Err(e)
            }
        }
    }

    /// Validates every input before inserting any of them; not atomic on
    /// persistence (spec §7).
    pub fn insert_batch(&self, docs: Vec<(String, Vec<f32>, BTreeMap<String, MetadataValue>)>, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        let mut inner = self.inner.write().expect("collection lock poisoned");
        cancel.check()?;
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }

        let mut seen = std::collections::HashSet::new();
        for (id, vector, _) in &docs {
            if id.is_empty() {
                return Err(VectorLiteError::EmptyId);
            }
            if vector.len() != self.config.dimension {
                return Err(VectorLiteError::DimensionMismatch { expected: self.config.dimension, got: vector.len() });
            }
            if inner.mapping.contains_id(id) || !seen.insert(id.clone()) {
                return Err(VectorLiteError::DuplicateId(id.clone()));
            }
        }

        for (id, vector, metadata) in docs {
            cancel.check()?;
            self.insert_locked(&mut inner, &id, vector, metadata)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Document>> {
        let inner = self.inner.read().expect("collection lock poisoned");
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        inner.storage.get(id)
    }

    /// Tolerant: missing ids are skipped rather than failing the batch.
    pub fn get_batch(&self, ids: &[String]) -> Result<Vec<Document>> {
        let inner = self.inner.read().expect("collection lock poisoned");
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        let mut out = Vec::new();
        for id in ids {
            if let Some(doc) = inner.storage.get(id)? {
                out.push(doc);
            }
        }
        Ok(out)
    }

    /// Allocates a new graph vertex for `vector`, orphans the old one,
    /// overwrites the sidecar entry, and atomically swaps the mapping.
    pub fn update(&self, id: &str, vector: Vec<f32>, metadata: BTreeMap<String, MetadataValue>, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        let mut inner = self.inner.write().expect("collection lock poisoned");
        cancel.check()?;
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        if vector.len() != self.config.dimension {
            return Err(VectorLiteError::DimensionMismatch { expected: self.config.dimension, got: vector.len() });
        }
        if !inner.mapping.contains_id(id) {
            return Err(VectorLiteError::DocumentNotFound(id.to_string()));
        }

        let node_id = inner.hnsw.insert(vector.clone());
        let doc = Document::new(id, vector).with_metadata(metadata);
        inner.storage.insert(&doc)?;
        inner.mapping.insert(id.to_string(), node_id);
        Ok(())
    }

    /// Insert-or-update depending on whether `id` already exists.
    pub fn upsert(&self, id: &str, vector: Vec<f32>, metadata: BTreeMap<String, MetadataValue>, cancel: &CancellationToken) -> Result<()> {
        let exists = {
            let inner = self.inner.read().expect("collection lock poisoned");
            inner.mapping.contains_id(id)
        };
        if exists {
            self.update(id, vector, metadata, cancel)
        } else {
            self.insert(id, vector, metadata, cancel)
        }
    }

    pub fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<bool> {
        cancel.check()?;
        let mut inner = self.inner.write().expect("collection lock poisoned");
        cancel.check()?;
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        inner.mapping.remove(id);
        inner.storage.delete(id)
    }

    /// Tolerant: continues past individual failures, returning the last
    /// error encountered (spec §7).
    pub fn delete_batch(&self, ids: &[String], cancel: &CancellationToken) -> Result<()> {
        let mut last_err = None;
        for id in ids {
            cancel.check()?;
            if let Err(e) = self.delete(id, cancel) {
                last_err = Some(e);
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Plain search: orphans are skipped and do not consume the `k` budget,
    /// so fewer than `k` results may be returned (spec §4.7).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Document>> {
        let inner = self.inner.read().expect("collection lock poisoned");
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        if query.len() != self.config.dimension {
            return Err(VectorLiteError::DimensionMismatch { expected: self.config.dimension, got: query.len() });
        }
        self.search_locked(&inner, query, k)
    }

    fn search_locked(&self, inner: &Inner, query: &[f32], k: usize) -> Result<Vec<Document>> {
        let raw = inner.hnsw.search(query, k, 0);
        let mut out = Vec::with_capacity(raw.len());
        for (node_id, _dist) in raw {
            let Some(id) = inner.mapping.id_of(node_id) else { continue };
            if let Some(doc) = inner.storage.get(id)? {
                out.push(doc);
            }
        }
        Ok(out)
    }

    /// Adaptive-expansion filtered search (spec §4.7): widens the internal
    /// batch size up to `20k` over at most 5 attempts to try to accumulate
    /// `k` matches past a selective predicate.
    pub fn search_with_filter(&self, query: &[f32], k: usize, predicate: &FilterPredicate, cancel: &CancellationToken) -> Result<Vec<Document>> {
        let inner = self.inner.read().expect("collection lock poisoned");
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        if query.len() != self.config.dimension {
            return Err(VectorLiteError::DimensionMismatch { expected: self.config.dimension, got: query.len() });
        }

        let cap = (ADAPTIVE_EXPANSION_CAP_FACTOR * k).max(k);
        let mut batch = (ADAPTIVE_EXPANSION_INITIAL_FACTOR * k).max(k).min(cap);

        for attempt in 0..ADAPTIVE_EXPANSION_MAX_ATTEMPTS {
            cancel.check()?;
            let raw = inner.hnsw.search(query, batch, 0);
            let exhausted = raw.len() < batch;

            let mut filtered = Vec::new();
            for (node_id, _dist) in &raw {
                let Some(id) = inner.mapping.id_of(*node_id) else { continue };
                if let Some(doc) = inner.storage.get(id)? {
                    if predicate(&doc.metadata) {
                        filtered.push(doc);
                    }
                }
            }

            if filtered.len() >= k || exhausted || attempt + 1 == ADAPTIVE_EXPANSION_MAX_ATTEMPTS {
                filtered.truncate(k);
                return Ok(filtered);
            }
            batch = (batch * 2).min(cap);
        }
        unreachable!("loop always returns within ADAPTIVE_EXPANSION_MAX_ATTEMPTS")
    }

    /// Runs each query's graph search on a rayon worker, the way the
    /// teacher's `HnswBuilder::build` spreads independent per-node work
    /// across `rayon::iter::IntoParallelIterator`. Read-only, so every
    /// worker shares the same `inner` read guard.
    pub fn search_batch(&self, queries: &[Vec<f32>], k: usize, cancel: &CancellationToken) -> Result<Vec<Vec<Document>>> {
        let inner = self.inner.read().expect("collection lock poisoned");
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        queries
            .par_iter()
            .map(|query| {
                cancel.check()?;
                if query.len() != self.config.dimension {
                    return Err(VectorLiteError::DimensionMismatch { expected: self.config.dimension, got: query.len() });
                }
                self.search_locked(&inner, query, k)
            })
            .collect()
    }

    pub fn count(&self) -> Result<usize> {
        let inner = self.inner.read().expect("collection lock poisoned");
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        Ok(inner.mapping.len())
    }

    pub fn stats(&self) -> Result<CollectionStats> {
        let inner = self.inner.read().expect("collection lock poisoned");
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        let node_count = inner.hnsw.len();
        let doc_count = inner.mapping.len();
        Ok(CollectionStats {
            doc_count,
            node_count,
            orphan_count: node_count.saturating_sub(doc_count),
            max_level: inner.hnsw.max_level(),
            dimension: self.config.dimension,
        })
    }

    pub fn save(&self) -> Result<()> {
        let mut inner = self.inner.write().expect("collection lock poisoned");
        if inner.closed {
            return Err(VectorLiteError::CollectionClosed);
        }
        inner.storage.flush()?;
        self.write_index_files(&inner)?;
        inner.mapping.save(&self.dir.join(MAPPINGS_FILE))?;
        Ok(())
    }

    /// Idempotent: closing twice returns without error (spec §8).
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write().expect("collection lock poisoned");
        inner.closed = true;
        Ok(())
    }

    /// Closes the collection and removes its entire on-disk directory.
    pub fn drop_collection(&self) -> Result<()> {
        {
            let mut inner = self.inner.write().expect("collection lock poisoned");
            inner.closed = true;
        }
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}
