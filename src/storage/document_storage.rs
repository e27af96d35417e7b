//! Columnar document storage (spec §4.6): one column file (`{id_hash: i64,
//! vector: fixed_size_list<f32, D>, timestamp: i64}`) plus the metadata
//! sidecar, fronted by an in-memory write buffer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::array::{ColumnArray, FixedSizeListArray, Int64Array};
use crate::document::Document;
use crate::error::{Result, VectorLiteError};
use crate::file::{ColumnFileReader, ColumnFileWriter, RecordBatch};
use crate::metadata::MetadataValue;
use crate::schema::{DataType, DataTypeLeaf, Field, Schema};
use crate::storage::sidecar::{Sidecar, SidecarEntry};

const MAX_BUFFER: usize = 1024;
const VECTORS_FILE: &str = "vectors.vlf";
const METADATA_FILE: &str = "metadata.json";

struct BufferedDoc {
    id_hash: i64,
    id: String,
    vector: Vec<f32>,
    metadata: BTreeMap<String, MetadataValue>,
    timestamp: i64,
}

struct StoredRow {
    id_hash: i64,
    vector: Vec<f32>,
    timestamp: i64,
}

pub struct DocumentStorage {
    dir: PathBuf,
    dimension: usize,
    buffer: Vec<BufferedDoc>,
    sidecar: Sidecar,
}

fn schema(dimension: usize) -> Schema {
    Schema::new(vec![
        Field::new("id_hash", DataType::Int64, false),
        Field::new("vector", DataType::FixedSizeList { element: Box::new(DataTypeLeaf::Float32), size: dimension }, false),
        Field::new("timestamp", DataType::Int64, false),
    ])
}

/// 64-bit FNV-1a of the UTF-8 id bytes.
pub fn id_hash(id: &str) -> i64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in id.as_bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash as i64
}

fn now_ts() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

impl DocumentStorage {
    pub fn open(dir: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let sidecar = Sidecar::load(&dir.join(METADATA_FILE))?;
        Ok(Self { dir, dimension, buffer: Vec::new(), sidecar })
    }

    fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    fn sidecar_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn len(&self) -> usize {
        self.sidecar.entries.len() + self.buffer.iter().filter(|d| !self.sidecar.id_to_hash.contains_key(&d.id)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffers `doc`; flushes when the buffer reaches `max_buffer`. Rejects
    /// an `id_hash` collision against a different existing id.
    pub fn insert(&mut self, doc: &Document) -> Result<()> {
        let hash = id_hash(&doc.id);
        if let Some(existing) = self.sidecar.entries.get(&hash) {
            if existing.original_id != doc.id {
                return Err(VectorLiteError::StorageCorrupted(format!(
                    "id_hash collision between {:?} and {:?}",
                    existing.original_id, doc.id
                )));
            }
        }
        self.buffer.push(BufferedDoc {
            id_hash: hash,
            id: doc.id.clone(),
            vector: doc.vector.clone(),
            metadata: doc.metadata.clone(),
            timestamp: now_ts(),
        });
        if self.buffer.len() >= MAX_BUFFER {
            self.flush()?;
        }
        Ok(())
    }

    /// Checks the write buffer first (linear scan), then the sidecar plus a
    /// full column-file scan for the matching row.
    pub fn get(&self, id: &str) -> Result<Option<Document>> {
        if let Some(buffered) = self.buffer.iter().rev().find(|d| d.id == id) {
            return Ok(Some(Document { id: buffered.id.clone(), vector: buffered.vector.clone(), metadata: buffered.metadata.clone() }));
        }
        let Some(&hash) = self.sidecar.id_to_hash.get(id) else {
            return Ok(None);
        };
        let Some(entry) = self.sidecar.entries.get(&hash) else {
            return Ok(None);
        };
        let rows = self.read_all_rows()?;
        let row = rows.into_iter().find(|r| r.id_hash == hash);
        Ok(row.map(|r| Document { id: entry.original_id.clone(), vector: r.vector, metadata: entry.metadata.clone() }))
    }

    /// Removes `id` from the sidecar and write buffer. The underlying column
    /// file row becomes a tombstone, filtered out because the sidecar no
    /// longer maps its `id_hash`.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        self.buffer.retain(|d| d.id != id);
        let Some(hash) = self.sidecar.id_to_hash.remove(id) else {
            return Ok(false);
        };
        self.sidecar.entries.remove(&hash);
        Ok(true)
    }

    /// Rewrites the column file and sidecar from scratch: reads existing
    /// rows, appends the buffer, writes both atomically, then clears the
    /// buffer. Quadratic in total document count across repeated flushes —
    /// an accepted MVP cost (spec §9 "I/O future work").
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let mut rows = self.read_all_rows()?;
        let buffered_hashes: std::collections::HashSet<i64> = self.buffer.iter().map(|d| d.id_hash).collect();
        // Drop tombstoned rows (deleted since the last flush) and rows about
        // to be superseded by a fresher buffered write for the same id_hash.
        rows.retain(|r| self.sidecar.entries.contains_key(&r.id_hash) && !buffered_hashes.contains(&r.id_hash));
        for doc in &self.buffer {
            rows.push(StoredRow { id_hash: doc.id_hash, vector: doc.vector.clone(), timestamp: doc.timestamp });
            self.sidecar.entries.insert(doc.id_hash, SidecarEntry { original_id: doc.id.clone(), metadata: doc.metadata.clone() });
            self.sidecar.id_to_hash.insert(doc.id.clone(), doc.id_hash);
        }

        self.write_rows(&rows)?;
        if let Err(e) = self.sidecar.save(&self.sidecar_path()) {
            warn!("document storage sidecar save failed after flush: {e}");
            return Err(e);
        }
        self.buffer.clear();
        Ok(())
    }

    fn read_all_rows(&self) -> Result<Vec<StoredRow>> {
        let path = self.vectors_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = ColumnFileReader::open(&path)?;
        let batch = reader.read_record_batch()?;
        let id_hash_col = match &batch.columns[0] {
            ColumnArray::Int64(a) => a,
            _ => return Err(VectorLiteError::SchemaMismatch("expected id_hash:i64 as column 0".to_string())),
        };
        let vector_col = match &batch.columns[1] {
            ColumnArray::FixedSizeList(a) => a,
            _ => return Err(VectorLiteError::SchemaMismatch("expected vector column 1".to_string())),
        };
        let timestamp_col = match &batch.columns[2] {
            ColumnArray::Int64(a) => a,
            _ => return Err(VectorLiteError::SchemaMismatch("expected timestamp:i64 as column 2".to_string())),
        };

        let mut rows = Vec::with_capacity(id_hash_col.len());
        for i in 0..id_hash_col.len() {
            rows.push(StoredRow {
                id_hash: id_hash_col.get(i).expect("non-nullable column"),
                vector: vector_col.get_f32_row(i).expect("non-nullable column"),
                timestamp: timestamp_col.get(i).expect("non-nullable column"),
            });
        }
        Ok(rows)
    }

    fn write_rows(&self, rows: &[StoredRow]) -> Result<()> {
        let schema = schema(self.dimension);
        let mut writer = ColumnFileWriter::create(self.vectors_path(), schema.clone())?;
        let id_hashes = Int64Array::new(rows.iter().map(|r| r.id_hash).collect(), None);
        let vectors = FixedSizeListArray::from_f32_rows(rows.iter().map(|r| r.vector.clone()).collect(), self.dimension);
        let timestamps = Int64Array::new(rows.iter().map(|r| r.timestamp).collect(), None);
        let batch = RecordBatch::try_new(
            schema,
            vec![ColumnArray::Int64(id_hashes), ColumnArray::FixedSizeList(vectors), ColumnArray::Int64(timestamps)],
        );
        writer.write_record_batch(batch)?;
        writer.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_flush_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DocumentStorage::open(dir.path(), 3).unwrap();
        let doc = Document::new("a", vec![1.0, 2.0, 3.0]).with_metadata(BTreeMap::from([("k".to_string(), MetadataValue::I64(1))]));
        storage.insert(&doc).unwrap();
        storage.flush().unwrap();

        let fetched = storage.get("a").unwrap().unwrap();
        assert_eq!(fetched.vector, vec![1.0, 2.0, 3.0]);
        assert_eq!(fetched.metadata["k"], MetadataValue::I64(1));
    }

    #[test]
    fn get_checks_buffer_before_flush() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DocumentStorage::open(dir.path(), 2).unwrap();
        storage.insert(&Document::new("a", vec![1.0, 2.0])).unwrap();
        assert!(storage.get("a").unwrap().is_some());
    }

    #[test]
    fn delete_removes_from_buffer_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DocumentStorage::open(dir.path(), 2).unwrap();
        storage.insert(&Document::new("a", vec![1.0, 2.0])).unwrap();
        storage.flush().unwrap();
        assert!(storage.delete("a").unwrap());
        assert_eq!(storage.get("a").unwrap(), None);
    }

    #[test]
    fn id_hash_is_stable() {
        assert_eq!(id_hash("a"), id_hash("a"));
        assert_ne!(id_hash("a"), id_hash("b"));
    }
}
