//! `metadata.json` sidecar (spec §4.6, §6): maps `id_hash -> {original_id,
//! metadata}` and `original_id -> id_hash`, persisted atomically.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metadata::MetadataValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarEntry {
    pub original_id: String,
    pub metadata: BTreeMap<String, MetadataValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sidecar {
    pub entries: HashMap<i64, SidecarEntry>,
    pub id_to_hash: HashMap<String, i64>,
}

impl Sidecar {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Writes to a sibling temp file then renames over `path`, so readers
    /// never observe a partially written sidecar.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec(self)?)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
