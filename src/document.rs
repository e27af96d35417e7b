//! A user-facing document: an id, its vector, and opaque metadata.

use std::collections::BTreeMap;

use crate::metadata::MetadataValue;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl Document {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self { id: id.into(), vector, metadata: BTreeMap::new() }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, MetadataValue>) -> Self {
        self.metadata = metadata;
        self
    }
}
