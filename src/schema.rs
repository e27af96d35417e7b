//! Column type ids and field descriptors (spec §3 "Column").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Int32,
    Int64,
    Float32,
    Float64,
    /// Fixed-size list of primitives, e.g. the vector column. `size` is the
    /// number of elements per row.
    FixedSizeList { element: Box<DataTypeLeaf>, size: usize },
    /// Variable-length list of primitives.
    List { element: Box<DataTypeLeaf> },
    Utf8,
}

/// The subset of [`DataType`] valid as a list element type (no nested lists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataTypeLeaf {
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DataTypeLeaf {
    pub fn byte_width(self) -> usize {
        match self {
            DataTypeLeaf::Int32 | DataTypeLeaf::Float32 => 4,
            DataTypeLeaf::Int64 | DataTypeLeaf::Float64 => 8,
        }
    }
}

impl DataType {
    /// Fixed per-element byte width for plain encoding; `None` for
    /// variable-length types (Utf8, List).
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::Float64 => Some(8),
            DataType::FixedSizeList { element, size } => Some(element.byte_width() * size),
            DataType::List { .. } | DataType::Utf8 => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}
