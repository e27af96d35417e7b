use thiserror::Error;

/// Unified error taxonomy for the crate's public surface.
///
/// Out-of-range indexing on columns and bitmaps is a programming error and is
/// not represented here: callers get a panic, not a `Result`.
#[derive(Debug, Error)]
pub enum VectorLiteError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("document id must not be empty")]
    EmptyId,

    #[error("invalid dimension: {0}")]
    InvalidDimension(usize),

    #[error("array is empty")]
    EmptyArray,

    #[error("null values are not supported here")]
    NullNotSupported,

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("invalid file: {0}")]
    InvalidFile(String),

    #[error("truncated page")]
    Truncated,

    #[error("invalid value_size: {0}")]
    InvalidValueSize(u8),

    #[error("invalid index_size: {0}")]
    InvalidIndexSize(u8),

    #[error("invalid dictionary index {index} (num_entries = {num_entries})")]
    InvalidIndex { index: u32, num_entries: u32 },

    #[error("type mismatch")]
    TypeMismatch,

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("collection is closed")]
    CollectionClosed,

    #[error("index corrupted: {0}")]
    IndexCorrupted(String),

    #[error("storage corrupted: {0}")]
    StorageCorrupted(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VectorLiteError>;
