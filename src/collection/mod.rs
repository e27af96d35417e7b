//! A collection ties the HNSW index, document storage, and the id/node
//! mapping together behind one lock (spec §4.7, §5).

pub mod core;
pub mod mapping;
pub mod stats;

pub use core::Collection;
pub use stats::CollectionStats;
