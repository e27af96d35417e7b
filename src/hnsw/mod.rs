//! In-memory HNSW graph index (spec §4.5).

pub mod heap;
pub mod index;
pub mod node;
pub mod params;

pub use index::HnswIndex;
pub use node::{Node, NodeId};
pub use params::{adaptive_params, HnswParams};
