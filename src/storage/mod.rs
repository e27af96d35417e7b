//! Document storage: column file + metadata sidecar (spec §4.6).

pub mod document_storage;
pub mod sidecar;

pub use document_storage::{id_hash, DocumentStorage};
pub use sidecar::{Sidecar, SidecarEntry};
