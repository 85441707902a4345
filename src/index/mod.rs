// file: src/index/mod.rs
// description: in-memory retrieval index and its manifest
// reference: internal module structure

pub mod manifest;
pub mod vector_index;

pub use manifest::IndexManifest;
pub use vector_index::VectorIndex;
