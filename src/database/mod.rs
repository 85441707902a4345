// file: src/database/mod.rs
// description: vector storage and embedding module exports
// reference: internal module structure

pub mod client;
pub mod embeddings;
pub mod insert;
pub mod schema;

pub use client::{LanceDbClient, StoredChunk};
pub use embeddings::{Embedder, GeminiEmbeddingClient, HashingEmbedder, build_embedder};
pub use insert::{BatchInserter, InsertStats};
pub use schema::SchemaManager;
