// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod agent;
pub mod config;
pub mod data;
pub mod database;
pub mod error;
pub mod index;
pub mod llm;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod server;
pub mod utils;

pub use agent::{MarketIntelligenceAgent, Retrieval};
pub use config::{
    Config, DataConfig, EmbeddingConfig, EmbeddingProvider, IndexConfig, LlmConfig,
    RetrievalConfig, ServerConfig,
};
pub use data::{DataLoader, DocumentBuilder, SampleDataGenerator};
pub use database::{
    BatchInserter, Embedder, GeminiEmbeddingClient, HashingEmbedder, InsertStats, LanceDbClient,
    SchemaManager, build_embedder,
};
pub use error::{PipelineError, Result};
pub use index::{IndexManifest, VectorIndex};
pub use llm::{GeminiClient, SummarizationClient};
pub use models::{Answer, Chunk, Dataset, Document, Evidence, Query, SearchResult, SkillKind};
pub use parser::{Chunker, MarkdownRenderer, TextNormalizer};
pub use pipeline::{
    BuildReport, IndexBuilder, ProgressTracker, generate_sample_data, load_index, reset_index,
};
pub use server::{AppState, FilterOptions};
pub use utils::{HealthCheck, HealthReport, HealthStatus, OperationTimer, Validator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        let _renderer = MarkdownRenderer::new();
        let _embedder = HashingEmbedder::new(config.embedding.dimension);
    }
}
