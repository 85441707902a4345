// file: src/config.rs
// description: application configuration management with toml and environment support
// reference: https://docs.rs/config

use crate::error::{PipelineError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "MARKET_INTEL";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub data: DataConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub seed: u64,
    pub rate_records: usize,
    pub claim_records: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    pub uri: String,
    pub documents_table: String,
    pub chunks_table: String,
    pub manifest_path: PathBuf,
    pub batch_size: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Hashing,
    Gemini,
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hashing => write!(f, "hashing"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Chunks pulled from the index before context filters apply.
    pub search_k: usize,
    /// Chunks handed to the model as evidence.
    pub context_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub max_concurrent_queries: usize,
    pub timeout_secs: u64,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = config::Config::try_from(&Self::default_config())
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        config.apply_google_env();
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            data: DataConfig {
                dir: PathBuf::from("data"),
                seed: 42,
                rate_records: 500,
                claim_records: 200,
            },
            index: IndexConfig {
                uri: "vector_store/lancedb".to_string(),
                documents_table: "documents".to_string(),
                chunks_table: "chunks".to_string(),
                manifest_path: PathBuf::from("vector_store/manifest.json"),
                batch_size: 64,
                chunk_size: 512,
                chunk_overlap: 64,
            },
            embedding: EmbeddingConfig {
                provider: EmbeddingProvider::Hashing,
                model: "text-embedding-004".to_string(),
                dimension: 384,
                api_key: None,
                base_url: "https://generativelanguage.googleapis.com".to_string(),
            },
            llm: LlmConfig {
                api_key: None,
                model: "gemini-1.5-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                temperature: 0.7,
                top_p: 0.8,
                top_k: 40,
                max_output_tokens: 2048,
                timeout_secs: 120,
            },
            retrieval: RetrievalConfig {
                search_k: 10,
                context_k: 5,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8501,
                username: "analyst".to_string(),
                password: None,
                max_concurrent_queries: 1,
                timeout_secs: 180,
            },
        }
    }

    /// `GOOGLE_API_KEY` and `GEMINI_MODEL` fill in whatever the file and
    /// prefixed variables left unset.
    fn apply_google_env(&mut self) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = std::env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        if let Ok(model) = std::env::var("GEMINI_MODEL")
            && !model.trim().is_empty()
        {
            self.llm.model = model;
        }

        if self.embedding.api_key.is_none() {
            self.embedding.api_key = self.llm.api_key.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.index.batch_size == 0 {
            return Err(PipelineError::Config(
                "index.batch_size must be greater than 0".to_string(),
            ));
        }

        if self.index.chunk_size == 0 {
            return Err(PipelineError::Config(
                "index.chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(PipelineError::Config(format!(
                "index.chunk_overlap ({}) must be smaller than index.chunk_size ({})",
                self.index.chunk_overlap, self.index.chunk_size
            )));
        }

        if self.embedding.dimension == 0 {
            return Err(PipelineError::Config(
                "embedding.dimension must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.search_k == 0 || self.retrieval.context_k == 0 {
            return Err(PipelineError::Config(
                "retrieval.search_k and retrieval.context_k must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.context_k > self.retrieval.search_k {
            return Err(PipelineError::Config(format!(
                "retrieval.context_k ({}) cannot exceed retrieval.search_k ({})",
                self.retrieval.context_k, self.retrieval.search_k
            )));
        }

        if self.server.max_concurrent_queries == 0 {
            return Err(PipelineError::Config(
                "server.max_concurrent_queries must be greater than 0".to_string(),
            ));
        }

        if self.data.rate_records == 0 || self.data.claim_records == 0 {
            return Err(PipelineError::Config(
                "data.rate_records and data.claim_records must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn require_llm_key(&self) -> Result<&str> {
        self.llm.api_key.as_deref().ok_or_else(|| {
            PipelineError::Config(
                "GOOGLE_API_KEY not found; add it to your .env file or environment".to_string(),
            )
        })
    }
}
