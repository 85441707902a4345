// file: src/pipeline/builder.rs
// description: builds, loads and resets the persisted vector index
// reference: coordinates loading, chunking, embedding and LanceDB writes

use crate::config::Config;
use crate::data::{DataLoader, DocumentBuilder, SampleDataGenerator};
use crate::database::{BatchInserter, Embedder, LanceDbClient, SchemaManager};
use crate::error::{PipelineError, Result};
use crate::index::{IndexManifest, VectorIndex};
use crate::models::{Chunk, Dataset};
use crate::parser::Chunker;
use crate::pipeline::progress::ProgressTracker;
use crate::utils::OperationTimer;
use chrono::{NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub rate_records: usize,
    pub claim_records: usize,
    pub filings: usize,
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub batches: usize,
    pub manifest: IndexManifest,
}

impl BuildReport {
    pub fn summary_text(&self) -> String {
        format!(
            "Market Intelligence Agent Setup Summary\n\
             {}\n\
             Data Generated:\n\
             - Rate records: {}\n\
             - Claims records: {}\n\
             - Regulatory filings: {}\n\
             - Vector store documents: {}\n\
             - Vector store chunks: {}\n\
             \n\
             Embeddings: {}/{} ({} dimensions)\n\
             Built at: {}\n\
             \n\
             Agent ready for use!\n",
            "=".repeat(40),
            self.rate_records,
            self.claim_records,
            self.filings,
            self.documents,
            self.chunks,
            self.manifest.provider,
            self.manifest.model,
            self.dimension,
            self.manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }

    pub fn write_summary(&self, path: &Path) -> Result<()> {
        fs::write(path, self.summary_text()).map_err(|source| PipelineError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Setup summary written to {}", path.display());
        Ok(())
    }
}

pub struct IndexBuilder {
    config: Config,
    embedder: Arc<dyn Embedder>,
    show_progress: bool,
    colored: bool,
}

impl IndexBuilder {
    pub fn new(config: Config, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config,
            embedder,
            show_progress: false,
            colored: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool, colored: bool) -> Self {
        self.show_progress = show_progress;
        self.colored = colored;
        self
    }

    /// Rebuilds the index from the data directory. Everything is loaded,
    /// chunked and embedded before the existing tables are dropped, so a bad
    /// input file or a failing embedder leaves the previous index in place.
    pub async fn build(&self) -> Result<BuildReport> {
        let timer = OperationTimer::new("build index");

        let dataset = DataLoader::new(&self.config.data.dir).load()?;
        let documents = DocumentBuilder::build(&dataset);

        let chunker = Chunker::new(self.config.index.chunk_size, self.config.index.chunk_overlap)?;
        let chunks = chunker.chunk_all(&documents);
        if chunks.is_empty() {
            return Err(PipelineError::MissingData(
                "data produced no chunks to index".to_string(),
            ));
        }
        info!(
            "Chunked {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );

        let rows = self.embed_chunks(chunks).await?;
        let dimension = self.embedder.dimension();

        let client = LanceDbClient::new(self.config.index.clone()).await?;
        // An interrupted write must not leave the old manifest vouching for new tables.
        remove_manifest(&self.config.index.manifest_path)?;
        SchemaManager::new(&client).drop_all_tables().await?;

        let inserter = BatchInserter::new(&client);
        let doc_stats = inserter.insert_documents(&documents).await?;
        let chunk_stats = inserter.insert_chunks(&rows, dimension).await?;

        let manifest = IndexManifest {
            provider: self.embedder.name().to_string(),
            model: self.embedder.model().to_string(),
            dimension,
            chunk_size: chunker.max_chars(),
            chunk_overlap: chunker.overlap(),
            document_count: doc_stats.documents_inserted,
            chunk_count: chunk_stats.chunks_inserted,
            data_dir: self.config.data.dir.display().to_string(),
            built_at: Utc::now(),
        };
        manifest.save(&self.config.index.manifest_path)?;

        timer.finish_with_count(rows.len());

        Ok(BuildReport {
            rate_records: dataset.rates.len(),
            claim_records: dataset.claims.len(),
            filings: dataset.filings.len(),
            documents: documents.len(),
            chunks: rows.len(),
            dimension,
            batches: chunk_stats.batches,
            manifest,
        })
    }

    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<(Chunk, Vec<f32>)>> {
        let progress = if self.show_progress {
            ProgressTracker::new(chunks.len(), self.colored)
        } else {
            ProgressTracker::hidden()
        };
        progress.set_message(format!("embedding with {}", self.embedder.name()));

        let dimension = self.embedder.dimension();
        let mut rows = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.config.index.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = match self.embedder.embed_batch(&texts).await {
                Ok(embeddings) => embeddings,
                Err(e) => {
                    progress.abandon("embedding failed");
                    return Err(e);
                }
            };

            if embeddings.len() != batch.len() {
                progress.abandon("embedding failed");
                return Err(PipelineError::Embedding(format!(
                    "embedder returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                if embedding.len() != dimension {
                    progress.abandon("embedding failed");
                    return Err(PipelineError::Embedding(format!(
                        "chunk {} embedded to {} dimensions, expected {}",
                        chunk.id,
                        embedding.len(),
                        dimension
                    )));
                }
                rows.push((chunk.clone(), embedding));
            }

            progress.record_batch(batch.len());
        }

        progress.finish();
        let stats = progress.get_stats();
        info!(
            "Embedded {} chunks in {} batches ({:.1} chunks/sec)",
            stats.chunks_embedded,
            stats.batches,
            stats.chunks_per_second()
        );

        Ok(rows)
    }
}

/// Loads the persisted index for querying. The embedder must match the one
/// recorded in the manifest.
pub async fn load_index(config: &Config, embedder: &dyn Embedder) -> Result<(VectorIndex, IndexManifest)> {
    let manifest = IndexManifest::load(&config.index.manifest_path)?;
    manifest.ensure_compatible(embedder)?;

    let client = LanceDbClient::new(config.index.clone()).await?;
    if !SchemaManager::new(&client).verify_schema().await? {
        return Err(PipelineError::MissingData(format!(
            "index tables not found at {}; run `setup` first",
            client.uri()
        )));
    }

    let rows = client.load_chunks().await?;
    let index = VectorIndex::build(
        rows.into_iter()
            .map(|(_, chunk, embedding)| (chunk, embedding))
            .collect(),
    )?;

    if index.len() != manifest.chunk_count {
        warn!(
            "Manifest records {} chunks but the store holds {}",
            manifest.chunk_count,
            index.len()
        );
        return Err(PipelineError::MissingData(format!(
            "index holds {} chunks but its manifest records {}; run `build` again",
            index.len(),
            manifest.chunk_count
        )));
    }

    info!(
        "Loaded index with {} chunks ({} dimensions)",
        index.len(),
        manifest.dimension
    );
    Ok((index, manifest))
}

/// Drops both tables and removes the manifest.
pub async fn reset_index(config: &Config) -> Result<()> {
    let client = LanceDbClient::new(config.index.clone()).await?;
    SchemaManager::new(&client).drop_all_tables().await?;
    remove_manifest(&config.index.manifest_path)
}

fn remove_manifest(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|source| PipelineError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Removed {}", path.display());
    }
    Ok(())
}

pub fn generate_sample_data(config: &Config, reference_date: NaiveDate) -> Result<(Dataset, Vec<PathBuf>)> {
    let dataset = SampleDataGenerator::new(config.data.seed, reference_date)
        .generate(config.data.rate_records, config.data.claim_records);
    let written = SampleDataGenerator::save(&dataset, &config.data.dir)?;
    Ok((dataset, written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RATES_FILE;
    use crate::database::HashingEmbedder;
    use crate::models::Query;
    use tempfile::TempDir;

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default_config();
        config.data.dir = root.join("data");
        config.data.rate_records = 60;
        config.data.claim_records = 30;
        config.index.uri = root.join("lancedb").display().to_string();
        config.index.manifest_path = root.join("manifest.json");
        config.index.batch_size = 16;
        config.embedding.dimension = 64;
        config
    }

    fn reference_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[tokio::test]
    async fn test_build_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        generate_sample_data(&config, reference_date()).unwrap();

        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(64));
        let report = IndexBuilder::new(config.clone(), embedder.clone())
            .build()
            .await
            .unwrap();

        assert_eq!(report.rate_records, 60);
        assert_eq!(report.filings, 3);
        assert!(report.chunks >= report.documents);
        assert!(config.index.manifest_path.exists());

        let (index, manifest) = load_index(&config, embedder.as_ref()).await.unwrap();
        assert_eq!(index.len(), report.chunks);
        assert_eq!(manifest.chunk_count, report.chunks);
        assert_eq!(manifest.provider, "hashing");

        let query = embedder
            .embed(&Query::new("auto insurance in CA").text)
            .await
            .unwrap();
        let first = index.search(&query, 5).unwrap();
        let second = index.search(&query, 5).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_load_rejects_other_embedder() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        generate_sample_data(&config, reference_date()).unwrap();

        IndexBuilder::new(config.clone(), Arc::new(HashingEmbedder::new(64)))
            .build()
            .await
            .unwrap();

        let err = load_index(&config, &HashingEmbedder::new(32))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_malformed_input_keeps_existing_index() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        generate_sample_data(&config, reference_date()).unwrap();

        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(64));
        let report = IndexBuilder::new(config.clone(), embedder.clone())
            .build()
            .await
            .unwrap();

        let rates = config.data.dir.join(RATES_FILE);
        let mut content = fs::read_to_string(&rates).unwrap();
        content.push_str("Geico,CA,auto,Basic,oops,500,100000,18-25,1.1,2025-01-01\n");
        fs::write(&rates, content).unwrap();

        let err = IndexBuilder::new(config.clone(), embedder.clone())
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::DataFormat { .. }));

        let (index, manifest) = load_index(&config, embedder.as_ref()).await.unwrap();
        assert_eq!(index.len(), report.chunks);
        assert_eq!(manifest, report.manifest);
    }

    #[tokio::test]
    async fn test_load_rejects_partial_index() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        generate_sample_data(&config, reference_date()).unwrap();

        let embedder = HashingEmbedder::new(64);
        IndexBuilder::new(config.clone(), Arc::new(embedder.clone()))
            .build()
            .await
            .unwrap();

        let mut manifest = IndexManifest::load(&config.index.manifest_path).unwrap();
        manifest.chunk_count += 1;
        manifest.save(&config.index.manifest_path).unwrap();

        let err = load_index(&config, &embedder).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingData(_)));
    }

    #[tokio::test]
    async fn test_rebuild_yields_identical_chunks() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        generate_sample_data(&config, reference_date()).unwrap();

        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(64));
        let client = LanceDbClient::new(config.index.clone()).await.unwrap();

        IndexBuilder::new(config.clone(), embedder.clone())
            .build()
            .await
            .unwrap();
        let first = client.load_chunks().await.unwrap();

        IndexBuilder::new(config.clone(), embedder)
            .build()
            .await
            .unwrap();
        let second = client.load_chunks().await.unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_reset_removes_index() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        generate_sample_data(&config, reference_date()).unwrap();

        let embedder = HashingEmbedder::new(64);
        IndexBuilder::new(config.clone(), Arc::new(embedder.clone()))
            .build()
            .await
            .unwrap();

        reset_index(&config).await.unwrap();
        assert!(!config.index.manifest_path.exists());
        assert!(matches!(
            load_index(&config, &embedder).await,
            Err(PipelineError::MissingData(_))
        ));
    }

    #[test]
    fn test_summary_text() {
        let report = BuildReport {
            rate_records: 500,
            claim_records: 200,
            filings: 3,
            documents: 420,
            chunks: 431,
            dimension: 384,
            batches: 7,
            manifest: IndexManifest {
                provider: "hashing".to_string(),
                model: "fnv1a-bigram-v1".to_string(),
                dimension: 384,
                chunk_size: 512,
                chunk_overlap: 64,
                document_count: 420,
                chunk_count: 431,
                data_dir: "data".to_string(),
                built_at: Utc::now(),
            },
        };

        let text = report.summary_text();
        assert!(text.starts_with("Market Intelligence Agent Setup Summary\n"));
        assert!(text.contains("- Rate records: 500\n"));
        assert!(text.contains("- Vector store documents: 420\n"));
        assert!(text.ends_with("Agent ready for use!\n"));
    }
}
