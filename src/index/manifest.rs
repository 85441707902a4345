// file: src/index/manifest.rs
// description: record of how the persisted index was built
// reference: https://docs.rs/serde_json

use crate::database::Embedder;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub document_count: usize,
    pub chunk_count: usize,
    pub data_dir: String,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingData(format!(
                "index manifest {} not found; run `setup` first",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|source| PipelineError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Self = serde_json::from_str(&content).map_err(|e| {
            PipelineError::data_format(path.display().to_string(), e.to_string())
        })?;

        debug!("Loaded index manifest from {}", path.display());
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| PipelineError::FileOperation {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| PipelineError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Index manifest written to {}", path.display());
        Ok(())
    }

    /// Queries must be embedded exactly the way the chunks were.
    pub fn ensure_compatible(&self, embedder: &dyn Embedder) -> Result<()> {
        if self.provider != embedder.name()
            || self.model != embedder.model()
            || self.dimension != embedder.dimension()
        {
            return Err(PipelineError::Retrieval(format!(
                "index was built with {}/{} ({} dimensions) but the configured embedder is {}/{} ({} dimensions); rebuild the index",
                self.provider,
                self.model,
                self.dimension,
                embedder.name(),
                embedder.model(),
                embedder.dimension()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::HashingEmbedder;
    use crate::database::embeddings::HASHING_MODEL;
    use tempfile::TempDir;

    fn manifest(dimension: usize) -> IndexManifest {
        IndexManifest {
            provider: "hashing".to_string(),
            model: HASHING_MODEL.to_string(),
            dimension,
            chunk_size: 512,
            chunk_overlap: 64,
            document_count: 12,
            chunk_count: 14,
            data_dir: "data".to_string(),
            built_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store").join("manifest.json");

        let written = manifest(384);
        written.save(&path).unwrap();
        assert_eq!(IndexManifest::load(&path).unwrap(), written);
    }

    #[test]
    fn test_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let result = IndexManifest::load(&temp.path().join("manifest.json"));
        assert!(matches!(result, Err(PipelineError::MissingData(_))));
    }

    #[test]
    fn test_compatibility_check() {
        assert!(manifest(384).ensure_compatible(&HashingEmbedder::new(384)).is_ok());

        let err = manifest(384)
            .ensure_compatible(&HashingEmbedder::new(128))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Retrieval(_)));
    }
}
