// file: src/index/vector_index.rs
// description: exact in-memory cosine similarity index over embedded chunks
// reference: flat inner-product search over L2-normalized vectors

use crate::error::{PipelineError, Result};
use crate::models::{Chunk, SearchResult};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    dimension: Option<usize>,
}

impl VectorIndex {
    /// Builds the index in the given order. Vectors are normalized on the way
    /// in so inner product equals cosine similarity.
    pub fn build(entries: Vec<(Chunk, Vec<f32>)>) -> Result<Self> {
        let mut index = Self::default();

        for (chunk, vector) in entries {
            match index.dimension {
                Some(expected) if expected != vector.len() => {
                    return Err(PipelineError::Retrieval(format!(
                        "chunk {} has embedding dimension {}, index dimension is {}",
                        chunk.id,
                        vector.len(),
                        expected
                    )));
                }
                None if vector.is_empty() => {
                    return Err(PipelineError::Retrieval(format!(
                        "chunk {} has an empty embedding",
                        chunk.id
                    )));
                }
                None => index.dimension = Some(vector.len()),
                _ => {}
            }

            index.chunks.push(chunk);
            index.vectors.push(normalize(vector));
        }

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Top `k` chunks by cosine similarity, highest first. Equal scores keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if let Some(expected) = self.dimension
            && expected != query.len()
        {
            return Err(PipelineError::Retrieval(format!(
                "query embedding dimension {} does not match index dimension {}",
                query.len(),
                expected
            )));
        }

        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query = normalize(query.to_vec());
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, vector)| {
                let score: f32 = vector.iter().zip(&query).map(|(a, b)| a * b).sum();
                (idx, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (idx, score))| SearchResult::new(self.chunks[idx].clone(), score, rank + 1))
            .collect())
    }

    /// Distinct jurisdictions present in the index, sorted.
    pub fn jurisdictions(&self) -> Vec<String> {
        self.chunks
            .iter()
            .map(|c| c.jurisdiction.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn lines_of_business(&self) -> Vec<String> {
        self.chunks
            .iter()
            .filter_map(|c| c.line_of_business.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}
