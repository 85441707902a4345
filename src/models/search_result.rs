// file: src/models/search_result.rs
// description: Search result model with similarity scores
// reference: Used for vector similarity search results

use crate::models::chunk::Chunk;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,

    /// Cosine similarity (higher is more similar, -1.0 to 1.0)
    pub score: f32,

    /// 1-based position in the ranked result list
    pub rank: usize,
}

impl SearchResult {
    pub fn new(chunk: Chunk, score: f32, rank: usize) -> Self {
        Self { chunk, score, rank }
    }

    /// Shortened chunk text for terminal output, cut on a char boundary.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.chunk.text.chars();
        let preview: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", preview)
        } else {
            preview
        }
    }
}
