// file: src/parser/chunker.rs
// description: splits documents into bounded, overlapping chunks
// reference: character window splitting with whitespace-aware boundaries

use crate::error::{PipelineError, Result};
use crate::models::{Chunk, Document};
use crate::parser::normalizer::TextNormalizer;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_chars: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(PipelineError::Config(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        if overlap >= max_chars {
            return Err(PipelineError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, max_chars
            )));
        }
        Ok(Self { max_chars, overlap })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self
            .split(&document.text)
            .into_iter()
            .enumerate()
            .map(|(position, text)| Chunk::from_document(document, position as u32, text))
            .collect();

        debug!("Document {} split into {} chunks", document.id, chunks.len());
        chunks
    }

    pub fn chunk_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.chunk(doc)).collect()
    }

    /// Every piece holds at most `max_chars` characters. A window ends on the
    /// last whitespace inside it when one exists past the overlap region,
    /// otherwise it is cut hard.
    pub fn split(&self, text: &str) -> Vec<String> {
        let normalized = TextNormalizer::new().normalize(text);
        let chars: Vec<char> = normalized.chars().collect();
        let len = chars.len();

        let mut pieces = Vec::new();
        let mut start = 0usize;

        while start < len {
            let hard_end = usize::min(start + self.max_chars, len);
            let mut end = hard_end;

            if hard_end < len
                && let Some(ws) = (start + self.overlap + 1..=hard_end)
                    .rev()
                    .find(|&idx| chars[idx].is_whitespace())
            {
                end = ws;
            }

            let piece: String = chars[start..end].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                pieces.push(piece.to_string());
            }

            if end >= len {
                break;
            }

            start = self.next_start(&chars, start, end);
        }

        pieces
    }

    // Steps back by `overlap`, then forward to the next word start so an
    // overlapping chunk never opens mid-word.
    fn next_start(&self, chars: &[char], start: usize, end: usize) -> usize {
        let mut next = end.saturating_sub(self.overlap).max(start + 1);

        while next < end && !chars[next - 1].is_whitespace() {
            next += 1;
        }
        while next < chars.len() && chars[next].is_whitespace() {
            next += 1;
        }

        next
    }
}
