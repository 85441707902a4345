// file: src/parser/mod.rs
// description: text normalization, chunking and answer rendering exports
// reference: internal module structure

pub mod chunker;
pub mod markdown;
pub mod normalizer;

pub use chunker::Chunker;
pub use markdown::MarkdownRenderer;
pub use normalizer::TextNormalizer;
