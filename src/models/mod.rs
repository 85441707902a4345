// file: src/models/mod.rs
// description: data models for records, documents, chunks and answers
// reference: internal module structure

pub mod answer;
pub mod chunk;
pub mod document;
pub mod records;
pub mod search_result;

pub use answer::{ALL, Answer, Evidence, Query, SkillKind};
pub use chunk::Chunk;
pub use document::{Document, DocumentKind};
pub use records::{ClaimRecord, Dataset, RateRecord, RegulatoryFiling};
pub use search_result::SearchResult;
