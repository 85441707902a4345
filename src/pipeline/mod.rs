// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod builder;
mod progress;

pub use builder::{BuildReport, IndexBuilder, generate_sample_data, load_index, reset_index};
pub use progress::{EmbeddingStats, ProgressTracker};
