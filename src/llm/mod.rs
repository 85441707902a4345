// file: src/llm/mod.rs
// description: summarization client abstraction and the Gemini implementation
// reference: internal module structure

pub mod gemini;

pub use gemini::{GeminiClient, GenerationConfig};

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Single-shot completion of `prompt`; no retries.
    async fn generate(&self, prompt: &str) -> Result<String>;

    fn model(&self) -> &str;
}
