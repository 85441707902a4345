// file: src/agent/mod.rs
// description: market intelligence agent and analysis skills
// reference: internal module structure

pub mod orchestrator;
pub mod skills;

pub use orchestrator::{ANSWER_CONFIDENCE, MarketIntelligenceAgent, Retrieval};
pub use skills::{render_prompt, select_skill};
