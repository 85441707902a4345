// file: src/models/answer.rs
// description: query and answer models exchanged between the ui and the agent
// reference: internal data structures

use crate::models::search_result::SearchResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filter value that disables a context filter.
pub const ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default)]
    pub insurance_type: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            insurance_type: None,
            region: None,
        }
    }

    pub fn with_insurance_type(mut self, insurance_type: impl Into<String>) -> Self {
        self.insurance_type = Some(insurance_type.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn insurance_type_filter(&self) -> Option<&str> {
        active_filter(self.insurance_type.as_deref())
    }

    pub fn region_filter(&self) -> Option<&str> {
        active_filter(self.region.as_deref())
    }
}

fn active_filter(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    BenchmarkRates,
    AnalyzeTrends,
    GenerateRecommendations,
}

impl SkillKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BenchmarkRates => "benchmark_rates",
            Self::AnalyzeTrends => "analyze_trends",
            Self::GenerateRecommendations => "generate_recommendations",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::BenchmarkRates => "Benchmark Rates",
            Self::AnalyzeTrends => "Analyze Trends",
            Self::GenerateRecommendations => "Generate Recommendations",
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub chunk_id: String,
    pub document_id: String,
    pub score: f32,
    pub rank: usize,
    pub text: String,
}

impl From<&SearchResult> for Evidence {
    fn from(result: &SearchResult) -> Self {
        Self {
            chunk_id: result.chunk.id.clone(),
            document_id: result.chunk.document_id.clone(),
            score: result.score,
            rank: result.rank,
            text: result.chunk.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: String,
    pub query: String,
    pub skill: SkillKind,
    pub text: String,
    pub confidence: f32,
    pub evidence: Vec<Evidence>,
    /// True when the context filters matched nothing and unfiltered
    /// results were used instead.
    pub filters_relaxed: bool,
}
