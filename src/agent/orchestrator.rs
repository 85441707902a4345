// file: src/agent/orchestrator.rs
// description: answers market questions by retrieving evidence and summarizing it
// reference: retrieval-augmented generation over the in-memory index

use crate::agent::skills::{render_prompt, select_skill};
use crate::config::RetrievalConfig;
use crate::database::Embedder;
use crate::error::{PipelineError, Result};
use crate::index::VectorIndex;
use crate::llm::SummarizationClient;
use crate::models::{Answer, Evidence, Query, SearchResult};
use crate::utils::OperationTimer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const ANSWER_CONFIDENCE: f32 = 0.9;

const SLOW_ANSWER: Duration = Duration::from_secs(30);

/// Ranked chunks for a query after the context filters ran.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub results: Vec<SearchResult>,
    pub filters_relaxed: bool,
}

#[derive(Clone)]
pub struct MarketIntelligenceAgent {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    llm: Arc<dyn SummarizationClient>,
    retrieval: RetrievalConfig,
}

impl MarketIntelligenceAgent {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        llm: Arc<dyn SummarizationClient>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            retrieval,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Embeds the query, takes the top `search_k` chunks and applies the
    /// context filters. When the filters remove everything the unfiltered
    /// ranking is returned instead.
    pub async fn retrieve(&self, query: &Query) -> Result<Retrieval> {
        if self.index.is_empty() {
            return Err(PipelineError::Retrieval(
                "the index contains no chunks; run `setup` first".to_string(),
            ));
        }

        let embedding = self
            .embedder
            .embed(query.text.trim())
            .await
            .map_err(|e| PipelineError::Retrieval(format!("failed to embed query: {}", e)))?;

        let results = self.index.search(&embedding, self.retrieval.search_k)?;
        debug!("Index returned {} candidates", results.len());

        let insurance_type = query.insurance_type_filter();
        let region = query.region_filter();
        if insurance_type.is_none() && region.is_none() {
            return Ok(Retrieval {
                results,
                filters_relaxed: false,
            });
        }

        let filtered: Vec<SearchResult> = results
            .iter()
            .filter(|r| insurance_type.is_none_or(|t| r.chunk.matches_line(t)))
            .filter(|r| region.is_none_or(|s| r.chunk.matches_region(s)))
            .cloned()
            .collect();

        if filtered.is_empty() {
            warn!(
                "No results match insurance_type={:?} region={:?}; using unfiltered results",
                insurance_type, region
            );
            return Ok(Retrieval {
                results,
                filters_relaxed: true,
            });
        }

        Ok(Retrieval {
            results: rerank(filtered),
            filters_relaxed: false,
        })
    }

    pub async fn answer(&self, query: &Query) -> Result<Answer> {
        if query.text.trim().is_empty() {
            return Err(PipelineError::Validation(
                "query text must not be empty".to_string(),
            ));
        }

        let timer = OperationTimer::new("answer query");
        let retrieval = self.retrieve(query).await?;

        let evidence: Vec<Evidence> = retrieval
            .results
            .iter()
            .take(self.retrieval.context_k)
            .map(Evidence::from)
            .collect();
        let data = evidence
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let skill = select_skill(&query.text);
        info!("Processing query with skill: {}", skill);

        let prompt = render_prompt(skill, query, &data);
        let text = self.llm.generate(&prompt).await.map_err(|e| match e {
            PipelineError::Generation(_) => e,
            other => PipelineError::Generation(other.to_string()),
        })?;

        timer.warn_if_slow(SLOW_ANSWER);
        timer.finish();

        Ok(Answer {
            id: Uuid::new_v4().to_string(),
            query: query.text.trim().to_string(),
            skill,
            text,
            confidence: ANSWER_CONFIDENCE,
            evidence,
            filters_relaxed: retrieval.filters_relaxed,
        })
    }
}

fn rerank(results: Vec<SearchResult>) -> Vec<SearchResult> {
    results
        .into_iter()
        .enumerate()
        .map(|(idx, result)| SearchResult {
            rank: idx + 1,
            ..result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Chunk, Document, DocumentKind, SkillKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Embeds by keyword presence so tests control the ranking.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(vec![
                if lower.contains("auto") { 1.0 } else { 0.0 },
                if lower.contains("home") { 1.0 } else { 0.0 },
                0.1,
            ])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "keyword"
        }

        fn model(&self) -> &str {
            "keyword"
        }
    }

    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingLlm {
        fn new(fail: bool) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl SummarizationClient for RecordingLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                Err(PipelineError::Generation("quota exceeded".to_string()))
            } else {
                Ok("Geico is the cheapest auto insurer in CA.".to_string())
            }
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    fn chunk(key: &str, state: &str, line: &str, text: &str) -> Chunk {
        let doc = Document::new(
            DocumentKind::RateSummary,
            key,
            state.to_string(),
            Some(line.to_string()),
            None,
            "sample_rates.csv".to_string(),
            text.to_string(),
        );
        Chunk::from_document(&doc, 0, text.to_string())
    }

    fn agent_with(entries: Vec<(Chunk, Vec<f32>)>, llm: Arc<RecordingLlm>) -> MarketIntelligenceAgent {
        let index = VectorIndex::build(entries).unwrap();
        MarketIntelligenceAgent::new(
            Arc::new(KeywordEmbedder),
            Arc::new(index),
            llm,
            Config::default_config().retrieval,
        )
    }

    fn sample_entries() -> Vec<(Chunk, Vec<f32>)> {
        vec![
            (chunk("a", "CA", "auto", "Geico auto CA"), vec![1.0, 0.0, 0.1]),
            (chunk("b", "TX", "auto", "USAA auto TX"), vec![0.9, 0.0, 0.1]),
            (chunk("c", "TX", "home", "Allstate home TX"), vec![0.0, 1.0, 0.1]),
        ]
    }

    #[tokio::test]
    async fn test_answer_uses_benchmark_skill_and_evidence() {
        let llm = Arc::new(RecordingLlm::new(false));
        let agent = agent_with(sample_entries(), llm.clone());

        let query = Query::new("Compare auto insurance rates").with_region("CA");
        let answer = agent.answer(&query).await.unwrap();

        assert_eq!(answer.skill, SkillKind::BenchmarkRates);
        assert_eq!(answer.confidence, ANSWER_CONFIDENCE);
        assert_eq!(answer.evidence.len(), 1);
        assert_eq!(answer.evidence[0].text, "Geico auto CA");
        assert_eq!(answer.evidence[0].rank, 1);
        assert!(!answer.filters_relaxed);

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Region: CA"));
        assert!(prompts[0].contains("Geico auto CA"));
    }

    #[tokio::test]
    async fn test_filters_fall_back_when_nothing_matches() {
        let llm = Arc::new(RecordingLlm::new(false));
        let agent = agent_with(sample_entries(), llm);

        let query = Query::new("auto").with_region("NY");
        let retrieval = agent.retrieve(&query).await.unwrap();

        assert!(retrieval.filters_relaxed);
        assert_eq!(retrieval.results.len(), 3);
        assert_eq!(retrieval.results[0].chunk.text, "Geico auto CA");
    }

    #[tokio::test]
    async fn test_all_filter_is_ignored() {
        let llm = Arc::new(RecordingLlm::new(false));
        let agent = agent_with(sample_entries(), llm);

        let query = Query::new("home").with_insurance_type("all").with_region("ALL");
        let retrieval = agent.retrieve(&query).await.unwrap();
        assert!(!retrieval.filters_relaxed);
        assert_eq!(retrieval.results[0].chunk.text, "Allstate home TX");
    }

    #[tokio::test]
    async fn test_context_k_limits_evidence() {
        let llm = Arc::new(RecordingLlm::new(false));
        let entries: Vec<(Chunk, Vec<f32>)> = (0..8)
            .map(|i| {
                (
                    chunk(&format!("k{i}"), "CA", "auto", &format!("auto chunk {i}")),
                    vec![1.0, 0.0, 0.1],
                )
            })
            .collect();
        let agent = agent_with(entries, llm);

        let answer = agent.answer(&Query::new("auto outlook")).await.unwrap();
        assert_eq!(answer.evidence.len(), 5);
        let texts: Vec<&str> = answer.evidence.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["auto chunk 0", "auto chunk 1", "auto chunk 2", "auto chunk 3", "auto chunk 4"]
        );
        assert_eq!(answer.skill, SkillKind::GenerateRecommendations);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let agent = agent_with(sample_entries(), Arc::new(RecordingLlm::new(false)));
        let err = agent.answer(&Query::new("   ")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_index_is_retrieval_error() {
        let agent = agent_with(Vec::new(), Arc::new(RecordingLlm::new(false)));
        let err = agent.answer(&Query::new("rates")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces() {
        let agent = agent_with(sample_entries(), Arc::new(RecordingLlm::new(true)));
        let err = agent.answer(&Query::new("claims trend")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
