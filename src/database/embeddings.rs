// file: src/database/embeddings.rs
// description: text embedders for chunks and queries (local hashing and Gemini API)
// reference: https://ai.google.dev/api/embeddings

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub const HASHING_MODEL: &str = "fnv1a-bigram-v1";

const FNV_OFFSET: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;
const BIGRAM_WEIGHT: f32 = 0.5;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;

    /// Provider name recorded in the index manifest.
    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Hashing => {
            info!("Using local hashing embedder ({} dimensions)", config.dimension);
            Ok(Arc::new(HashingEmbedder::new(config.dimension)))
        }
        EmbeddingProvider::Gemini => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                PipelineError::Config(
                    "embedding.provider is gemini but no API key is configured (set GOOGLE_API_KEY)"
                        .to_string(),
                )
            })?;
            info!(
                "Using Gemini embeddings: {} ({} dimensions)",
                config.model, config.dimension
            );
            Ok(Arc::new(
                GeminiEmbeddingClient::new(api_key, config.model.clone(), config.dimension)
                    .with_base_url(config.base_url.clone()),
            ))
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Feature-hashing embedder over lowercased word tokens and adjacent word
/// pairs. Output is L2-normalized; text without tokens maps to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_to_vec(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return vec;
        }

        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        for token in &tokens {
            self.accumulate(&mut vec, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vec, bigram.as_bytes(), BIGRAM_WEIGHT);
        }

        let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vec {
                *value /= norm;
            }
        }
        vec
    }

    // Top bit of the hash picks the sign.
    fn accumulate(&self, vec: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let idx = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
        vec[idx] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.hash_to_vec(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.hash_to_vec(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        HASHING_MODEL
    }
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct BatchEmbedContentsRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: String,
}

pub struct GeminiEmbeddingClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl GeminiEmbeddingClient {
    pub fn new(api_key: String, model: String, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key,
            model,
            dimension,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn model_name(&self) -> &str {
        self.model.strip_prefix("models/").unwrap_or(&self.model)
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model_name(),
            method
        )
    }

    fn request_for(&self, text: &str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: format!("models/{}", self.model_name()),
            content: Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
            output_dimensionality: self.dimension,
        }
    }

    fn check_dimension(&self, values: &[f32]) -> Result<()> {
        if values.len() != self.dimension {
            return Err(PipelineError::Embedding(format!(
                "expected embedding dimension {}, got {}",
                self.dimension,
                values.len()
            )));
        }
        Ok(())
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .client
            .post(self.url(method))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                PipelineError::Embedding(format!("Failed to send Gemini embedding request: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));
            return Err(PipelineError::Embedding(format!(
                "Gemini embedding request failed with status {}: {}",
                status, message
            )));
        }

        response.json::<R>().await.map_err(|e| {
            PipelineError::Embedding(format!("Failed to parse Gemini embedding response: {}", e))
        })
    }
}

#[async_trait]
impl Embedder for GeminiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Requesting embedding from Gemini for {} chars", text.len());

        let response: EmbedContentResponse =
            self.post("embedContent", &self.request_for(text)).await?;
        self.check_dimension(&response.embedding.values)?;
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = BatchEmbedContentsRequest {
            requests: texts.iter().map(|text| self.request_for(text)).collect(),
        };
        let response: BatchEmbedContentsResponse =
            self.post("batchEmbedContents", &request).await?;

        if response.embeddings.len() != texts.len() {
            return Err(PipelineError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        let mut output = Vec::with_capacity(texts.len());
        for embedding in response.embeddings {
            self.check_dimension(&embedding.values)?;
            output.push(embedding.values);
        }

        debug!("Received {} embeddings from Gemini", output.len());
        Ok(output)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        self.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_hashing_embedding_is_deterministic() {
        let embedder = HashingEmbedder::new(128);
        let first = embedder.embed("Compare auto insurance rates").await.unwrap();
        let second = embedder.embed("Compare auto insurance rates").await.unwrap();

        assert_eq!(first.len(), 128);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_hashing_embedding_is_normalized() {
        let embedder = HashingEmbedder::new(64);
        let vec = embedder.embed("Geico offers auto insurance in CA").await.unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let empty = embedder.embed("  ,, ").await.unwrap();
        assert!(empty.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_hashing_embedding_is_case_insensitive() {
        let embedder = HashingEmbedder::new(256);
        let lower = embedder.embed("auto insurance").await.unwrap();
        let upper = embedder.embed("AUTO Insurance").await.unwrap();
        assert_eq!(lower, upper);
    }

    #[tokio::test]
    async fn test_hashing_similar_texts_score_higher() {
        let embedder = HashingEmbedder::new(384);
        let query = embedder.embed("auto insurance rates in CA").await.unwrap();
        let close = embedder
            .embed("Geico offers auto insurance in CA with average monthly rate")
            .await
            .unwrap();
        let far = embedder
            .embed("Updated hurricane coverage requirements for coastal properties")
            .await
            .unwrap();

        assert!(cosine(&query, &close) > cosine(&query, &far));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashingEmbedder::new(32);
        let texts = vec!["home".to_string(), "life insurance".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[1], embedder.embed("life insurance").await.unwrap());
    }

    #[test]
    fn test_build_embedder_requires_key_for_gemini() {
        let mut config = crate::config::Config::default_config().embedding;
        config.provider = EmbeddingProvider::Gemini;
        config.api_key = None;
        assert!(matches!(build_embedder(&config), Err(PipelineError::Config(_))));

        config.provider = EmbeddingProvider::Hashing;
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.name(), "hashing");
        assert_eq!(embedder.dimension(), 384);
    }

    #[tokio::test]
    async fn test_gemini_single_embedding() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/text-embedding-004:embedContent")
                .query_param("key", "test-key");
            then.status(200)
                .json_body(json!({ "embedding": { "values": [0.1, 0.2, 0.3] } }));
        });

        let client = GeminiEmbeddingClient::new(
            "test-key".to_string(),
            "models/text-embedding-004".to_string(),
            3,
        )
        .with_base_url(server.url(""));

        let out = client.embed("hello").await.unwrap();
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
        assert_eq!(client.model(), "text-embedding-004");
        mock.assert();
    }

    #[tokio::test]
    async fn test_gemini_requests_configured_dimension() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/text-embedding-004:embedContent")
                .json_body_partial(r#"{ "outputDimensionality": 4 }"#);
            then.status(200)
                .json_body(json!({ "embedding": { "values": [0.1, 0.2, 0.3, 0.4] } }));
        });

        let client = GeminiEmbeddingClient::new(
            "test-key".to_string(),
            "text-embedding-004".to_string(),
            4,
        )
        .with_base_url(server.url(""));

        let out = client.embed("hello").await.unwrap();
        assert_eq!(out.len(), 4);
        mock.assert();
    }

    #[tokio::test]
    async fn test_gemini_batch_embedding() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/text-embedding-004:batchEmbedContents")
                .query_param("key", "test-key");
            then.status(200).json_body(json!({
                "embeddings": [
                    { "values": [0.1, 0.2] },
                    { "values": [0.3, 0.4] }
                ]
            }));
        });

        let client = GeminiEmbeddingClient::new(
            "test-key".to_string(),
            "text-embedding-004".to_string(),
            2,
        )
        .with_base_url(server.url(""));

        let out = client
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(out, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn test_gemini_dimension_mismatch() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/text-embedding-004:embedContent");
            then.status(200)
                .json_body(json!({ "embedding": { "values": [0.1] } }));
        });

        let client = GeminiEmbeddingClient::new(
            "test-key".to_string(),
            "text-embedding-004".to_string(),
            3,
        )
        .with_base_url(server.url(""));

        let err = client.embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("expected embedding dimension 3"));
    }

    #[tokio::test]
    async fn test_gemini_error_message_surfaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/text-embedding-004:embedContent");
            then.status(400)
                .json_body(json!({ "error": { "message": "API key not valid" } }));
        });

        let client = GeminiEmbeddingClient::new(
            "bad-key".to_string(),
            "text-embedding-004".to_string(),
            3,
        )
        .with_base_url(server.url(""));

        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, PipelineError::Embedding(_)));
        assert!(err.to_string().contains("API key not valid"));
    }
}
