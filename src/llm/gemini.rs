// file: src/llm/gemini.rs
// description: Gemini generateContent client used to summarize retrieved evidence
// reference: https://ai.google.dev/api/generate-content

use crate::config::LlmConfig;
use crate::error::{PipelineError, Result};
use crate::llm::SummarizationClient;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const BLOCK_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: String,
}

fn is_blocked_finish_reason(reason: &str) -> bool {
    matches!(reason, "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    generation_config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: api_key.into(),
            model: model.into(),
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_p: 0.8,
                top_k: 40,
                max_output_tokens: 2048,
            },
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PipelineError::Config("GOOGLE_API_KEY not found in environment variables".to_string())
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!("Gemini client initialized with model {}", config.model);

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            generation_config: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
            },
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation_config
    }

    fn model_name(&self) -> &str {
        self.model.strip_prefix("models/").unwrap_or(&self.model)
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model_name()
        )
    }

    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: self.generation_config.clone(),
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: BLOCK_THRESHOLD,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl SummarizationClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting generation from {} for {} chars of prompt",
            self.model_name(),
            prompt.len()
        );

        let response = self
            .http
            .post(self.generate_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| PipelineError::Generation(format!("Failed to reach Gemini: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));
            return Err(PipelineError::Generation(format!(
                "Gemini request failed with status {}: {}",
                status, message
            )));
        }

        let response = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| PipelineError::Generation(format!("Invalid Gemini response: {}", e)))?;

        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(PipelineError::Generation(format!(
                "Prompt blocked: {}",
                reason
            )));
        }

        let candidate = response
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .ok_or_else(|| PipelineError::Generation("No candidates in response".to_string()))?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "UNKNOWN".to_string());
            return Err(PipelineError::Generation(if is_blocked_finish_reason(&reason) {
                format!("Generation blocked: {}", reason)
            } else {
                format!("Empty response from model (finish reason {})", reason)
            }));
        }

        debug!("Received {} chars from Gemini", text.len());
        Ok(text)
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

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key", "gemini-1.5-flash").with_base_url(server.url(""))
    }

    #[tokio::test]
    async fn test_generate_maps_text_response() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent")
                .query_param("key", "test-key")
                .json_body(json!({
                    "contents": [
                        { "role": "user", "parts": [{ "text": "Summarize CA auto rates" }] }
                    ],
                    "generationConfig": {
                        "temperature": 0.7,
                        "topP": 0.8,
                        "topK": 40,
                        "maxOutputTokens": 2048
                    },
                    "safetySettings": [
                        { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                        { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                        { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                        { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" }
                    ]
                }));
            then.status(200).json_body(json!({
                "candidates": [
                    {
                        "content": { "parts": [{ "text": "Geico is " }, { "text": "cheapest." }] },
                        "finishReason": "STOP"
                    }
                ]
            }));
        });

        let text = client(&server).generate("Summarize CA auto rates").await.unwrap();
        assert_eq!(text, "Geico is cheapest.");
        mock.assert();
    }

    #[tokio::test]
    async fn test_http_error_is_generation_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent");
            then.status(403)
                .json_body(json!({ "error": { "message": "API key not valid" } }));
        });

        let err = client(&server).generate("hi").await.unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_blocked_candidate() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent");
            then.status(200).json_body(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            }));
        });

        let err = client(&server).generate("hi").await.unwrap_err();
        assert!(err.to_string().contains("Generation blocked: SAFETY"));
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent");
            then.status(200).json_body(json!({
                "promptFeedback": { "blockReason": "OTHER" }
            }));
        });

        let err = client(&server).generate("hi").await.unwrap_err();
        assert!(err.to_string().contains("Prompt blocked: OTHER"));
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent");
            then.status(200).json_body(json!({ "candidates": [] }));
        });

        let err = client(&server).generate("hi").await.unwrap_err();
        assert!(err.to_string().contains("No candidates"));
    }

    #[test]
    fn test_from_config_requires_key() {
        let mut config = crate::config::Config::default_config().llm;
        config.api_key = None;
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(PipelineError::Config(_))
        ));

        config.api_key = Some("key".to_string());
        config.model = "models/gemini-1.5-pro".to_string();
        let client = GeminiClient::from_config(&config).unwrap();
        assert_eq!(client.model(), "gemini-1.5-pro");
        assert_eq!(client.generation_config().top_k, 40);
    }
}
