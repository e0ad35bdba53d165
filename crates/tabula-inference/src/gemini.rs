//! Gemini answer backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use tabula_core::{AnswerBackend, ChatTurn, Error, Result};

use crate::config::GeminiConfig;
use crate::prompt::{build_prompt, PromptConfig};

/// Gemini answer backend using the `generateContent` REST API.
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
    prompt: PromptConfig,
}

impl GeminiBackend {
    /// Create a new Gemini backend from configuration.
    pub fn new(config: GeminiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(tabula_core::defaults::GEN_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "inference",
            model = %config.model,
            "Initializing Gemini backend"
        );

        Self {
            client,
            config,
            prompt: PromptConfig::default(),
        }
    }

    /// Create from environment variables. Returns `None` when
    /// `GEMINI_API_KEY` is unset.
    pub fn from_env() -> Option<Self> {
        GeminiConfig::from_env().map(Self::new)
    }

    /// Replace the prompt configuration.
    pub fn with_prompt_config(mut self, prompt: PromptConfig) -> Self {
        self.prompt = prompt;
        self
    }
}

#[async_trait]
impl AnswerBackend for GeminiBackend {
    async fn answer(&self, question: &str, context: &str, history: &[ChatTurn]) -> Result<String> {
        let start = Instant::now();
        let prompt = build_prompt(&self.prompt, question, context, history);

        debug!(
            subsystem = "inference",
            model = %self.config.model,
            prompt_len = prompt.len(),
            history_len = history.len(),
            "Requesting Gemini answer"
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse Gemini response: {}", e)))?;

        let text = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::Inference("Gemini returned no candidates".to_string()))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            subsystem = "inference",
            model = %self.config.model,
            response_len = text.len(),
            duration_ms = elapsed,
            "Gemini answer complete"
        );
        if elapsed > 30_000 {
            warn!(
                subsystem = "inference",
                model = %self.config.model,
                duration_ms = elapsed,
                slow = true,
                "Slow Gemini generation"
            );
        }

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> GeminiBackend {
        let mut config = GeminiConfig::new("test-key");
        config.base_url = server.uri();
        GeminiBackend::new(config)
    }

    #[tokio::test]
    async fn test_answer_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_string_contains("What is the topic?"))
            .and(body_string_contains("Topic is astronomy."))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [
                    {"content": {"parts": [{"text": "The topic is astronomy."}]}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let answer = backend
            .answer("What is the topic?", "Topic is astronomy.", &[])
            .await
            .unwrap();
        assert_eq!(answer, "The topic is astronomy.");
    }

    #[tokio::test]
    async fn test_answer_http_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend.answer("Q", "C", &[]).await.unwrap_err();
        match err {
            Error::Inference(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("rate limited"));
            }
            other => panic!("Expected Inference error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_answer_empty_candidates_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend.answer("Q", "C", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Inference(msg) if msg.contains("no candidates")));
    }

    #[tokio::test]
    async fn test_prompt_includes_history_before_question() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Conversation so far"))
            .and(body_string_contains("user: Earlier question"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [
                    {"content": {"parts": [{"text": "ok"}]}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let history = vec![ChatTurn::user(uuid::Uuid::now_v7(), "Earlier question")];
        backend.answer("Q", "C", &history).await.unwrap();
    }

    #[test]
    fn test_model_name_reports_configured_model() {
        let config = GeminiConfig::new("k");
        let backend = GeminiBackend::new(config);
        assert_eq!(backend.model_name(), "gemini-2.5-flash");
    }
}
