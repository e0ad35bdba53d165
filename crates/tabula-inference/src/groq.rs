//! Groq answer backend implementation.
//!
//! Speaks the OpenAI-compatible `chat/completions` API, so any
//! endpoint with that shape can stand in via `base_url`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use tabula_core::{AnswerBackend, ChatTurn, Error, Result};

use crate::config::GroqConfig;
use crate::prompt::{build_prompt, PromptConfig};

/// Groq answer backend using the `chat/completions` REST API.
pub struct GroqBackend {
    client: Client,
    config: GroqConfig,
    prompt: PromptConfig,
}

impl GroqBackend {
    /// Create a new Groq backend from configuration.
    pub fn new(config: GroqConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(tabula_core::defaults::GEN_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "inference",
            model = %config.model,
            "Initializing Groq backend"
        );

        Self {
            client,
            config,
            prompt: PromptConfig::default(),
        }
    }

    /// Create from environment variables. Returns `None` when
    /// `GROQ_API_KEY` is unset.
    pub fn from_env() -> Option<Self> {
        GroqConfig::from_env().map(Self::new)
    }

    /// Replace the prompt configuration.
    pub fn with_prompt_config(mut self, prompt: PromptConfig) -> Self {
        self.prompt = prompt;
        self
    }
}

#[async_trait]
impl AnswerBackend for GroqBackend {
    async fn answer(&self, question: &str, context: &str, history: &[ChatTurn]) -> Result<String> {
        let start = Instant::now();
        let prompt = build_prompt(&self.prompt, question, context, history);

        debug!(
            subsystem = "inference",
            model = %self.config.model,
            prompt_len = prompt.len(),
            history_len = history.len(),
            "Requesting Groq answer"
        );

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Groq request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Groq returned {}: {}",
                status, body
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse Groq response: {}", e)))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Inference("Groq returned no choices".to_string()))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            subsystem = "inference",
            model = %self.config.model,
            response_len = text.len(),
            duration_ms = elapsed,
            "Groq answer complete"
        );
        if elapsed > 30_000 {
            warn!(
                subsystem = "inference",
                model = %self.config.model,
                duration_ms = elapsed,
                slow = true,
                "Slow Groq generation"
            );
        }

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
