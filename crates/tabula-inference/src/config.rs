//! Answer backend configuration.
//!
//! Providers are configured from environment variables; a provider whose
//! API key is absent is simply not constructed, so deployments choose
//! their fallback chain by which keys they set.
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | `GEMINI_API_KEY` | unset | Enables the Gemini provider |
//! | `GEMINI_BASE_URL` | Google API endpoint | Override for proxies and tests |
//! | `GEMINI_MODEL` | `gemini-2.5-flash` | Generation model |
//! | `GROQ_API_KEY` | unset | Enables the Groq provider |
//! | `GROQ_BASE_URL` | Groq API endpoint | Any OpenAI-compatible endpoint works |
//! | `GROQ_MODEL` | `openai/gpt-oss-20b` | Generation model |
//! | `TABULA_ANSWER_TIMEOUT_SECS` | unset | Per-provider timeout in the fallback chain |

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn validate_base_url(label: &str, base_url: &str) -> ConfigResult<()> {
    if base_url.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} base_url cannot be empty",
            label
        )));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{} base_url must start with http:// or https://, got: {}",
            label, base_url
        )));
    }
    Ok(())
}

/// Gemini backend configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL for the Gemini API.
    pub base_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model to use for answer generation.
    pub model: String,
}

impl GeminiConfig {
    /// Build a config for the given API key with default endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: tabula_core::defaults::GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: tabula_core::defaults::GEMINI_MODEL.to_string(),
        }
    }

    /// Load from environment variables. Returns `None` when
    /// `GEMINI_API_KEY` is unset or empty, meaning the provider is
    /// disabled for this deployment.
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty())?;

        let base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| tabula_core::defaults::GEMINI_BASE_URL.to_string());
        let model = env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| tabula_core::defaults::GEMINI_MODEL.to_string());

        Some(Self {
            base_url,
            api_key,
            model,
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_base_url("Gemini", &self.base_url)?;
        if self.api_key.is_empty() {
            return Err(ConfigError::Validation(
                "Gemini api_key cannot be empty".to_string(),
            ));
        }
        if self.model.is_empty() {
            return Err(ConfigError::Validation(
                "Gemini model cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Groq backend configuration.
///
/// The wire protocol is the OpenAI chat-completions API, so any
/// compatible endpoint can stand in via `base_url`.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// Base URL for the OpenAI-compatible API.
    pub base_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model to use for answer generation.
    pub model: String,
}

impl GroqConfig {
    /// Build a config for the given API key with default endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: tabula_core::defaults::GROQ_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: tabula_core::defaults::GROQ_MODEL.to_string(),
        }
    }

    /// Load from environment variables. Returns `None` when
    /// `GROQ_API_KEY` is unset or empty.
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty())?;

        let base_url = env::var("GROQ_BASE_URL")
            .unwrap_or_else(|_| tabula_core::defaults::GROQ_BASE_URL.to_string());
        let model = env::var("GROQ_MODEL")
            .unwrap_or_else(|_| tabula_core::defaults::GROQ_MODEL.to_string());

        Some(Self {
            base_url,
            api_key,
            model,
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_base_url("Groq", &self.base_url)?;
        if self.api_key.is_empty() {
            return Err(ConfigError::Validation(
                "Groq api_key cannot be empty".to_string(),
            ));
        }
        if self.model.is_empty() {
            return Err(ConfigError::Validation(
                "Groq model cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Orchestrator-level configuration.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Optional per-provider timeout. When a provider exceeds it, the
    /// attempt counts as a failure and the chain falls through to the
    /// next provider.
    pub answer_timeout: Option<Duration>,
}

impl OrchestratorConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        let answer_timeout = env::var("TABULA_ANSWER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        Self { answer_timeout }
    }
}
