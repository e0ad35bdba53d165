//! # tabula-inference
//!
//! LLM answer backend abstraction for tabula.
//!
//! This crate provides:
//! - Gemini implementation of the answer backend trait
//! - Groq implementation (OpenAI-compatible `chat/completions`)
//! - Ordered provider fallback orchestration
//! - Prompt assembly with a configurable persona
//! - Mock backend for deterministic tests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tabula_inference::{GeminiBackend, GroqBackend, LlmOrchestrator};
//! use tabula_core::AnswerBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut backends: Vec<Arc<dyn AnswerBackend>> = Vec::new();
//!     if let Some(gemini) = GeminiBackend::from_env() {
//!         backends.push(Arc::new(gemini));
//!     }
//!     if let Some(groq) = GroqBackend::from_env() {
//!         backends.push(Arc::new(groq));
//!     }
//!     let orchestrator = LlmOrchestrator::new(backends).unwrap();
//!     let answer = orchestrator.answer("What is this video about?", "", &[]).await;
//!     println!("{:?}", answer);
//! }
//! ```

pub mod config;
pub mod gemini;
pub mod groq;
pub mod orchestrator;
pub mod prompt;

// Mock answer backend for testing
// Note: Always compiled so downstream crates can use it in their tests
pub mod mock;

// Re-export core types
pub use tabula_core::*;

pub use config::{ConfigError, ConfigResult, GeminiConfig, GroqConfig, OrchestratorConfig};
pub use gemini::GeminiBackend;
pub use groq::GroqBackend;
pub use mock::MockAnswerBackend;
pub use orchestrator::{Answer, LlmOrchestrator};
pub use prompt::{build_prompt, PromptConfig, DEFAULT_PERSONA};
