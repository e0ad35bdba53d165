//! Mock answer backend for deterministic testing.
//!
//! Provides a mock [`AnswerBackend`] that returns canned answers and
//! records every call, so orchestration and chat flows can be tested
//! without a live provider.
//!
//! ## Usage
//!
//! ```rust
//! use tabula_inference::mock::MockAnswerBackend;
//! use tabula_core::AnswerBackend;
//!
//! #[tokio::test]
//! async fn test_with_mock_backend() {
//!     let backend = MockAnswerBackend::new()
//!         .with_fixed_answer("Test answer");
//!
//!     let answer = backend.answer("question", "context", &[]).await.unwrap();
//!     assert_eq!(answer, "Test answer");
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use tabula_core::{AnswerBackend, ChatTurn, Error, Result};

/// Mock answer backend for testing.
#[derive(Clone)]
pub struct MockAnswerBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    model_name: String,
    fixed_answers: HashMap<String, String>,
    default_answer: String,
    latency_ms: u64,
    failure: Option<String>,
}

/// A recorded `answer` call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub question: String,
    pub context: String,
    pub history_len: usize,
    pub timestamp: std::time::Instant,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model_name: "mock-model".to_string(),
            fixed_answers: HashMap::new(),
            default_answer: "Mock answer".to_string(),
            latency_ms: 0,
            failure: None,
        }
    }
}

impl MockAnswerBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the model name reported by [`AnswerBackend::model_name`].
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model_name = name.into();
        self
    }

    /// Set the answer returned for any unmapped question.
    pub fn with_fixed_answer(mut self, answer: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_answer = answer.into();
        self
    }

    /// Add an answer mapping for a specific question.
    pub fn with_answer_mapping(
        mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .fixed_answers
            .insert(question.into(), answer.into());
        self
    }

    /// Set simulated latency for all calls.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Make every call fail with the given message.
    ///
    /// Failures are deterministic so fallback ordering can be asserted.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).failure = Some(message.into());
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    /// Get number of `answer` calls.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    fn log_call(&self, question: &str, context: &str, history_len: usize) {
        self.call_log.lock().unwrap().push(MockCall {
            question: question.to_string(),
            context: context.to_string(),
            history_len,
            timestamp: std::time::Instant::now(),
        });
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }
}

impl Default for MockAnswerBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerBackend for MockAnswerBackend {
    async fn answer(&self, question: &str, context: &str, history: &[ChatTurn]) -> Result<String> {
        self.log_call(question, context, history.len());
        self.simulate_latency().await;

        if let Some(message) = &self.config.failure {
            return Err(Error::Inference(message.clone()));
        }

        if let Some(answer) = self.config.fixed_answers.get(question) {
            return Ok(answer.clone());
        }

        Ok(self.config.default_answer.clone())
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}
