//! Ordered provider fallback for answer generation.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use tabula_core::{AnswerBackend, ChatTurn, Error, Result};

use crate::config::OrchestratorConfig;

/// A generated answer together with the model that produced it.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub model: String,
}

/// Runs a fixed chain of answer backends in order, returning the first
/// success.
///
/// Each provider gets exactly one attempt per question. A timeout, an
/// HTTP failure and a malformed response all count the same: the chain
/// moves on to the next provider.
pub struct LlmOrchestrator {
    backends: Vec<Arc<dyn AnswerBackend>>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for LlmOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmOrchestrator")
            .field("backends", &self.backends.len())
            .field("config", &self.config)
            .finish()
    }
}

impl LlmOrchestrator {
    /// Create an orchestrator with default configuration.
    pub fn new(backends: Vec<Arc<dyn AnswerBackend>>) -> Result<Self> {
        Self::with_config(backends, OrchestratorConfig::default())
    }

    /// Create an orchestrator with explicit configuration.
    ///
    /// The chain must name at least one backend. Fallback order is the
    /// order of the vector.
    pub fn with_config(
        backends: Vec<Arc<dyn AnswerBackend>>,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        if backends.is_empty() {
            return Err(Error::Config(
                "At least one answer backend is required".to_string(),
            ));
        }

        info!(
            subsystem = "inference",
            providers = backends.len(),
            "Initializing answer orchestrator"
        );

        Ok(Self { backends, config })
    }

    /// Number of providers in the fallback chain.
    pub fn provider_count(&self) -> usize {
        self.backends.len()
    }

    /// Generate an answer, walking the provider chain in order.
    pub async fn answer(&self, question: &str, context: &str, history: &[ChatTurn]) -> Result<Answer> {
        let mut last_error = String::new();

        for (index, backend) in self.backends.iter().enumerate() {
            let model = backend.model_name().to_string();
            let start = Instant::now();

            let attempt = backend.answer(question, context, history);
            let outcome = match self.config.answer_timeout {
                Some(limit) => match tokio::time::timeout(limit, attempt).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Inference(format!(
                        "{} timed out after {}ms",
                        model,
                        limit.as_millis()
                    ))),
                },
                None => attempt.await,
            };

            match outcome {
                Ok(text) => {
                    debug!(
                        subsystem = "inference",
                        provider = index,
                        model = %model,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Answer generated"
                    );
                    return Ok(Answer { text, model });
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        subsystem = "inference",
                        provider = index,
                        model = %model,
                        error = %last_error,
                        "Provider failed, trying next"
                    );
                }
            }
        }

        Err(Error::AllProvidersFailed {
            providers: self.backends.len(),
            last: last_error,
        })
    }
}
