//! Prompt assembly shared by all answer backends.
//!
//! Every provider sends a single textual prompt assembled here so that
//! switching providers never changes what the model sees. Section order
//! is fixed: persona and instructions, then prior turns, then the
//! question, then the transcript context.

use tabula_core::{ChatTurn, TurnRole};

/// Default persona and instruction block.
pub const DEFAULT_PERSONA: &str = "You are Tabula, an expert scriptwriter and creative assistant for creators, marketers and agencies.

## Instructions:
- If the user asks for a **direct retrieval** (e.g. \"send full video script\", \"give me the hooks\", script, hooks, outline, etc.), return it **exactly as found** in the context with no analysis or rewriting.
- If the user asks for **ideas, suggestions or improvements**, analyze the context and respond creatively.
- If it's unclear, default to creative/analysis mode.";

/// Prompt configuration.
///
/// The persona wording is deployment policy, not logic, so it lives in
/// configuration rather than inside any backend.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    /// Persona and instruction block placed at the top of every prompt.
    pub persona: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
        }
    }
}

impl PromptConfig {
    /// Use a custom persona block.
    pub fn with_persona(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }
}

fn role_label(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "user",
        TurnRole::Assistant => "assistant",
    }
}

/// Assemble the full prompt for one answer request.
///
/// `history` is serialized oldest first with role labels; an empty
/// history omits the section entirely.
pub fn build_prompt(
    config: &PromptConfig,
    question: &str,
    context: &str,
    history: &[ChatTurn],
) -> String {
    let mut prompt = String::with_capacity(
        config.persona.len() + question.len() + context.len() + history.len() * 64 + 128,
    );

    prompt.push_str(&config.persona);
    prompt.push_str("\n\n");

    if !history.is_empty() {
        prompt.push_str("## Conversation so far:\n");
        for turn in history {
            prompt.push_str(role_label(turn.role));
            prompt.push_str(": ");
            prompt.push_str(&turn.content);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    prompt.push_str("User Prompt:\n");
    prompt.push_str(question);
    prompt.push_str("\n\nContext:\n");
    prompt.push_str(context);

    prompt
}
