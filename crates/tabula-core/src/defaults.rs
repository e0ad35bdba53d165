//! Centralized default constants for the tabula system.
//!
//! **This module is the single source of truth** for all shared default values.
//! All crates should reference these constants instead of defining their own
//! magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Gemini API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini generation model.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default Groq (OpenAI-compatible) API base URL.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default Groq generation model.
pub const GROQ_MODEL: &str = "openai/gpt-oss-20b";

/// Timeout for a single answer generation request (seconds).
pub const GEN_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// CONTEXT AGGREGATION
// =============================================================================

/// Separator placed between transcripts when building the combined
/// context string. Chosen so it is unlikely to occur inside a
/// transcript; consumers must treat it as opaque.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

// =============================================================================
// CHAT
// =============================================================================

/// Stored as the assistant turn when a chat has no context-bearing
/// connections. Wording is configuration; deployments override it via
/// `TABULA_NO_SOURCES_MESSAGE`.
pub const NO_SOURCES_MESSAGE: &str =
    "This chat has no connected sources yet. Connect a video or document to the chat node and ask again.";

/// Stored when sources are connected but no transcript is ready.
pub const SOURCES_PENDING_MESSAGE: &str =
    "Your connected sources are still being transcribed. Give it a moment and ask again.";

/// Stored when every provider fails to produce an answer.
pub const GENERATION_FAILED_MESSAGE: &str =
    "I couldn't generate an answer right now. Your question was saved, please try again.";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP bind address.
pub const SERVER_ADDR: &str = "127.0.0.1:8080";

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;
