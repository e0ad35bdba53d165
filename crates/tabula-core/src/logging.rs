//! Structured logging schema and field name constants for tabula.
//!
//! All crates use these constants for consistent structured logging fields.
//! This ensures log aggregation tools (Loki, Elasticsearch) can query by
//! standardized field names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (connections, transcripts) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → aggregation → provider calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "inference", "chat"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "aggregator", "resolver", "orchestrator", "gemini", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "send_message", "aggregate", "resolve", "answer"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Chat UUID being operated on.
pub const CHAT_ID: &str = "chat_id";

/// Board item (graph node) UUID.
pub const ITEM_ID: &str = "item_id";

/// Transcription job UUID.
pub const JOB_ID: &str = "job_id";

/// Chat turn UUID.
pub const TURN_ID: &str = "turn_id";

/// Connection (edge) UUID.
pub const CONNECTION_ID: &str = "connection_id";

/// Whiteboard UUID.
pub const BOARD_ID: &str = "board_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Total connections touching the anchor during aggregation.
pub const CONNECTION_COUNT: &str = "connection_count";

/// Connections that resolved to a completed transcript.
pub const RESOLVED_COUNT: &str = "resolved_count";

/// Connections whose job exists but is not done yet.
pub const PENDING_COUNT: &str = "pending_count";

/// Byte length of the aggregated context string.
pub const CONTEXT_LEN: &str = "context_len";

/// Number of prior turns included in a prompt.
pub const HISTORY_LEN: &str = "history_len";

/// Byte length of a prompt sent to a provider.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table or entity affected.
pub const DB_TABLE: &str = "db_table";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

/// Provider position in the fallback chain (0-based).
pub const PROVIDER_INDEX: &str = "provider_index";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
