//! Core traits for tabula abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability. The
//! orchestration crates depend only on these contracts, never on a
//! specific storage engine or model provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// GRAPH STORE TRAITS
// =============================================================================

/// Repository for whiteboard items (graph nodes).
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Insert a new item.
    async fn insert(&self, item: &BoardItem) -> Result<Uuid>;

    /// Fetch an item by ID. Fails with `Error::ItemNotFound` if absent.
    async fn get(&self, id: Uuid) -> Result<BoardItem>;

    /// List all items on a board.
    async fn list_for_board(&self, board_id: Uuid) -> Result<Vec<BoardItem>>;

    /// Check if an item exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Delete an item together with every connection touching it.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Request for creating a connection between two items.
///
/// Endpoint kinds are resolved from the item store at creation time, so
/// callers cannot desynchronize the kind snapshot from the items
/// themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConnectionRequest {
    pub from_id: Uuid,
    pub to_id: Uuid,
    #[serde(default)]
    pub kind: ConnectionKind,
    pub label: Option<String>,
    #[serde(default = "default_bidirectional")]
    pub bidirectional: bool,
    #[serde(default = "default_strength")]
    pub strength: i16,
    pub metadata: Option<JsonValue>,
}

fn default_bidirectional() -> bool {
    true
}

fn default_strength() -> i16 {
    1
}

/// Repository for connections (graph edges).
///
/// Edges are undirected for every query here: `touching` and
/// `exists_between` treat `(from, to)` and `(to, from)` identically.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Create a connection between two existing items.
    ///
    /// Fails with `Error::ConnectionExists` when the unordered pair is
    /// already joined, `Error::ItemNotFound` when either endpoint is
    /// missing.
    async fn create(&self, req: CreateConnectionRequest) -> Result<Connection>;

    /// Fetch a connection by ID. Fails with `Error::NotFound` if absent.
    async fn get(&self, id: Uuid) -> Result<Connection>;

    /// All connections touching `node_id` on either side, optionally
    /// filtered to those whose far endpoint has kind `other_kind`.
    async fn touching(
        &self,
        node_id: Uuid,
        other_kind: Option<ItemKind>,
    ) -> Result<Vec<Connection>>;

    /// Whether any connection joins the unordered pair `(a, b)`.
    async fn exists_between(&self, a: Uuid, b: Uuid) -> Result<bool>;

    /// Delete a connection by ID.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Delete every connection touching `node_id`. Returns the count
    /// removed.
    async fn delete_touching(&self, node_id: Uuid) -> Result<u64>;
}

// =============================================================================
// JOB REGISTRY TRAITS
// =============================================================================

/// Registry for transcription jobs.
///
/// Status transitions are guarded: `mark_processing` applies only to
/// pending jobs; `mark_done` and `mark_failed` only to non-terminal
/// jobs. A transition against the wrong state fails with
/// `Error::InvalidInput`; against a missing job with
/// `Error::JobNotFound`.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Create a pending job for a resource.
    async fn create(&self, resource_id: Uuid) -> Result<TranscriptionJob>;

    /// Fetch a job by ID. Fails with `Error::JobNotFound` if absent.
    async fn get(&self, id: Uuid) -> Result<TranscriptionJob>;

    /// Find the job whose `resource_id` back-reference matches, if any.
    ///
    /// This is the indirect resolution path; implementations may index
    /// the column or scan, the contract is the same.
    async fn find_by_resource(&self, resource_id: Uuid) -> Result<Option<TranscriptionJob>>;

    /// List every job in the registry.
    async fn all(&self) -> Result<Vec<TranscriptionJob>>;

    /// Move a pending job into processing.
    async fn mark_processing(&self, id: Uuid) -> Result<TranscriptionJob>;

    /// Complete a non-terminal job with its transcript.
    async fn mark_done(&self, id: Uuid, transcription: &str) -> Result<TranscriptionJob>;

    /// Fail a non-terminal job with an error message.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<TranscriptionJob>;

    /// Delete all jobs backing `resource_id`. Returns the count removed.
    async fn delete_for_resource(&self, resource_id: Uuid) -> Result<u64>;
}

// =============================================================================
// CONVERSATION STORE TRAITS
// =============================================================================

/// Repository for chat entities.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert a new chat.
    async fn insert(&self, chat: &Chat) -> Result<Uuid>;

    /// Fetch a chat by its own ID. Fails with `Error::ChatNotFound`.
    async fn get(&self, id: Uuid) -> Result<Chat>;

    /// Fetch the chat anchored to a board item, or `None` when no chat
    /// hangs off that item yet.
    async fn get_by_anchor(&self, anchor_item_id: Uuid) -> Result<Option<Chat>>;

    /// List all chats on a board.
    async fn list_for_board(&self, board_id: Uuid) -> Result<Vec<Chat>>;

    /// Delete a chat and all of its turns.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Repository for chat turns (the conversation history).
#[async_trait]
pub trait TurnRepository: Send + Sync {
    /// Append a turn to its chat's history.
    async fn append(&self, turn: &ChatTurn) -> Result<Uuid>;

    /// All turns for a chat, oldest first.
    async fn list_for_chat(&self, chat_id: Uuid) -> Result<Vec<ChatTurn>>;

    /// Fetch a single turn by ID. Fails with `Error::MessageNotFound`.
    async fn get(&self, id: Uuid) -> Result<ChatTurn>;

    /// Number of turns in a chat.
    async fn count_for_chat(&self, chat_id: Uuid) -> Result<i64>;

    /// Hard-delete a single turn. Fails with `Error::MessageNotFound`.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Delete every turn in a chat. Returns the count removed; deleting
    /// from an empty chat is a no-op, not an error.
    async fn delete_for_chat(&self, chat_id: Uuid) -> Result<u64>;

    /// Replace a turn's content, stamping `updated_at`. Fails with
    /// `Error::MessageNotFound` if absent.
    async fn update_content(&self, id: Uuid, content: &str) -> Result<ChatTurn>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for answering a question over transcript context (LLM
/// provider).
///
/// Implementations format their own prompt from the three inputs; the
/// ordering inside that prompt is instructions, then history, then the
/// question, then the context. Any failure surfaces as an error so the
/// caller can decide whether to fall back to another backend.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Produce an answer for `question` given aggregated `context` and
    /// prior conversation `history` (oldest first).
    async fn answer(&self, question: &str, context: &str, history: &[ChatTurn]) -> Result<String>;

    /// Name of the underlying model, for logging and diagnostics.
    fn model_name(&self) -> &str;
}
