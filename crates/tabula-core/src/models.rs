//! Core data models for tabula.
//!
//! These types are shared across all tabula crates and represent the
//! whiteboard graph, its transcription jobs, and chat conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::uuid_utils::new_v7;

// =============================================================================
// BOARD ITEMS
// =============================================================================

/// Kind of a whiteboard item (graph node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// AI chat anchor node
    Chat,
    Youtube,
    Tiktok,
    Instagram,
    /// Uploaded document
    Doc,
    Image,
    /// Generic web link
    Url,
    /// Other social-media source
    Social,
}

impl ItemKind {
    /// Whether items of this kind can feed transcript context into a chat.
    ///
    /// Everything except another chat node is a potential context source.
    pub fn feeds_context(&self) -> bool {
        !matches!(self, ItemKind::Chat)
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Youtube => write!(f, "youtube"),
            Self::Tiktok => write!(f, "tiktok"),
            Self::Instagram => write!(f, "instagram"),
            Self::Doc => write!(f, "doc"),
            Self::Image => write!(f, "image"),
            Self::Url => write!(f, "url"),
            Self::Social => write!(f, "social"),
        }
    }
}

/// A node on the whiteboard graph.
///
/// Video/document items weakly reference their transcription job via
/// `job_id` when the mapping is known at creation time; otherwise the job
/// carries a `resource_id` back-reference and resolution goes through a
/// registry scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardItem {
    pub id: Uuid,
    pub board_id: Uuid,
    pub kind: ItemKind,
    pub title: Option<String>,
    pub source_url: Option<String>,
    /// Direct reference to this item's transcription job, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BoardItem {
    /// Create a new item with a fresh time-ordered id.
    pub fn new(board_id: Uuid, kind: ItemKind) -> Self {
        let now = Utc::now();
        Self {
            id: new_v7(),
            board_id,
            kind,
            title: None,
            source_url: None,
            job_id: None,
            metadata: JsonValue::Null,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// CONNECTIONS
// =============================================================================

/// Semantic kind of a connection between two board items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Association,
    Dependency,
    Flow,
    Reference,
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Association => write!(f, "association"),
            Self::Dependency => write!(f, "dependency"),
            Self::Flow => write!(f, "flow"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

/// A typed edge between two board items.
///
/// Edges are undirected for traversal purposes: `(from, to)` and
/// `(to, from)` join the same unordered pair, and at most one connection
/// may exist per pair. The `from`/`to` split records drawing direction
/// only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub from_id: Uuid,
    pub from_kind: ItemKind,
    pub to_id: Uuid,
    pub to_kind: ItemKind,
    pub kind: ConnectionKind,
    pub label: Option<String>,
    pub bidirectional: bool,
    /// Visual weight, 1 (weakest) to 5 (strongest).
    pub strength: i16,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// The endpoint opposite `node_id`, regardless of edge direction.
    ///
    /// Returns `None` when the edge does not touch `node_id` at all.
    pub fn other_end(&self, node_id: Uuid) -> Option<Uuid> {
        if self.from_id == node_id {
            Some(self.to_id)
        } else if self.to_id == node_id {
            Some(self.from_id)
        } else {
            None
        }
    }

    /// Kind of the endpoint opposite `node_id`.
    pub fn other_end_kind(&self, node_id: Uuid) -> Option<ItemKind> {
        if self.from_id == node_id {
            Some(self.to_kind)
        } else if self.to_id == node_id {
            Some(self.from_kind)
        } else {
            None
        }
    }

    /// Whether this edge touches `node_id` on either side.
    pub fn touches(&self, node_id: Uuid) -> bool {
        self.from_id == node_id || self.to_id == node_id
    }

    /// Whether this edge joins the unordered pair `(a, b)`.
    pub fn joins(&self, a: Uuid, b: Uuid) -> bool {
        (self.from_id == a && self.to_id == b) || (self.from_id == b && self.to_id == a)
    }
}

// =============================================================================
// CHATS
// =============================================================================

/// A chat conversation anchored to the whiteboard.
///
/// `anchor_item_id` points at the whiteboard item this chat hangs off;
/// it is absent for "global" chats that draw context from every job
/// rather than from graph connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub board_id: Uuid,
    pub anchor_item_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Create a new chat with a fresh time-ordered id.
    pub fn new(board_id: Uuid, anchor_item_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: new_v7(),
            board_id,
            anchor_item_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Role of a chat turn author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a chat's ordered history.
///
/// `context` holds the transcript strings used to produce an assistant
/// turn, in aggregation order; it is always empty for user turns. Turns
/// are immutable after creation except for `content` edits, which stamp
/// `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: TurnRole,
    pub content: String,
    #[serde(default)]
    pub context: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChatTurn {
    /// Build a user turn. User turns never carry context.
    pub fn user(chat_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: new_v7(),
            chat_id,
            role: TurnRole::User,
            content: content.into(),
            context: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Build an assistant turn carrying the transcripts that informed it.
    pub fn assistant(chat_id: Uuid, content: impl Into<String>, context: Vec<String>) -> Self {
        Self {
            id: new_v7(),
            chat_id,
            role: TurnRole::Assistant,
            content: content.into(),
            context,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

// =============================================================================
// TRANSCRIPTION JOBS
// =============================================================================

/// Lifecycle status of a transcription job.
///
/// Transitions: `pending -> processing -> {done | failed}`. Both `done`
/// and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    /// Whether no further transitions may occur from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Tracks one resource's transcription lifecycle.
///
/// `resource_id` is a weak back-reference to the board item being
/// transcribed. Jobs are mutated only through explicit status
/// transitions by the worker process; store adapters guard the
/// transitions so terminal states stay terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionJob {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TranscriptionJob {
    /// Create a pending job for a resource.
    pub fn new(resource_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: new_v7(),
            resource_id,
            status: JobStatus::Pending,
            transcription: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move a pending job into processing. No-op if not pending.
    pub fn mark_processing(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Processing;
            self.updated_at = Utc::now();
        }
    }

    /// Complete the job with its transcript. No-op once terminal.
    pub fn mark_done(&mut self, transcription: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Done;
            self.transcription = Some(transcription.into());
            self.updated_at = Utc::now();
        }
    }

    /// Fail the job with an error message. No-op once terminal.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Failed;
            self.error = Some(error.into());
            self.updated_at = Utc::now();
        }
    }

    /// Whether this job can contribute context: done with a non-empty
    /// transcript.
    pub fn has_transcript(&self) -> bool {
        self.status == JobStatus::Done
            && self
                .transcription
                .as_deref()
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false)
    }
}
