//! In-memory store implementations backing the orchestration tests.
//!
//! One `MemoryStore` implements every repository trait over mutex-held
//! collections, mirroring the semantics of the PostgreSQL adapters:
//! undirected duplicate checks, guarded job transitions, ordered turn
//! listing. Seed helpers build the common graph shapes the tests need.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use tabula_chat::{
    AggregatorConfig, BoardItem, Chat, ChatConfig, ChatRepository, ChatService, ChatTurn,
    Connection, ConnectionKind, ConnectionRepository, ContextAggregator, CreateConnectionRequest,
    Error, ItemKind, ItemRepository, JobRegistry, JobStatus, ResourceResolver, Result,
    TranscriptionJob, TurnRepository,
};
use tabula_inference::{AnswerBackend, LlmOrchestrator, MockAnswerBackend};

/// Shared in-memory backing store implementing every repository trait.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<Uuid, BoardItem>>,
    connections: Mutex<Vec<Connection>>,
    jobs: Mutex<Vec<TranscriptionJob>>,
    chats: Mutex<HashMap<Uuid, Chat>>,
    turns: Mutex<Vec<ChatTurn>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // =========================================================================
    // SEED HELPERS
    // =========================================================================

    pub fn add_item(&self, board_id: Uuid, kind: ItemKind) -> BoardItem {
        let item = BoardItem::new(board_id, kind);
        self.items.lock().unwrap().insert(item.id, item.clone());
        item
    }

    /// Item whose job is done with the given transcript. The item's
    /// `job_id` stays empty so resolution exercises the registry scan.
    pub fn add_done_source(&self, board_id: Uuid, transcript: &str) -> BoardItem {
        let item = self.add_item(board_id, ItemKind::Youtube);
        let mut job = TranscriptionJob::new(item.id);
        job.mark_processing();
        job.mark_done(transcript);
        self.jobs.lock().unwrap().push(job);
        item
    }

    /// Item whose job is still pending.
    pub fn add_pending_source(&self, board_id: Uuid) -> BoardItem {
        let item = self.add_item(board_id, ItemKind::Tiktok);
        self.jobs.lock().unwrap().push(TranscriptionJob::new(item.id));
        item
    }

    /// Item whose job failed.
    pub fn add_failed_source(&self, board_id: Uuid, error: &str) -> BoardItem {
        let item = self.add_item(board_id, ItemKind::Instagram);
        let mut job = TranscriptionJob::new(item.id);
        job.mark_failed(error);
        self.jobs.lock().unwrap().push(job);
        item
    }

    /// Item whose job finished with an empty transcript.
    pub fn add_empty_done_source(&self, board_id: Uuid) -> BoardItem {
        self.add_done_source(board_id, "   ")
    }

    /// Item with no job at all.
    pub fn add_jobless_source(&self, board_id: Uuid) -> BoardItem {
        self.add_item(board_id, ItemKind::Doc)
    }

    /// Chat anchor item. No chat row is created; the service
    /// materializes it on first use.
    pub fn add_chat_item(&self, board_id: Uuid) -> BoardItem {
        self.add_item(board_id, ItemKind::Chat)
    }

    /// Insert a chat row directly.
    pub fn insert_chat(&self, board_id: Uuid, anchor_item_id: Option<Uuid>) -> Chat {
        let chat = Chat::new(board_id, anchor_item_id);
        self.chats.lock().unwrap().insert(chat.id, chat.clone());
        chat
    }

    /// Connect two items directly, bypassing request validation.
    pub fn connect(&self, from: &BoardItem, to: &BoardItem) -> Connection {
        let now = Utc::now();
        let conn = Connection {
            id: Uuid::now_v7(),
            from_id: from.id,
            from_kind: from.kind,
            to_id: to.id,
            to_kind: to.kind,
            kind: ConnectionKind::Association,
            label: None,
            bidirectional: true,
            strength: 1,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        };
        self.connections.lock().unwrap().push(conn.clone());
        conn
    }

    /// Connect two items with an explicit edge kind.
    pub fn connect_with_kind(
        &self,
        from: &BoardItem,
        to: &BoardItem,
        kind: ConnectionKind,
    ) -> Connection {
        let mut conn = self.connect(from, to);
        conn.kind = kind;
        let mut connections = self.connections.lock().unwrap();
        if let Some(stored) = connections.iter_mut().find(|c| c.id == conn.id) {
            stored.kind = kind;
        }
        conn
    }

    /// Store a prepared job as-is.
    pub fn push_job(&self, job: TranscriptionJob) {
        self.jobs.lock().unwrap().push(job);
    }

    /// Point an item's direct `job_id` reference at a job.
    pub fn set_job_reference(&self, item_id: Uuid, job_id: Option<Uuid>) {
        if let Some(item) = self.items.lock().unwrap().get_mut(&item_id) {
            item.job_id = job_id;
        }
    }

    pub fn job_for_resource(&self, resource_id: Uuid) -> Option<TranscriptionJob> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.resource_id == resource_id)
            .cloned()
    }

    pub fn remove_job(&self, job_id: Uuid) {
        self.jobs.lock().unwrap().retain(|j| j.id != job_id);
    }

    pub fn turn_count(&self) -> usize {
        self.turns.lock().unwrap().len()
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

pub fn build_resolver(store: &Arc<MemoryStore>) -> ResourceResolver {
    ResourceResolver::new(
        Arc::clone(store) as Arc<dyn ItemRepository>,
        Arc::clone(store) as Arc<dyn JobRegistry>,
    )
}

pub fn build_aggregator(store: &Arc<MemoryStore>, config: AggregatorConfig) -> ContextAggregator {
    ContextAggregator::new(
        Arc::clone(store) as Arc<dyn ConnectionRepository>,
        Arc::clone(store) as Arc<dyn JobRegistry>,
        build_resolver(store),
        config,
    )
}

pub fn build_service(
    store: &Arc<MemoryStore>,
    backends: Vec<MockAnswerBackend>,
    config: ChatConfig,
) -> ChatService {
    let dyns: Vec<Arc<dyn AnswerBackend>> = backends
        .into_iter()
        .map(|b| Arc::new(b) as Arc<dyn AnswerBackend>)
        .collect();
    let orchestrator = Arc::new(LlmOrchestrator::new(dyns).expect("backend chain"));
    ChatService::new(
        Arc::clone(store) as Arc<dyn ItemRepository>,
        Arc::clone(store) as Arc<dyn ConnectionRepository>,
        Arc::clone(store) as Arc<dyn JobRegistry>,
        Arc::clone(store) as Arc<dyn ChatRepository>,
        Arc::clone(store) as Arc<dyn TurnRepository>,
        orchestrator,
        config,
    )
}

// =============================================================================
// TRAIT IMPLEMENTATIONS
// =============================================================================

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn insert(&self, item: &BoardItem) -> Result<Uuid> {
        self.items.lock().unwrap().insert(item.id, item.clone());
        Ok(item.id)
    }

    async fn get(&self, id: Uuid) -> Result<BoardItem> {
        self.items
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(Error::ItemNotFound(id))
    }

    async fn list_for_board(&self, board_id: Uuid) -> Result<Vec<BoardItem>> {
        let mut items: Vec<BoardItem> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.board_id == board_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.created_at, i.id));
        Ok(items)
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.items.lock().unwrap().contains_key(&id))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        if self.items.lock().unwrap().remove(&id).is_none() {
            return Err(Error::ItemNotFound(id));
        }
        self.connections.lock().unwrap().retain(|c| !c.touches(id));
        self.jobs.lock().unwrap().retain(|j| j.resource_id != id);
        Ok(())
    }
}

#[async_trait]
impl ConnectionRepository for MemoryStore {
    async fn create(&self, req: CreateConnectionRequest) -> Result<Connection> {
        if !(1..=5).contains(&req.strength) {
            return Err(Error::InvalidInput(format!(
                "Connection strength must be between 1 and 5, got {}",
                req.strength
            )));
        }
        if req.from_id == req.to_id {
            return Err(Error::InvalidInput(
                "Connection endpoints must be distinct items".to_string(),
            ));
        }

        let (from_kind, to_kind) = {
            let items = self.items.lock().unwrap();
            let from = items
                .get(&req.from_id)
                .ok_or(Error::ItemNotFound(req.from_id))?;
            let to = items.get(&req.to_id).ok_or(Error::ItemNotFound(req.to_id))?;
            (from.kind, to.kind)
        };

        let mut connections = self.connections.lock().unwrap();
        if connections.iter().any(|c| c.joins(req.from_id, req.to_id)) {
            return Err(Error::ConnectionExists {
                from: req.from_id,
                to: req.to_id,
            });
        }

        let now = Utc::now();
        let conn = Connection {
            id: Uuid::now_v7(),
            from_id: req.from_id,
            from_kind,
            to_id: req.to_id,
            to_kind,
            kind: req.kind,
            label: req.label,
            bidirectional: req.bidirectional,
            strength: req.strength,
            metadata: req.metadata.unwrap_or(serde_json::Value::Null),
            created_at: now,
            updated_at: now,
        };
        connections.push(conn.clone());
        Ok(conn)
    }

    async fn get(&self, id: Uuid) -> Result<Connection> {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Connection {} not found", id)))
    }

    async fn touching(
        &self,
        node_id: Uuid,
        other_kind: Option<ItemKind>,
    ) -> Result<Vec<Connection>> {
        let mut found: Vec<Connection> = self
            .connections
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.touches(node_id))
            .filter(|c| match other_kind {
                Some(kind) => c.other_end_kind(node_id) == Some(kind),
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by_key(|c| (c.created_at, c.id));
        Ok(found)
    }

    async fn exists_between(&self, a: Uuid, b: Uuid) -> Result<bool> {
        Ok(self
            .connections
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.joins(a, b)))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut connections = self.connections.lock().unwrap();
        let before = connections.len();
        connections.retain(|c| c.id != id);
        if connections.len() == before {
            return Err(Error::NotFound(format!("Connection {} not found", id)));
        }
        Ok(())
    }

    async fn delete_touching(&self, node_id: Uuid) -> Result<u64> {
        let mut connections = self.connections.lock().unwrap();
        let before = connections.len();
        connections.retain(|c| !c.touches(node_id));
        Ok((before - connections.len()) as u64)
    }
}

#[async_trait]
impl JobRegistry for MemoryStore {
    async fn create(&self, resource_id: Uuid) -> Result<TranscriptionJob> {
        let job = TranscriptionJob::new(resource_id);
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<TranscriptionJob> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or(Error::JobNotFound(id))
    }

    async fn find_by_resource(&self, resource_id: Uuid) -> Result<Option<TranscriptionJob>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.resource_id == resource_id)
            .max_by_key(|j| (j.created_at, j.id))
            .cloned())
    }

    async fn all(&self) -> Result<Vec<TranscriptionJob>> {
        let mut jobs = self.jobs.lock().unwrap().clone();
        jobs.sort_by_key(|j| (j.created_at, j.id));
        Ok(jobs)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<TranscriptionJob> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(Error::JobNotFound(id))?;
        if job.status != JobStatus::Pending {
            return Err(Error::InvalidInput(format!(
                "Job {} cannot transition to processing from {}",
                id, job.status
            )));
        }
        job.mark_processing();
        Ok(job.clone())
    }

    async fn mark_done(&self, id: Uuid, transcription: &str) -> Result<TranscriptionJob> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(Error::JobNotFound(id))?;
        if job.status.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "Job {} cannot transition to done from {}",
                id, job.status
            )));
        }
        job.mark_done(transcription);
        Ok(job.clone())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<TranscriptionJob> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(Error::JobNotFound(id))?;
        if job.status.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "Job {} cannot transition to failed from {}",
                id, job.status
            )));
        }
        job.mark_failed(error);
        Ok(job.clone())
    }

    async fn delete_for_resource(&self, resource_id: Uuid) -> Result<u64> {
        let mut jobs = self.jobs.lock().unwrap();
        let before = jobs.len();
        jobs.retain(|j| j.resource_id != resource_id);
        Ok((before - jobs.len()) as u64)
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn insert(&self, chat: &Chat) -> Result<Uuid> {
        let mut chats = self.chats.lock().unwrap();
        if let Some(anchor) = chat.anchor_item_id {
            // Mirror the unique anchor constraint of the SQL schema
            if chats.values().any(|c| c.anchor_item_id == Some(anchor)) {
                return Err(Error::Database(sqlx::Error::Protocol(
                    "duplicate anchor_item_id".to_string(),
                )));
            }
        }
        chats.insert(chat.id, chat.clone());
        Ok(chat.id)
    }

    async fn get(&self, id: Uuid) -> Result<Chat> {
        self.chats
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(Error::ChatNotFound(id))
    }

    async fn get_by_anchor(&self, anchor_item_id: Uuid) -> Result<Option<Chat>> {
        Ok(self
            .chats
            .lock()
            .unwrap()
            .values()
            .find(|c| c.anchor_item_id == Some(anchor_item_id))
            .cloned())
    }

    async fn list_for_board(&self, board_id: Uuid) -> Result<Vec<Chat>> {
        let mut chats: Vec<Chat> = self
            .chats
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.board_id == board_id)
            .cloned()
            .collect();
        chats.sort_by_key(|c| (c.created_at, c.id));
        Ok(chats)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        if self.chats.lock().unwrap().remove(&id).is_none() {
            return Err(Error::ChatNotFound(id));
        }
        self.turns.lock().unwrap().retain(|t| t.chat_id != id);
        Ok(())
    }
}

#[async_trait]
impl TurnRepository for MemoryStore {
    async fn append(&self, turn: &ChatTurn) -> Result<Uuid> {
        self.turns.lock().unwrap().push(turn.clone());
        Ok(turn.id)
    }

    async fn list_for_chat(&self, chat_id: Uuid) -> Result<Vec<ChatTurn>> {
        let mut turns: Vec<ChatTurn> = self
            .turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.chat_id == chat_id)
            .cloned()
            .collect();
        turns.sort_by_key(|t| (t.created_at, t.id));
        Ok(turns)
    }

    async fn get(&self, id: Uuid) -> Result<ChatTurn> {
        self.turns
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(Error::MessageNotFound(id))
    }

    async fn count_for_chat(&self, chat_id: Uuid) -> Result<i64> {
        Ok(self
            .turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.chat_id == chat_id)
            .count() as i64)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut turns = self.turns.lock().unwrap();
        let before = turns.len();
        turns.retain(|t| t.id != id);
        if turns.len() == before {
            return Err(Error::MessageNotFound(id));
        }
        Ok(())
    }

    async fn delete_for_chat(&self, chat_id: Uuid) -> Result<u64> {
        let mut turns = self.turns.lock().unwrap();
        let before = turns.len();
        turns.retain(|t| t.chat_id != chat_id);
        Ok((before - turns.len()) as u64)
    }

    async fn update_content(&self, id: Uuid, content: &str) -> Result<ChatTurn> {
        let mut turns = self.turns.lock().unwrap();
        let turn = turns
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::MessageNotFound(id))?;
        turn.content = content.to_string();
        turn.updated_at = Some(Utc::now());
        Ok(turn.clone())
    }
}
