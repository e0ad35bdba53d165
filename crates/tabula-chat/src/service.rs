//! Chat orchestration use case.
//!
//! Ties the stores, the context aggregator and the provider chain
//! together for the five chat operations: send, history, clear, delete
//! and edit. The one hard rule throughout is that a user's question is
//! durably stored before anything downstream runs, so no aggregation or
//! provider failure can lose it.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tabula_core::{
    defaults, Chat, ChatRepository, ChatTurn, ConnectionRepository, Error, ItemRepository,
    JobRegistry, Result, TurnRepository,
};
use tabula_inference::LlmOrchestrator;

use crate::context::{AggregatorConfig, ContextAggregator};
use crate::resolver::ResourceResolver;

/// Identifies a chat either by its own id or by its anchor item.
///
/// Both forms converge on the same chat entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRef {
    /// The chat's own id.
    Id(Uuid),
    /// The board item the chat hangs off.
    Anchor(Uuid),
}

/// What kind of assistant content a send produced.
///
/// Callers branch on this instead of matching sentinel strings in the
/// answer text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKind {
    /// A model produced the answer.
    Answered { model: String },
    /// Sources are connected but none has a finished transcript yet.
    SourcesPending,
    /// No context-bearing source is connected to the chat.
    NoSourcesConnected,
    /// Every provider failed; the canned failure text was stored.
    GenerationFailed { error: String },
}

/// Result of a [`ChatService::send_message`] call.
///
/// `message_id` is the stored assistant turn; its presence proves the
/// question and the response both landed in the conversation store.
#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub answer: String,
    pub message_id: Uuid,
    /// Transcripts that backed the answer, in aggregation order.
    pub context: Vec<String>,
    /// Number of transcripts in `context`.
    pub context_size: usize,
    pub kind: AnswerKind,
}

/// Ordered history of a chat.
#[derive(Debug, Clone, Serialize)]
pub struct ChatHistory {
    pub messages: Vec<ChatTurn>,
    pub total_messages: usize,
}

/// Canned assistant responses and aggregation policy.
///
/// The wording is configuration, not logic: deployments localize or
/// rebrand these without touching the orchestration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Stored when a chat has no context-bearing connections.
    pub no_sources_message: String,
    /// Stored when sources are connected but none is transcribed yet.
    pub sources_pending_message: String,
    /// Stored when every provider fails to produce an answer.
    pub failure_message: String,
    pub aggregator: AggregatorConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            no_sources_message: defaults::NO_SOURCES_MESSAGE.to_string(),
            sources_pending_message: defaults::SOURCES_PENDING_MESSAGE.to_string(),
            failure_message: defaults::GENERATION_FAILED_MESSAGE.to_string(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `TABULA_NO_SOURCES_MESSAGE` | Canned reply when nothing is connected |
    /// | `TABULA_SOURCES_PENDING_MESSAGE` | Canned reply while transcripts are pending |
    /// | `TABULA_GENERATION_FAILED_MESSAGE` | Canned reply when all providers fail |
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(msg) = std::env::var("TABULA_NO_SOURCES_MESSAGE") {
            if !msg.is_empty() {
                config.no_sources_message = msg;
            }
        }
        if let Ok(msg) = std::env::var("TABULA_SOURCES_PENDING_MESSAGE") {
            if !msg.is_empty() {
                config.sources_pending_message = msg;
            }
        }
        if let Ok(msg) = std::env::var("TABULA_GENERATION_FAILED_MESSAGE") {
            if !msg.is_empty() {
                config.failure_message = msg;
            }
        }
        config
    }
}

/// Coordinator for chat conversations over graph-scoped context.
pub struct ChatService {
    items: Arc<dyn ItemRepository>,
    chats: Arc<dyn ChatRepository>,
    turns: Arc<dyn TurnRepository>,
    aggregator: ContextAggregator,
    orchestrator: Arc<LlmOrchestrator>,
    config: ChatConfig,
}

impl ChatService {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        connections: Arc<dyn ConnectionRepository>,
        jobs: Arc<dyn JobRegistry>,
        chats: Arc<dyn ChatRepository>,
        turns: Arc<dyn TurnRepository>,
        orchestrator: Arc<LlmOrchestrator>,
        config: ChatConfig,
    ) -> Self {
        let resolver = ResourceResolver::new(Arc::clone(&items), Arc::clone(&jobs));
        let aggregator =
            ContextAggregator::new(connections, jobs, resolver, config.aggregator.clone());
        Self {
            items,
            chats,
            turns,
            aggregator,
            orchestrator,
            config,
        }
    }

    /// Resolve a chat reference to its entity.
    ///
    /// Anchor references materialize the chat row on first use: a chat
    /// item on the board is a chat, its row just does not exist until
    /// someone talks to it. A reference to a missing anchor item fails
    /// with `Error::ChatNotFound`.
    async fn resolve_chat(&self, chat_ref: ChatRef) -> Result<Chat> {
        match chat_ref {
            ChatRef::Id(id) => self.chats.get(id).await,
            ChatRef::Anchor(anchor_id) => {
                if let Some(chat) = self.chats.get_by_anchor(anchor_id).await? {
                    return Ok(chat);
                }

                let item = match self.items.get(anchor_id).await {
                    Ok(item) => item,
                    Err(Error::ItemNotFound(_)) => return Err(Error::ChatNotFound(anchor_id)),
                    Err(e) => return Err(e),
                };

                let chat = Chat::new(item.board_id, Some(item.id));
                match self.chats.insert(&chat).await {
                    Ok(_) => {
                        info!(
                            subsystem = "chat",
                            chat_id = %chat.id,
                            anchor_id = %anchor_id,
                            "Materialized chat for anchor item"
                        );
                        Ok(chat)
                    }
                    // Lost a materialization race; the winner's row is the chat
                    Err(Error::Database(_)) => self
                        .chats
                        .get_by_anchor(anchor_id)
                        .await?
                        .ok_or(Error::ChatNotFound(anchor_id)),
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Answer a question in a chat.
    ///
    /// The user turn is stored before aggregation or any provider call.
    /// When no transcript context is available, a canned message is
    /// stored instead of invoking a provider; when every provider fails,
    /// the canned failure message is stored and the outcome reports the
    /// error. In all of those cases the caller still gets a stored
    /// assistant turn, never a dangling question.
    pub async fn send_message(&self, chat_ref: ChatRef, question: &str) -> Result<SendOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("Question must not be empty".to_string()));
        }

        let chat = self.resolve_chat(chat_ref).await?;

        // Prior turns only; the current question rides in the prompt itself.
        let history = self.turns.list_for_chat(chat.id).await?;

        let user_turn = ChatTurn::user(chat.id, question);
        self.turns.append(&user_turn).await?;

        let aggregated = match chat.anchor_item_id {
            Some(anchor_id) => self.aggregator.aggregate(anchor_id).await?,
            None => self.aggregator.aggregate_global().await?,
        };

        let (content, context, kind) = if aggregated.has_context() {
            match self
                .orchestrator
                .answer(question, &aggregated.context, &history)
                .await
            {
                Ok(answer) => (
                    answer.text,
                    aggregated.transcripts.clone(),
                    AnswerKind::Answered {
                        model: answer.model,
                    },
                ),
                Err(e) => {
                    warn!(
                        subsystem = "chat",
                        chat_id = %chat.id,
                        error = %e,
                        "Answer generation failed, storing fallback message"
                    );
                    (
                        self.config.failure_message.clone(),
                        Vec::new(),
                        AnswerKind::GenerationFailed {
                            error: e.to_string(),
                        },
                    )
                }
            }
        } else if aggregated.has_sources() {
            debug!(
                subsystem = "chat",
                chat_id = %chat.id,
                pending = aggregated.pending_count,
                "Sources connected but none transcribed yet"
            );
            (
                self.config.sources_pending_message.clone(),
                Vec::new(),
                AnswerKind::SourcesPending,
            )
        } else {
            (
                self.config.no_sources_message.clone(),
                Vec::new(),
                AnswerKind::NoSourcesConnected,
            )
        };

        let assistant_turn = ChatTurn::assistant(chat.id, content.clone(), context.clone());
        self.turns.append(&assistant_turn).await?;

        info!(
            subsystem = "chat",
            chat_id = %chat.id,
            sources = aggregated.total_connections,
            resolved = aggregated.resolved_count,
            "Message answered"
        );

        Ok(SendOutcome {
            answer: content,
            message_id: assistant_turn.id,
            context_size: context.len(),
            context,
            kind,
        })
    }

    /// Full history of a chat, oldest first.
    pub async fn get_history(&self, chat_ref: ChatRef) -> Result<ChatHistory> {
        let chat = self.resolve_chat(chat_ref).await?;
        let messages = self.turns.list_for_chat(chat.id).await?;
        let total_messages = messages.len();
        Ok(ChatHistory {
            messages,
            total_messages,
        })
    }

    /// Delete every turn in a chat. The chat itself survives, and
    /// clearing an already-empty chat is a no-op.
    pub async fn clear_history(&self, chat_ref: ChatRef) -> Result<u64> {
        let chat = self.resolve_chat(chat_ref).await?;
        let removed = self.turns.delete_for_chat(chat.id).await?;
        info!(
            subsystem = "chat",
            chat_id = %chat.id,
            removed = removed,
            "Chat history cleared"
        );
        Ok(removed)
    }

    /// Hard-delete a single turn.
    pub async fn delete_message(&self, message_id: Uuid) -> Result<()> {
        self.turns.delete(message_id).await
    }

    /// Manual content override for a stored turn.
    ///
    /// Stamps `updated_at`. Does not re-run aggregation or call any
    /// provider.
    pub async fn update_message(&self, message_id: Uuid, content: &str) -> Result<ChatTurn> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::InvalidInput(
                "Message content must not be empty".to_string(),
            ));
        }
        self.turns.update_content(message_id, content).await
    }
}
