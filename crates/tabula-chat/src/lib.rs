//! # tabula-chat
//!
//! Chat orchestration over graph-scoped transcript context.
//!
//! This crate provides:
//! - Node-to-job resolution (direct reference with registry-scan fallback)
//! - Context aggregation across a chat anchor's connections
//! - The send/history/clear/delete/edit chat use case
//! - Structured answer outcomes instead of sentinel strings
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabula_chat::{ChatConfig, ChatRef, ChatService};
//!
//! let service = ChatService::new(
//!     items, connections, jobs, chats, turns,
//!     Arc::new(orchestrator),
//!     ChatConfig::from_env(),
//! );
//! let outcome = service
//!     .send_message(ChatRef::Anchor(anchor_id), "What is the topic?")
//!     .await?;
//! println!("{} ({:?})", outcome.answer, outcome.kind);
//! ```

pub mod context;
pub mod resolver;
pub mod service;

// Re-export core types
pub use tabula_core::*;

pub use context::{
    AggregatedContext, AggregatorConfig, ContextAggregator, ResolutionOutcome, SourceResolution,
};
pub use resolver::ResourceResolver;
pub use service::{AnswerKind, ChatConfig, ChatHistory, ChatRef, ChatService, SendOutcome};
