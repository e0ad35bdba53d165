//! Graph-scoped context aggregation.
//!
//! Walks the connections around a chat's anchor node, resolves each far
//! endpoint to its transcription job, and joins the finished transcripts
//! into one delimited context string. Per-connection failures are
//! recorded, never propagated: one broken edge must not cost the chat
//! the rest of its sources.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use tabula_core::defaults::CONTEXT_DELIMITER;
use tabula_core::{
    ConnectionKind, ConnectionRepository, Error, JobRegistry, Result, TranscriptionJob,
};

use crate::resolver::ResourceResolver;

/// How one context source fared during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Job is done with a non-empty transcript.
    Resolved,
    /// Job exists but is not done, or finished with an empty transcript.
    PendingTranscription,
    /// The node or its job could not be resolved at all.
    Unresolved,
}

/// Diagnostic record for one connection (or one global-scope job).
#[derive(Debug, Clone, Serialize)]
pub struct SourceResolution {
    /// Edge that led to this source; absent for global-scope aggregation.
    pub connection_id: Option<Uuid>,
    /// Node (or job resource) the source was resolved from.
    pub node_id: Uuid,
    pub outcome: ResolutionOutcome,
}

/// Everything aggregation learned about a chat's sources.
#[derive(Debug, Clone, Default)]
pub struct AggregatedContext {
    /// All resolved transcripts joined by the context delimiter. Empty
    /// when nothing resolved.
    pub context: String,
    /// The resolved transcripts, in edge-iteration order.
    pub transcripts: Vec<String>,
    /// Per-source diagnostics, in edge-iteration order.
    pub resolutions: Vec<SourceResolution>,
    pub total_connections: usize,
    pub resolved_count: usize,
    pub pending_count: usize,
}

impl AggregatedContext {
    pub fn unresolved_count(&self) -> usize {
        self.total_connections - self.resolved_count - self.pending_count
    }

    /// Whether any context-bearing source is connected at all.
    pub fn has_sources(&self) -> bool {
        self.total_connections > 0
    }

    /// Whether at least one transcript is ready to feed a provider.
    pub fn has_context(&self) -> bool {
        self.resolved_count > 0
    }
}

/// Configuration for context aggregation.
#[derive(Debug, Clone, Default)]
pub struct AggregatorConfig {
    /// Restrict anchored aggregation to edges of one semantic kind.
    /// `None` considers every edge touching the anchor.
    pub edge_kind: Option<ConnectionKind>,
}

/// Resolves a chat's connected sources into transcript context.
pub struct ContextAggregator {
    connections: Arc<dyn ConnectionRepository>,
    jobs: Arc<dyn JobRegistry>,
    resolver: ResourceResolver,
    config: AggregatorConfig,
}

impl ContextAggregator {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        jobs: Arc<dyn JobRegistry>,
        resolver: ResourceResolver,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            connections,
            jobs,
            resolver,
            config,
        }
    }

    /// Walk the edges around `anchor_id` and assemble transcript context.
    ///
    /// Edges are treated as undirected: whichever side the anchor sits
    /// on, the far endpoint is the source. Edges to nodes that cannot
    /// carry a transcript (other chat anchors) are skipped outright and
    /// do not count as connections.
    pub async fn aggregate(&self, anchor_id: Uuid) -> Result<AggregatedContext> {
        let edges = self.connections.touching(anchor_id, None).await?;

        let mut result = AggregatedContext::default();
        for edge in edges {
            if let Some(kind) = self.config.edge_kind {
                if edge.kind != kind {
                    continue;
                }
            }
            let feeds = edge
                .other_end_kind(anchor_id)
                .map(|k| k.feeds_context())
                .unwrap_or(false);
            if !feeds {
                continue;
            }
            let Some(node_id) = edge.other_end(anchor_id) else {
                continue;
            };
            result.total_connections += 1;

            let outcome = match self.resolver.resolve(node_id).await {
                Ok(job) => classify(&mut result, &job),
                Err(Error::ItemNotFound(_)) | Err(Error::NoJobForItem(_)) => {
                    debug!(
                        subsystem = "chat",
                        node_id = %node_id,
                        "Connected node has no transcribable job"
                    );
                    ResolutionOutcome::Unresolved
                }
                Err(e) => {
                    warn!(
                        subsystem = "chat",
                        node_id = %node_id,
                        error = %e,
                        "Source resolution failed"
                    );
                    ResolutionOutcome::Unresolved
                }
            };
            result.resolutions.push(SourceResolution {
                connection_id: Some(edge.id),
                node_id,
                outcome,
            });
        }

        result.context = result.transcripts.join(CONTEXT_DELIMITER);
        debug!(
            subsystem = "chat",
            anchor_id = %anchor_id,
            total = result.total_connections,
            resolved = result.resolved_count,
            pending = result.pending_count,
            context_len = result.context.len(),
            "Context aggregated"
        );
        Ok(result)
    }

    /// Assemble context from every job in the registry.
    ///
    /// Chats without an anchor item are scoped to the whole board's
    /// transcription output rather than to graph edges, so each known
    /// job counts as one source here.
    pub async fn aggregate_global(&self) -> Result<AggregatedContext> {
        let jobs = self.jobs.all().await?;

        let mut result = AggregatedContext::default();
        for job in jobs {
            result.total_connections += 1;
            let outcome = classify(&mut result, &job);
            result.resolutions.push(SourceResolution {
                connection_id: None,
                node_id: job.resource_id,
                outcome,
            });
        }

        result.context = result.transcripts.join(CONTEXT_DELIMITER);
        debug!(
            subsystem = "chat",
            total = result.total_connections,
            resolved = result.resolved_count,
            pending = result.pending_count,
            "Global context aggregated"
        );
        Ok(result)
    }
}

fn classify(result: &mut AggregatedContext, job: &TranscriptionJob) -> ResolutionOutcome {
    if job.has_transcript() {
        result.resolved_count += 1;
        result
            .transcripts
            .push(job.transcription.clone().unwrap_or_default());
        ResolutionOutcome::Resolved
    } else {
        result.pending_count += 1;
        ResolutionOutcome::PendingTranscription
    }
}
