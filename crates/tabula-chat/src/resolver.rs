//! Node-to-job resolution.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use tabula_core::{Error, ItemRepository, JobRegistry, Result, TranscriptionJob};

/// Maps a graph node to the transcription job backing it.
///
/// Items created with a known job carry a direct `job_id` reference and
/// resolve in one fetch. Everything else resolves through the registry's
/// `resource_id` back-reference. Both paths sit behind the same
/// contract, so swapping the registry scan for an indexed lookup changes
/// nothing for callers.
#[derive(Clone)]
pub struct ResourceResolver {
    items: Arc<dyn ItemRepository>,
    jobs: Arc<dyn JobRegistry>,
}

impl ResourceResolver {
    pub fn new(items: Arc<dyn ItemRepository>, jobs: Arc<dyn JobRegistry>) -> Self {
        Self { items, jobs }
    }

    /// Resolve a node to its transcription job.
    ///
    /// Fails with `Error::ItemNotFound` when the node is missing and
    /// with `Error::NoJobForItem` when the node exists but nothing
    /// transcribes it. Read-only and idempotent.
    pub async fn resolve(&self, node_id: Uuid) -> Result<TranscriptionJob> {
        let item = self.items.get(node_id).await?;

        if let Some(job_id) = item.job_id {
            match self.jobs.get(job_id).await {
                Ok(job) => return Ok(job),
                Err(Error::JobNotFound(_)) => {
                    // Stale direct reference, fall back to the scan
                    debug!(
                        subsystem = "chat",
                        node_id = %node_id,
                        job_id = %job_id,
                        "Direct job reference is stale, scanning registry"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        self.jobs
            .find_by_resource(node_id)
            .await?
            .ok_or(Error::NoJobForItem(node_id))
    }
}
