//! Transcription job registry implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tabula_core::{Error, JobRegistry, JobStatus, Result, TranscriptionJob};

/// PostgreSQL implementation of JobRegistry.
#[derive(Clone)]
pub struct PgJobRegistry {
    pool: Pool<Postgres>,
}

impl PgJobRegistry {
    /// Create a new PgJobRegistry with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert JobStatus to string for database.
    pub(crate) fn job_status_to_str(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Convert string from database to JobStatus.
    pub(crate) fn str_to_job_status(s: &str) -> JobStatus {
        match s {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "done" => JobStatus::Done,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending, // fallback
        }
    }

    /// Parse a transcription_job row into a TranscriptionJob struct.
    fn parse_job_row(row: sqlx::postgres::PgRow) -> TranscriptionJob {
        TranscriptionJob {
            id: row.get("id"),
            resource_id: row.get("resource_id"),
            status: Self::str_to_job_status(row.get("status")),
            transcription: row.get("transcription"),
            error: row.get("error"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    /// Classify a guarded transition that matched no row: the job either
    /// does not exist or sits in a state the transition forbids.
    async fn transition_conflict(&self, id: Uuid, wanted: &str) -> Error {
        let status: std::result::Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT status::text FROM transcription_job WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await;

        match status {
            Ok(Some(current)) => Error::InvalidInput(format!(
                "Job {} cannot transition to {} from {}",
                id, wanted, current
            )),
            Ok(None) => Error::JobNotFound(id),
            Err(e) => Error::Database(e),
        }
    }
}

#[async_trait]
impl JobRegistry for PgJobRegistry {
    async fn create(&self, resource_id: Uuid) -> Result<TranscriptionJob> {
        let job = TranscriptionJob::new(resource_id);

        sqlx::query(
            "INSERT INTO transcription_job (id, resource_id, status, transcription, error, created_at, updated_at)
             VALUES ($1, $2, 'pending'::transcription_status, NULL, NULL, $3, $3)",
        )
        .bind(job.id)
        .bind(job.resource_id)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<TranscriptionJob> {
        let row = sqlx::query(
            "SELECT id, resource_id, status::text AS status, transcription, error, created_at, updated_at
             FROM transcription_job WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).ok_or(Error::JobNotFound(id))
    }

    async fn find_by_resource(&self, resource_id: Uuid) -> Result<Option<TranscriptionJob>> {
        let row = sqlx::query(
            "SELECT id, resource_id, status::text AS status, transcription, error, created_at, updated_at
             FROM transcription_job
             WHERE resource_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn all(&self) -> Result<Vec<TranscriptionJob>> {
        let rows = sqlx::query(
            "SELECT id, resource_id, status::text AS status, transcription, error, created_at, updated_at
             FROM transcription_job
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_job_row).collect())
    }

    async fn mark_processing(&self, id: Uuid) -> Result<TranscriptionJob> {
        let now = Utc::now();

        let row = sqlx::query(
            "UPDATE transcription_job
             SET status = 'processing'::transcription_status, updated_at = $1
             WHERE id = $2 AND status = 'pending'::transcription_status
             RETURNING id, resource_id, status::text AS status, transcription, error, created_at, updated_at",
        )
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => Ok(Self::parse_job_row(row)),
            None => Err(self.transition_conflict(id, "processing").await),
        }
    }

    async fn mark_done(&self, id: Uuid, transcription: &str) -> Result<TranscriptionJob> {
        let now = Utc::now();

        let row = sqlx::query(
            "UPDATE transcription_job
             SET status = 'done'::transcription_status, transcription = $1, error = NULL, updated_at = $2
             WHERE id = $3
               AND status IN ('pending'::transcription_status, 'processing'::transcription_status)
             RETURNING id, resource_id, status::text AS status, transcription, error, created_at, updated_at",
        )
        .bind(transcription)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => Ok(Self::parse_job_row(row)),
            None => Err(self.transition_conflict(id, "done").await),
        }
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<TranscriptionJob> {
        let now = Utc::now();

        let row = sqlx::query(
            "UPDATE transcription_job
             SET status = 'failed'::transcription_status, error = $1, updated_at = $2
             WHERE id = $3
               AND status IN ('pending'::transcription_status, 'processing'::transcription_status)
             RETURNING id, resource_id, status::text AS status, transcription, error, created_at, updated_at",
        )
        .bind(error)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => Ok(Self::parse_job_row(row)),
            None => Err(self.transition_conflict(id, "failed").await),
        }
    }

    async fn delete_for_resource(&self, resource_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM transcription_job WHERE resource_id = $1")
            .bind(resource_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}
