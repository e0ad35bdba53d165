//! Board item repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tabula_core::{BoardItem, Error, ItemKind, ItemRepository, Result};

/// PostgreSQL implementation of ItemRepository.
#[derive(Clone)]
pub struct PgItemRepository {
    pool: Pool<Postgres>,
}

impl PgItemRepository {
    /// Create a new PgItemRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert ItemKind to string for database.
    pub(crate) fn item_kind_to_str(kind: ItemKind) -> &'static str {
        match kind {
            ItemKind::Chat => "chat",
            ItemKind::Youtube => "youtube",
            ItemKind::Tiktok => "tiktok",
            ItemKind::Instagram => "instagram",
            ItemKind::Doc => "doc",
            ItemKind::Image => "image",
            ItemKind::Url => "url",
            ItemKind::Social => "social",
        }
    }

    /// Convert string from database to ItemKind.
    pub(crate) fn str_to_item_kind(s: &str) -> ItemKind {
        match s {
            "chat" => ItemKind::Chat,
            "youtube" => ItemKind::Youtube,
            "tiktok" => ItemKind::Tiktok,
            "instagram" => ItemKind::Instagram,
            "doc" => ItemKind::Doc,
            "image" => ItemKind::Image,
            "url" => ItemKind::Url,
            "social" => ItemKind::Social,
            _ => ItemKind::Url, // fallback
        }
    }

    /// Parse a board_item row into a BoardItem struct.
    fn parse_item_row(row: sqlx::postgres::PgRow) -> BoardItem {
        BoardItem {
            id: row.get("id"),
            board_id: row.get("board_id"),
            kind: Self::str_to_item_kind(row.get("kind")),
            title: row.get("title"),
            source_url: row.get("source_url"),
            job_id: row.get("job_id"),
            metadata: row.get("metadata"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    async fn insert(&self, item: &BoardItem) -> Result<Uuid> {
        sqlx::query(
            "INSERT INTO board_item (id, board_id, kind, title, source_url, job_id, metadata, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(item.id)
        .bind(item.board_id)
        .bind(Self::item_kind_to_str(item.kind))
        .bind(&item.title)
        .bind(&item.source_url)
        .bind(item.job_id)
        .bind(&item.metadata)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(item.id)
    }

    async fn get(&self, id: Uuid) -> Result<BoardItem> {
        let row = sqlx::query(
            "SELECT id, board_id, kind, title, source_url, job_id, metadata, created_at, updated_at
             FROM board_item WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_item_row).ok_or(Error::ItemNotFound(id))
    }

    async fn list_for_board(&self, board_id: Uuid) -> Result<Vec<BoardItem>> {
        let rows = sqlx::query(
            "SELECT id, board_id, kind, title, source_url, job_id, metadata, created_at, updated_at
             FROM board_item WHERE board_id = $1
             ORDER BY created_at ASC",
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_item_row).collect())
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM board_item WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Application-level cascade: touching connections and backing jobs
        // go first, then the item itself. Rolling back on a missing item
        // undoes the cascade.
        sqlx::query("DELETE FROM connection WHERE from_id = $1 OR to_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM transcription_job WHERE resource_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let result = sqlx::query("DELETE FROM board_item WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ItemNotFound(id));
        }

        tx.commit().await.map_err(Error::Database)?;

        tracing::debug!(
            subsystem = "db",
            component = "items",
            op = "delete",
            item_id = %id,
            deleted_at = %now,
            "Board item deleted with cascades"
        );
        Ok(())
    }
}
