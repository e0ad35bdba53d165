//! Chat repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tabula_core::{Chat, ChatRepository, Error, Result};

/// PostgreSQL implementation of ChatRepository.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: Pool<Postgres>,
}

impl PgChatRepository {
    /// Create a new PgChatRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Parse a chat row into a Chat struct.
    fn parse_chat_row(row: sqlx::postgres::PgRow) -> Chat {
        Chat {
            id: row.get("id"),
            board_id: row.get("board_id"),
            anchor_item_id: row.get("anchor_item_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn insert(&self, chat: &Chat) -> Result<Uuid> {
        sqlx::query(
            "INSERT INTO chat (id, board_id, anchor_item_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(chat.id)
        .bind(chat.board_id)
        .bind(chat.anchor_item_id)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(chat.id)
    }

    async fn get(&self, id: Uuid) -> Result<Chat> {
        let row = sqlx::query(
            "SELECT id, board_id, anchor_item_id, created_at, updated_at
             FROM chat WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_chat_row).ok_or(Error::ChatNotFound(id))
    }

    async fn get_by_anchor(&self, anchor_item_id: Uuid) -> Result<Option<Chat>> {
        let row = sqlx::query(
            "SELECT id, board_id, anchor_item_id, created_at, updated_at
             FROM chat WHERE anchor_item_id = $1",
        )
        .bind(anchor_item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_chat_row))
    }

    async fn list_for_board(&self, board_id: Uuid) -> Result<Vec<Chat>> {
        let rows = sqlx::query(
            "SELECT id, board_id, anchor_item_id, created_at, updated_at
             FROM chat WHERE board_id = $1
             ORDER BY created_at ASC",
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_chat_row).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Turns go first so the chat row never dangles mid-cascade.
        sqlx::query("DELETE FROM chat_turn WHERE chat_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let result = sqlx::query("DELETE FROM chat WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ChatNotFound(id));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
