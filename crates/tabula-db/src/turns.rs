//! Chat turn repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tabula_core::{ChatTurn, Error, Result, TurnRepository, TurnRole};

/// PostgreSQL implementation of TurnRepository.
#[derive(Clone)]
pub struct PgTurnRepository {
    pool: Pool<Postgres>,
}

impl PgTurnRepository {
    /// Create a new PgTurnRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert TurnRole to string for database.
    pub(crate) fn turn_role_to_str(role: TurnRole) -> &'static str {
        match role {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }

    /// Convert string from database to TurnRole.
    pub(crate) fn str_to_turn_role(s: &str) -> TurnRole {
        match s {
            "user" => TurnRole::User,
            "assistant" => TurnRole::Assistant,
            _ => TurnRole::User, // fallback
        }
    }

    /// Parse a chat_turn row into a ChatTurn struct.
    fn parse_turn_row(row: sqlx::postgres::PgRow) -> ChatTurn {
        ChatTurn {
            id: row.get("id"),
            chat_id: row.get("chat_id"),
            role: Self::str_to_turn_role(row.get("role")),
            content: row.get("content"),
            context: row.get("context"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl TurnRepository for PgTurnRepository {
    async fn append(&self, turn: &ChatTurn) -> Result<Uuid> {
        sqlx::query(
            "INSERT INTO chat_turn (id, chat_id, role, content, context, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(turn.id)
        .bind(turn.chat_id)
        .bind(Self::turn_role_to_str(turn.role))
        .bind(&turn.content)
        .bind(&turn.context)
        .bind(turn.created_at)
        .bind(turn.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(turn.id)
    }

    async fn list_for_chat(&self, chat_id: Uuid) -> Result<Vec<ChatTurn>> {
        // Ties on created_at break on the time-ordered id so the order
        // stays stable under rapid inserts.
        let rows = sqlx::query(
            "SELECT id, chat_id, role, content, context, created_at, updated_at
             FROM chat_turn WHERE chat_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_turn_row).collect())
    }

    async fn get(&self, id: Uuid) -> Result<ChatTurn> {
        let row = sqlx::query(
            "SELECT id, chat_id, role, content, context, created_at, updated_at
             FROM chat_turn WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_turn_row)
            .ok_or(Error::MessageNotFound(id))
    }

    async fn count_for_chat(&self, chat_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_turn WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM chat_turn WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::MessageNotFound(id));
        }
        Ok(())
    }

    async fn delete_for_chat(&self, chat_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chat_turn WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    async fn update_content(&self, id: Uuid, content: &str) -> Result<ChatTurn> {
        let now = Utc::now();

        let row = sqlx::query(
            "UPDATE chat_turn
             SET content = $1, updated_at = $2
             WHERE id = $3
             RETURNING id, chat_id, role, content, context, created_at, updated_at",
        )
        .bind(content)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_turn_row)
            .ok_or(Error::MessageNotFound(id))
    }
}
