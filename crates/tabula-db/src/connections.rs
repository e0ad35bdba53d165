//! Connection repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tabula_core::{
    new_v7, Connection, ConnectionKind, ConnectionRepository, CreateConnectionRequest, Error,
    ItemKind, Result,
};

use crate::items::PgItemRepository;

/// PostgreSQL implementation of ConnectionRepository.
#[derive(Clone)]
pub struct PgConnectionRepository {
    pool: Pool<Postgres>,
}

impl PgConnectionRepository {
    /// Create a new PgConnectionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert ConnectionKind to string for database.
    pub(crate) fn connection_kind_to_str(kind: ConnectionKind) -> &'static str {
        match kind {
            ConnectionKind::Association => "association",
            ConnectionKind::Dependency => "dependency",
            ConnectionKind::Flow => "flow",
            ConnectionKind::Reference => "reference",
        }
    }

    /// Convert string from database to ConnectionKind.
    pub(crate) fn str_to_connection_kind(s: &str) -> ConnectionKind {
        match s {
            "association" => ConnectionKind::Association,
            "dependency" => ConnectionKind::Dependency,
            "flow" => ConnectionKind::Flow,
            "reference" => ConnectionKind::Reference,
            _ => ConnectionKind::Association, // fallback
        }
    }

    /// Parse a connection row into a Connection struct.
    fn parse_connection_row(row: sqlx::postgres::PgRow) -> Connection {
        Connection {
            id: row.get("id"),
            from_id: row.get("from_id"),
            from_kind: PgItemRepository::str_to_item_kind(row.get("from_kind")),
            to_id: row.get("to_id"),
            to_kind: PgItemRepository::str_to_item_kind(row.get("to_kind")),
            kind: Self::str_to_connection_kind(row.get("kind")),
            label: row.get("label"),
            bidirectional: row.get("bidirectional"),
            strength: row.get("strength"),
            metadata: row.get("metadata"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl ConnectionRepository for PgConnectionRepository {
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

        let id = new_v7();
        let now = Utc::now();
        let metadata = req.metadata.unwrap_or_else(|| serde_json::json!({}));

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let from_kind: Option<String> =
            sqlx::query_scalar("SELECT kind FROM board_item WHERE id = $1")
                .bind(req.from_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        let from_kind = from_kind.ok_or(Error::ItemNotFound(req.from_id))?;

        let to_kind: Option<String> =
            sqlx::query_scalar("SELECT kind FROM board_item WHERE id = $1")
                .bind(req.to_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        let to_kind = to_kind.ok_or(Error::ItemNotFound(req.to_id))?;

        // Edges are undirected: the duplicate guard checks the pair in
        // both orders so (a, b) and (b, a) count as the same connection.
        let result = sqlx::query(
            "INSERT INTO connection
                 (id, from_id, from_kind, to_id, to_kind, kind, label, bidirectional, strength, metadata, created_at, updated_at)
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11
             WHERE NOT EXISTS (
                 SELECT 1 FROM connection
                 WHERE (from_id = $2 AND to_id = $4) OR (from_id = $4 AND to_id = $2)
             )",
        )
        .bind(id)
        .bind(req.from_id)
        .bind(&from_kind)
        .bind(req.to_id)
        .bind(&to_kind)
        .bind(Self::connection_kind_to_str(req.kind))
        .bind(&req.label)
        .bind(req.bidirectional)
        .bind(req.strength)
        .bind(&metadata)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ConnectionExists {
                from: req.from_id,
                to: req.to_id,
            });
        }

        tx.commit().await.map_err(Error::Database)?;

        Ok(Connection {
            id,
            from_id: req.from_id,
            from_kind: PgItemRepository::str_to_item_kind(&from_kind),
            to_id: req.to_id,
            to_kind: PgItemRepository::str_to_item_kind(&to_kind),
            kind: req.kind,
            label: req.label,
            bidirectional: req.bidirectional,
            strength: req.strength,
            metadata,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Connection> {
        let row = sqlx::query(
            "SELECT id, from_id, from_kind, to_id, to_kind, kind, label, bidirectional, strength, metadata, created_at, updated_at
             FROM connection WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_connection_row)
            .ok_or_else(|| Error::NotFound(format!("Connection {} not found", id)))
    }

    async fn touching(&self, node_id: Uuid, other_kind: Option<ItemKind>) -> Result<Vec<Connection>> {
        let rows = match other_kind {
            Some(kind) => {
                // The kind filter applies to the far end of each edge as
                // seen from `node_id`.
                sqlx::query(
                    "SELECT id, from_id, from_kind, to_id, to_kind, kind, label, bidirectional, strength, metadata, created_at, updated_at
                     FROM connection
                     WHERE (from_id = $1 OR to_id = $1)
                       AND (CASE WHEN from_id = $1 THEN to_kind ELSE from_kind END) = $2
                     ORDER BY created_at ASC",
                )
                .bind(node_id)
                .bind(PgItemRepository::item_kind_to_str(kind))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT id, from_id, from_kind, to_id, to_kind, kind, label, bidirectional, strength, metadata, created_at, updated_at
                     FROM connection
                     WHERE from_id = $1 OR to_id = $1
                     ORDER BY created_at ASC",
                )
                .bind(node_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_connection_row).collect())
    }

    async fn exists_between(&self, a: Uuid, b: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM connection
                 WHERE (from_id = $1 AND to_id = $2) OR (from_id = $2 AND to_id = $1)
             )",
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM connection WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Connection {} not found", id)));
        }
        Ok(())
    }

    async fn delete_touching(&self, node_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM connection WHERE from_id = $1 OR to_id = $1")
            .bind(node_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}
