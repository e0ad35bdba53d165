//! # tabula-db
//!
//! PostgreSQL database layer for tabula.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for all core entities
//! - Board item graph storage with undirected connections
//! - Transcription job registry with guarded status transitions
//! - Chat and turn persistence with application-level cascades
//!
//! ## Example
//!
//! ```rust,ignore
//! use tabula_db::Database;
//! use tabula_core::{BoardItem, ItemKind, ItemRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/tabula").await?;
//!
//!     let item = BoardItem::new(uuid::Uuid::now_v7(), ItemKind::Youtube);
//!     let item_id = db.items.insert(&item).await?;
//!
//!     println!("Created item: {}", item_id);
//!     Ok(())
//! }
//! ```
pub mod chats;
pub mod connections;
pub mod items;
pub mod jobs;
pub mod pool;
pub mod turns;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use tabula_core::*;

// Re-export repository implementations
pub use chats::PgChatRepository;
pub use connections::PgConnectionRepository;
pub use items::PgItemRepository;
pub use jobs::PgJobRegistry;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use turns::PgTurnRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Board item repository for CRUD operations.
    pub items: PgItemRepository,
    /// Connection repository for the undirected item graph.
    pub connections: PgConnectionRepository,
    /// Transcription job registry.
    pub jobs: PgJobRegistry,
    /// Chat repository.
    pub chats: PgChatRepository,
    /// Chat turn repository.
    pub turns: PgTurnRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            items: PgItemRepository::new(pool.clone()),
            connections: PgConnectionRepository::new(pool.clone()),
            jobs: PgJobRegistry::new(pool.clone()),
            chats: PgChatRepository::new(pool.clone()),
            turns: PgTurnRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Connect to test database (for integration tests).
    #[cfg(test)]
    pub async fn connect_test() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| crate::test_fixtures::DEFAULT_TEST_DATABASE_URL.to_string());
        Self::connect(&database_url).await
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
