//! Record Store layer: the storage contract and its implementations

pub mod books;
pub mod filter;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::{
    config::{AppConfig, StorageBackend},
    models::{
        book::{Book, BookDraft},
        page::PageRequest,
    },
};

pub use books::BooksRepository;
pub use filter::{BookCriteria, BookFilter};
pub use memory::MemoryBookStore;

/// Failures surfaced by a Record Store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Rejected by the storage-level ISBN uniqueness constraint
    #[error("ISBN {0} is already used by another book")]
    DuplicateIsbn(String),

    /// The row disappeared between lookup and write
    #[error("Book {0} no longer exists")]
    Missing(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable table of book records.
///
/// Implementations must enforce ISBN uniqueness atomically and own the
/// `created_at` / `updated_at` timestamps.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert a new record, assigning id and both timestamps
    async fn insert(&self, draft: &BookDraft) -> StoreResult<Book>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Book>>;

    async fn exists_by_id(&self, id: i64) -> StoreResult<bool>;

    async fn exists_by_isbn(&self, isbn: &str) -> StoreResult<bool>;

    /// Persist every mutable field of `book` and refresh `updated_at`
    async fn update(&self, book: &Book) -> StoreResult<Book>;

    async fn delete_by_id(&self, id: i64) -> StoreResult<()>;

    /// Matching records for the requested page, plus the total match count
    async fn query(&self, filter: &BookFilter, page: &PageRequest) -> StoreResult<(Vec<Book>, i64)>;

    /// Connectivity check used by the readiness endpoint
    async fn ping(&self) -> StoreResult<()>;
}

/// Build the Record Store selected in configuration
pub async fn connect(config: &AppConfig) -> StoreResult<Arc<dyn BookStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data will not survive a restart");
            Ok(Arc::new(MemoryBookStore::new()))
        }
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await?;

            tracing::info!("Connected to database");

            if config.database.run_migrations {
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(sqlx::Error::from)?;
                tracing::info!("Database migrations completed");
            }

            Ok(Arc::new(BooksRepository::new(pool)))
        }
    }
}
