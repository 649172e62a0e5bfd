//! PostgreSQL Record Store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{BookFilter, BookStore, StoreError, StoreResult};
use crate::models::{
    book::{Book, BookDraft},
    page::PageRequest,
};

/// Map a write failure; `isbn` is the only unique column besides the key
fn write_error(err: sqlx::Error, isbn: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::DuplicateIsbn(isbn.to_string());
        }
    }
    StoreError::Database(err)
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn insert(&self, draft: &BookDraft) -> StoreResult<Book> {
        let now = Utc::now();

        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, author, isbn, publication_date, category,
                description, publisher, price, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(&draft.isbn)
        .bind(draft.publication_date)
        .bind(&draft.category)
        .bind(&draft.description)
        .bind(&draft.publisher)
        .bind(draft.price)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, &draft.isbn))
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn exists_by_id(&self, id: i64) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn exists_by_isbn(&self, isbn: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn update(&self, book: &Book) -> StoreResult<Book> {
        let now = Utc::now();

        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = $1,
                author = $2,
                isbn = $3,
                publication_date = $4,
                category = $5,
                description = $6,
                publisher = $7,
                price = $8,
                updated_at = GREATEST($9, created_at)
            WHERE id = $10
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.publication_date)
        .bind(&book.category)
        .bind(&book.description)
        .bind(&book.publisher)
        .bind(book.price)
        .bind(now)
        .bind(book.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, &book.isbn))?
        .ok_or(StoreError::Missing(book.id))
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(id));
        }
        Ok(())
    }

    async fn query(&self, filter: &BookFilter, page: &PageRequest) -> StoreResult<(Vec<Book>, i64)> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books");
        filter.push_where(&mut count_query);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select_query = QueryBuilder::<Postgres>::new("SELECT * FROM books");
        filter.push_where(&mut select_query);
        // Sort column comes from a closed enum; ties fall back to insertion order
        select_query
            .push(" ORDER BY ")
            .push(page.sort.field.column())
            .push(" ")
            .push(page.sort.direction.as_sql())
            .push(", id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let books = select_query
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
