//! Book Manager: uniqueness-checked create/update, lookups, deletion and filtered listing

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookDraft},
        page::{Page, PageRequest},
    },
    repository::{BookCriteria, BookFilter, BookStore},
};

#[derive(Clone)]
pub struct BooksService {
    store: Arc<dyn BookStore>,
}

impl BooksService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// Create a book; its ISBN must not be in use.
    ///
    /// The existence check gives the common case a clean error; a concurrent
    /// insert that slips past it is rejected by the store and surfaces as the
    /// same conflict.
    pub async fn create(&self, draft: BookDraft) -> AppResult<Book> {
        tracing::info!("Attempting to create a new book with ISBN: {}", draft.isbn);

        if self.store.exists_by_isbn(&draft.isbn).await? {
            tracing::warn!("Creation failed: Book with ISBN {} already exists", draft.isbn);
            return Err(AppError::isbn_taken(&draft.isbn));
        }

        let book = self.store.insert(&draft).await?;
        tracing::info!("Book created successfully with ID: {}", book.id);
        Ok(book)
    }

    /// Replace every mutable field of book `id` with `draft`.
    ///
    /// Optional fields missing from the draft are cleared, not preserved.
    pub async fn update(&self, id: i64, draft: BookDraft) -> AppResult<Book> {
        tracing::info!("Attempting to update book with ID: {}", id);

        let mut book = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::BookNotFound(id))?;

        if book.isbn != draft.isbn && self.store.exists_by_isbn(&draft.isbn).await? {
            tracing::warn!(
                "Update failed: Another book with ISBN {} already exists",
                draft.isbn
            );
            return Err(AppError::isbn_taken_by_another(&draft.isbn));
        }

        book.overwrite_with(draft);
        let updated = self.store.update(&book).await.map_err(|e| match AppError::from(e) {
            AppError::Conflict { isbn, .. } => AppError::isbn_taken_by_another(&isbn),
            other => other,
        })?;

        tracing::info!("Book updated successfully with ID: {}", updated.id);
        Ok(updated)
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        tracing::info!("Fetching book with ID: {}", id);

        self.store
            .find_by_id(id)
            .await?
            .ok_or(AppError::BookNotFound(id))
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        tracing::info!("Attempting to delete book with ID: {}", id);

        if !self.store.exists_by_id(id).await? {
            tracing::warn!("Deletion failed: Book not found with ID: {}", id);
            return Err(AppError::BookNotFound(id));
        }

        self.store.delete_by_id(id).await?;
        tracing::info!("Book deleted successfully with ID: {}", id);
        Ok(())
    }

    /// Page of books matching every provided filter
    pub async fn list(&self, criteria: &BookCriteria, page: &PageRequest) -> AppResult<Page<Book>> {
        tracing::info!(
            "Fetching books with filters - Title: {:?}, Author: {:?}, Category: {:?}, ISBN: {:?}",
            criteria.title,
            criteria.author,
            criteria.category,
            criteria.isbn
        );

        let filter = BookFilter::from_criteria(criteria);
        let (books, total) = self.store.query(&filter, page).await?;
        Ok(Page::new(books, page, total))
    }

    /// Readiness probe against the Record Store
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::page::{Sort, SortDirection, SortField};
    use crate::repository::{MemoryBookStore, MockBookStore, StoreError};
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn memory_service() -> BooksService {
        BooksService::new(Arc::new(MemoryBookStore::new()))
    }

    fn draft(title: &str, author: &str, isbn: &str, category: &str) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            publication_date: NaiveDate::from_ymd_opt(1951, 7, 16),
            category: Some(category.to_string()),
            description: Some(format!("About {}", title)),
            publisher: Some("Publisher".to_string()),
            price: Some(Decimal::from_str("6.99").unwrap()),
        }
    }

    fn catcher() -> BookDraft {
        draft("The Catcher in the Rye", "J.D. Salinger", "9780316769488", "Fiction")
    }

    fn mockingbird() -> BookDraft {
        draft("To Kill a Mockingbird", "Harper Lee", "9780061120084", "Fiction")
    }

    fn nineteen_eighty_four() -> BookDraft {
        draft("1984", "George Orwell", "9780451524935", "Dystopian Fiction")
    }

    fn all_books() -> PageRequest {
        PageRequest::new(0, 100, Sort::default())
    }

    fn stored_book(id: i64, isbn: &str) -> Book {
        let now = Utc::now();
        Book {
            id,
            title: "Clean Code".to_string(),
            author: "Robert C. Martin".to_string(),
            isbn: isbn.to_string(),
            publication_date: None,
            category: None,
            description: None,
            publisher: None,
            price: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_equal_record() {
        let service = memory_service();
        let created = service.create(catcher()).await.unwrap();
        let fetched = service.get_by_id(created.id).await.unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.title, "The Catcher in the Rye");
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn test_create_duplicate_isbn_conflicts_without_new_row() {
        let service = memory_service();
        service.create(catcher()).await.unwrap();

        let err = service.create(catcher()).await.unwrap_err();
        match err {
            AppError::Conflict { isbn, message } => {
                assert_eq!(isbn, "9780316769488");
                assert_eq!(message, "Book with ISBN 9780316769488 already exists");
            }
            other => panic!("unexpected {:?}", other),
        }

        let page = service.list(&BookCriteria::default(), &all_books()).await.unwrap();
        assert_eq!(page.total_elements, 1);
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let service = memory_service();
        assert!(matches!(service.get_by_id(99).await, Err(AppError::BookNotFound(99))));
        assert!(matches!(
            service.update(99, catcher()).await,
            Err(AppError::BookNotFound(99))
        ));
        assert!(matches!(service.delete(99).await, Err(AppError::BookNotFound(99))));
    }

    #[tokio::test]
    async fn test_update_with_own_isbn_is_not_a_conflict() {
        let service = memory_service();
        let created = service.create(catcher()).await.unwrap();

        let mut changes = catcher();
        changes.title = "The Catcher in the Rye - Updated".to_string();
        changes.category = Some("Classic Fiction".to_string());
        let updated = service.update(created.id, changes).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "The Catcher in the Rye - Updated");
        assert_eq!(updated.category.as_deref(), Some("Classic Fiction"));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_to_other_records_isbn_conflicts_and_leaves_record() {
        let service = memory_service();
        let a = service.create(catcher()).await.unwrap();
        let b = service.create(mockingbird()).await.unwrap();

        let mut changes = catcher();
        changes.isbn = b.isbn.clone();
        changes.title = "Should not stick".to_string();
        let err = service.update(a.id, changes).await.unwrap_err();
        match err {
            AppError::Conflict { message, .. } => {
                assert_eq!(message, "Another book with ISBN 9780061120084 already exists")
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(service.get_by_id(a.id).await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_update_is_a_full_overwrite() {
        let service = memory_service();
        let created = service.create(catcher()).await.unwrap();
        assert!(created.description.is_some());

        let mut changes = catcher();
        changes.description = None;
        changes.price = None;
        let updated = service.update(created.id, changes).await.unwrap();

        assert_eq!(updated.description, None);
        assert_eq!(updated.price, None);
        assert_eq!(service.get_by_id(created.id).await.unwrap().description, None);
    }

    #[tokio::test]
    async fn test_delete_removes_record_from_get_and_list() {
        let service = memory_service();
        let created = service.create(catcher()).await.unwrap();
        service.create(mockingbird()).await.unwrap();

        service.delete(created.id).await.unwrap();

        assert!(matches!(
            service.get_by_id(created.id).await,
            Err(AppError::BookNotFound(_))
        ));
        let page = service.list(&BookCriteria::default(), &all_books()).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert!(page.content.iter().all(|b| b.id != created.id));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let service = memory_service();
        service.create(catcher()).await.unwrap();
        service.create(mockingbird()).await.unwrap();
        service.create(nineteen_eighty_four()).await.unwrap();

        let by_title = BookCriteria {
            title: Some("1984".to_string()),
            ..Default::default()
        };
        let page = service.list(&by_title, &all_books()).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].title, "1984");

        let by_category = BookCriteria {
            category: Some("Fiction".to_string()),
            ..Default::default()
        };
        let page = service.list(&by_category, &all_books()).await.unwrap();
        assert_eq!(page.total_elements, 3);

        let combined = BookCriteria {
            title: Some("1984".to_string()),
            author: Some("Harper Lee".to_string()),
            ..Default::default()
        };
        let page = service.list(&combined, &all_books()).await.unwrap();
        assert!(page.empty);
    }

    #[tokio::test]
    async fn test_list_pagination_sorted_by_title() {
        let service = memory_service();
        service.create(catcher()).await.unwrap();
        service.create(mockingbird()).await.unwrap();
        service.create(nineteen_eighty_four()).await.unwrap();

        let request = PageRequest::new(
            0,
            2,
            Sort {
                field: SortField::Title,
                direction: SortDirection::Asc,
            },
        );
        let page = service.list(&BookCriteria::default(), &request).await.unwrap();

        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
        let titles: Vec<_> = page.content.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["1984", "The Catcher in the Rye"]);
    }

    #[tokio::test]
    async fn test_create_storage_failure_propagates() {
        let mut store = MockBookStore::new();
        store.expect_exists_by_isbn().returning(|_| Ok(false));
        store
            .expect_insert()
            .returning(|_| Err(StoreError::Database(sqlx::Error::PoolTimedOut)));

        let service = BooksService::new(Arc::new(store));
        let err = service.create(catcher()).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_create_race_on_isbn_becomes_conflict() {
        let mut store = MockBookStore::new();
        // Pre-check passes, then a concurrent insert wins at the constraint
        store.expect_exists_by_isbn().returning(|_| Ok(false));
        store
            .expect_insert()
            .returning(|d| Err(StoreError::DuplicateIsbn(d.isbn.clone())));

        let service = BooksService::new(Arc::new(store));
        let err = service.create(catcher()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { isbn, .. } if isbn == "9780316769488"));
    }

    #[tokio::test]
    async fn test_update_race_on_isbn_becomes_conflict() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_id()
            .returning(|id| Ok(Some(stored_book(id, "9780132350884"))));
        store.expect_exists_by_isbn().returning(|_| Ok(false));
        store
            .expect_update()
            .returning(|b| Err(StoreError::DuplicateIsbn(b.isbn.clone())));

        let service = BooksService::new(Arc::new(store));
        let err = service.update(1, catcher()).await.unwrap_err();
        match err {
            AppError::Conflict { message, .. } => {
                assert_eq!(message, "Another book with ISBN 9780316769488 already exists")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_skips_isbn_lookup_when_unchanged() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_id()
            .returning(|id| Ok(Some(stored_book(id, "9780316769488"))));
        store.expect_exists_by_isbn().never();
        store.expect_update().returning(|b| Ok(b.clone()));

        let service = BooksService::new(Arc::new(store));
        let updated = service.update(1, catcher()).await.unwrap();
        assert_eq!(updated.title, "The Catcher in the Rye");
    }

    #[tokio::test]
    async fn test_update_storage_failure_propagates() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_id()
            .returning(|id| Ok(Some(stored_book(id, "9780316769488"))));
        store
            .expect_update()
            .returning(|_| Err(StoreError::Database(sqlx::Error::PoolClosed)));

        let service = BooksService::new(Arc::new(store));
        let err = service.update(1, catcher()).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn test_delete_checks_existence_first() {
        let mut store = MockBookStore::new();
        store.expect_exists_by_id().returning(|_| Ok(false));
        store.expect_delete_by_id().never();

        let service = BooksService::new(Arc::new(store));
        assert!(matches!(service.delete(5).await, Err(AppError::BookNotFound(5))));
    }
}
