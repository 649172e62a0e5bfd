//! In-process Record Store, used for local runs and tests

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{BookFilter, BookStore, StoreError, StoreResult};
use crate::models::{
    book::{Book, BookDraft},
    page::{PageRequest, SortDirection, SortField},
};

#[derive(Default)]
struct State {
    next_id: i64,
    /// Keyed by id, so iteration follows insertion order
    books: BTreeMap<i64, Book>,
    /// isbn -> id; the uniqueness constraint
    isbn_index: HashMap<String, i64>,
}

#[derive(Default)]
pub struct MemoryBookStore {
    state: RwLock<State>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Nulls sort after every value, as PostgreSQL does by default
fn cmp_nullable<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(&a, &b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

/// Case-folded comparison, close to a linguistic collation; exact bytes break ties
fn cmp_text(a: &&str, b: &&str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn cmp_by(field: SortField, a: &Book, b: &Book) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Title => cmp_text(&a.title.as_str(), &b.title.as_str()),
        SortField::Author => cmp_text(&a.author.as_str(), &b.author.as_str()),
        SortField::Isbn => a.isbn.cmp(&b.isbn),
        SortField::PublicationDate => {
            cmp_nullable(a.publication_date, b.publication_date, Ord::cmp)
        }
        SortField::Category => cmp_nullable(a.category.as_deref(), b.category.as_deref(), cmp_text),
        SortField::Publisher => {
            cmp_nullable(a.publisher.as_deref(), b.publisher.as_deref(), cmp_text)
        }
        SortField::Price => cmp_nullable(a.price, b.price, Ord::cmp),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn insert(&self, draft: &BookDraft) -> StoreResult<Book> {
        let mut state = self.state.write().await;
        if state.isbn_index.contains_key(&draft.isbn) {
            return Err(StoreError::DuplicateIsbn(draft.isbn.clone()));
        }

        state.next_id += 1;
        let now = Utc::now();
        let book = Book {
            id: state.next_id,
            title: draft.title.clone(),
            author: draft.author.clone(),
            isbn: draft.isbn.clone(),
            publication_date: draft.publication_date,
            category: draft.category.clone(),
            description: draft.description.clone(),
            publisher: draft.publisher.clone(),
            price: draft.price,
            created_at: now,
            updated_at: now,
        };

        state.isbn_index.insert(book.isbn.clone(), book.id);
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Book>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn exists_by_id(&self, id: i64) -> StoreResult<bool> {
        Ok(self.state.read().await.books.contains_key(&id))
    }

    async fn exists_by_isbn(&self, isbn: &str) -> StoreResult<bool> {
        Ok(self.state.read().await.isbn_index.contains_key(isbn))
    }

    async fn update(&self, book: &Book) -> StoreResult<Book> {
        let mut state = self.state.write().await;
        let (old_isbn, created_at) = match state.books.get(&book.id) {
            Some(current) => (current.isbn.clone(), current.created_at),
            None => return Err(StoreError::Missing(book.id)),
        };

        if let Some(&owner) = state.isbn_index.get(&book.isbn) {
            if owner != book.id {
                return Err(StoreError::DuplicateIsbn(book.isbn.clone()));
            }
        }

        let mut stored = book.clone();
        stored.created_at = created_at;
        stored.updated_at = Utc::now().max(created_at);

        state.isbn_index.remove(&old_isbn);
        state.isbn_index.insert(stored.isbn.clone(), stored.id);
        state.books.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let book = state.books.remove(&id).ok_or(StoreError::Missing(id))?;
        state.isbn_index.remove(&book.isbn);
        Ok(())
    }

    async fn query(&self, filter: &BookFilter, page: &PageRequest) -> StoreResult<(Vec<Book>, i64)> {
        let state = self.state.read().await;
        let mut matching: Vec<&Book> = state
            .books
            .values()
            .filter(|book| filter.matches(book))
            .collect();

        // Stable sort keeps id order among equal keys in both directions
        matching.sort_by(|a, b| {
            let ordering = cmp_by(page.sort.field, a, b);
            match page.sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = matching.len() as i64;
        let books = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();

        Ok((books, total))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
