//! Book endpoints

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::{ValidJson, ValidQuery};
use crate::{
    config::PaginationConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, BookRequest},
        page::{Page, PageRequest, Sort, SortDirection, SortField},
    },
    repository::BookCriteria,
};

/// Filters, pagination and sorting for the book list
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookListQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
    /// Case-insensitive substring of the category
    pub category: Option<String>,
    /// Substring of the ISBN
    pub isbn: Option<String>,
    /// Page number, 0-indexed (default: 0)
    pub page: Option<i64>,
    /// Records per page (default from configuration)
    pub size: Option<i64>,
    /// Field to sort by (default: id)
    pub sort_by: Option<String>,
    /// "asc" or "desc" (default: asc)
    pub sort_dir: Option<String>,
}

impl BookListQuery {
    pub fn criteria(&self) -> BookCriteria {
        BookCriteria {
            title: self.title.clone(),
            author: self.author.clone(),
            category: self.category.clone(),
            isbn: self.isbn.clone(),
        }
    }

    /// Resolve pagination parameters, reporting every bad one at once
    pub fn page_request(&self, pagination: &PaginationConfig) -> AppResult<PageRequest> {
        let mut errors = BTreeMap::new();

        let page = self.page.unwrap_or(0);
        if page < 0 {
            errors.insert("page".to_string(), "Page index must not be negative".to_string());
        } else if page > u32::MAX as i64 {
            errors.insert("page".to_string(), "Page index is too large".to_string());
        }

        let size = self.size.unwrap_or(pagination.default_page_size as i64);
        if size < 1 {
            errors.insert("size".to_string(), "Page size must be at least 1".to_string());
        }

        let field = match self.sort_by.as_deref().map(str::parse::<SortField>) {
            None => SortField::default(),
            Some(Ok(field)) => field,
            Some(Err(message)) => {
                errors.insert("sortBy".to_string(), message);
                SortField::default()
            }
        };

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let direction = self
            .sort_dir
            .as_deref()
            .map(SortDirection::parse_lenient)
            .unwrap_or_default();
        let size = size.min(pagination.max_page_size.max(1) as i64) as u32;

        Ok(PageRequest::new(page as u32, size, Sort { field, direction }))
    }
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = BookRequest,
    responses(
        (status = 201, description = "Book created successfully", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Book with the provided ISBN already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    ValidJson(request): ValidJson<BookRequest>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let draft = request.validated()?;
    let book = state.services.books.create(draft).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book retrieved successfully", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Book>> {
    let book = state.services.books.get_by_id(id).await?;
    Ok(Json(book))
}

/// Replace all mutable fields of an existing book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    request_body = BookRequest,
    responses(
        (status = 200, description = "Book updated successfully", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Another book with the provided ISBN already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
    ValidJson(request): ValidJson<BookRequest>,
) -> AppResult<Json<Book>> {
    let draft = request.validated()?;
    let book = state.services.books.update(id, draft).await?;
    Ok(Json(book))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.books.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List books with optional filters, pagination and sorting
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookListQuery),
    responses(
        (status = 200, description = "Page of books", body = crate::models::page::BookPage),
        (status = 400, description = "Invalid pagination parameters", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    ValidQuery(query): ValidQuery<BookListQuery>,
) -> AppResult<Json<Page<Book>>> {
    let page = query.page_request(&state.config.pagination)?;
    let books = state.services.books.list(&query.criteria(), &page).await?;
    Ok(Json(books))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let request = BookListQuery::default()
            .page_request(&PaginationConfig::default())
            .unwrap();
        assert_eq!(request.page, 0);
        assert_eq!(request.size, 10);
        assert_eq!(request.sort, Sort::default());
    }

    #[test]
    fn test_page_size_is_clamped() {
        let query = BookListQuery {
            size: Some(5000),
            sort_by: Some("title".to_string()),
            sort_dir: Some("DESC".to_string()),
            ..Default::default()
        };
        let request = query.page_request(&PaginationConfig::default()).unwrap();
        assert_eq!(request.size, 100);
        assert_eq!(request.sort.field, SortField::Title);
        assert_eq!(request.sort.direction, SortDirection::Desc);
    }

    #[test]
    fn test_bad_parameters_are_collected() {
        let query = BookListQuery {
            page: Some(-1),
            size: Some(0),
            sort_by: Some("shelf".to_string()),
            ..Default::default()
        };
        match query.page_request(&PaginationConfig::default()) {
            Err(AppError::Validation(fields)) => {
                assert_eq!(fields.len(), 3);
                assert!(fields["sortBy"].contains("shelf"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
