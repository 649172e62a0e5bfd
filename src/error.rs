//! Error types for the book service

use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::repository::StoreError;

/// Stable numeric error codes exposed in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    DbFailure = 3,
    NoSuchBook = 5,
    Duplicate = 8,
    BadValue = 18,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Input violates one or more field constraints (field name -> reason)
    #[error("Validation failed: {0:?}")]
    Validation(BTreeMap<String, String>),

    #[error("Book not found with ID: {0}")]
    BookNotFound(i64),

    /// ISBN already used by a different record
    #[error("{message}")]
    Conflict { isbn: String, message: String },

    #[error("Storage failure: {0}")]
    Storage(StoreError),
}

impl AppError {
    pub fn isbn_taken(isbn: &str) -> Self {
        AppError::Conflict {
            isbn: isbn.to_string(),
            message: format!("Book with ISBN {} already exists", isbn),
        }
    }

    pub fn isbn_taken_by_another(isbn: &str) -> Self {
        AppError::Conflict {
            isbn: isbn.to_string(),
            message: format!("Another book with ISBN {} already exists", isbn),
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), message.into());
        AppError::Validation(errors)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            // The storage-level uniqueness constraint fired after the pre-check passed
            StoreError::DuplicateIsbn(isbn) => AppError::isbn_taken(&isbn),
            StoreError::Missing(id) => AppError::BookNotFound(id),
            other => AppError::Storage(other),
        }
    }
}

/// Attribute a deserializer message of the form "context: field: reason" to
/// `field`, or to `fallback` when no field path is present
fn malformed_input(text: &str, fallback: &str) -> AppError {
    let detail = text.split_once(": ").map_or(text, |(_, rest)| rest);
    match detail.split_once(": ") {
        Some((path, reason)) if is_field_path(path) => AppError::invalid_field(path, reason),
        _ => AppError::invalid_field(fallback, detail),
    }
}

fn is_field_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '[' | ']'))
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        malformed_input(&rejection.body_text(), "body")
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        malformed_input(&rejection.body_text(), "query")
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                let message = errs.first().map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })?;
                Some((field.to_string(), message))
            })
            .collect();
        AppError::Validation(fields)
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Field name -> message, present for validation failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, errors) = match self {
            AppError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::BadValue,
                "Validation failed".to_string(),
                Some(fields),
            ),
            AppError::BookNotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorCode::NoSuchBook,
                format!("Book not found with ID: {}", id),
                None,
            ),
            AppError::Conflict { message, .. } => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, message, None)
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            errors,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
