//! Book record model, request input and the validation gate in front of the Book Manager.

use std::borrow::Cow;

use chrono::{DateTime, Local, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::AppResult;

static ISBN_13: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{13}$").unwrap());

const PRICE_MAX_INTEGER_DIGITS: u32 = 10;
const PRICE_MAX_FRACTION_DIGITS: u32 = 2;

/// Persisted book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Effective Java")]
    pub title: String,
    #[schema(example = "Joshua Bloch")]
    pub author: String,
    #[schema(example = "9780134685991")]
    pub isbn: String,
    pub publication_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>, example = 39.99)]
    pub price: Option<Decimal>,
    /// Instant the record was stored (RFC 3339, UTC)
    pub created_at: DateTime<Utc>,
    /// Instant of the last write (RFC 3339, UTC), never before `createdAt`
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Full replace of every mutable field; `id` and `created_at` are kept.
    /// Optional fields absent from the draft become empty.
    pub fn overwrite_with(&mut self, draft: BookDraft) {
        self.title = draft.title;
        self.author = draft.author;
        self.isbn = draft.isbn;
        self.publication_date = draft.publication_date;
        self.category = draft.category;
        self.description = draft.description;
        self.publisher = draft.publisher;
        self.price = draft.price;
    }
}

/// Create or update request body
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    #[schema(example = "Effective Java")]
    pub title: Option<String>,
    #[schema(example = "Joshua Bloch")]
    pub author: Option<String>,
    /// Exactly 13 digits, unique across all books
    #[schema(example = "9780134685991")]
    pub isbn: Option<String>,
    /// YYYY-MM-DD, not in the future
    #[schema(example = "2018-01-06")]
    pub publication_date: Option<NaiveDate>,
    #[schema(example = "Programming")]
    pub category: Option<String>,
    pub description: Option<String>,
    #[schema(example = "Addison-Wesley")]
    pub publisher: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>, example = 39.99)]
    pub price: Option<Decimal>,
}

/// A request that passed validation; the only input the Book Manager accepts
#[derive(Debug, Clone, PartialEq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub price: Option<Decimal>,
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Number of digits left of the decimal point
fn integer_digits(value: Decimal) -> u32 {
    let integral = value.abs().trunc().normalize();
    if integral.is_zero() {
        0
    } else {
        integral.to_string().len() as u32
    }
}

impl BookRequest {
    /// Collect every field violation, judging `publicationDate` against `today`.
    pub fn validate_as_of(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if is_blank(&self.title) {
            errors.add("title", field_error("required", "Title is required"));
        }
        if is_blank(&self.author) {
            errors.add("author", field_error("required", "Author is required"));
        }
        match self.isbn.as_deref() {
            None => errors.add("isbn", field_error("required", "ISBN is required")),
            Some(isbn) => {
                if isbn.trim().is_empty() {
                    errors.add("isbn", field_error("required", "ISBN is required"));
                }
                if !ISBN_13.is_match(isbn) {
                    errors.add("isbn", field_error("isbn", "ISBN must be a 13-digit number"));
                }
            }
        }
        if let Some(date) = self.publication_date {
            if date > today {
                errors.add(
                    "publicationDate",
                    field_error("past_or_present", "Publication date cannot be in the future"),
                );
            }
        }
        if let Some(price) = self.price {
            if price <= Decimal::ZERO {
                errors.add(
                    "price",
                    field_error("positive", "Price must be greater than zero"),
                );
            }
            let normalized = price.normalize();
            if integer_digits(normalized) > PRICE_MAX_INTEGER_DIGITS
                || normalized.scale() > PRICE_MAX_FRACTION_DIGITS
            {
                errors.add(
                    "price",
                    field_error(
                        "digits",
                        "numeric value out of bounds (<10 digits>.<2 digits> expected)",
                    ),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Run the validation gate and produce a draft for the Book Manager
    pub fn validated(self) -> AppResult<BookDraft> {
        self.validate()?;
        Ok(BookDraft {
            title: self.title.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            isbn: self.isbn.unwrap_or_default(),
            publication_date: self.publication_date,
            category: self.category,
            description: self.description,
            publisher: self.publisher,
            price: self.price,
        })
    }
}

impl Validate for BookRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.validate_as_of(Local::now().date_naive())
    }
}
