//! Filter-Query Builder: turns optional per-field filters into a single
//! "every provided filter matches, case-insensitive substring" predicate.

use sqlx::{Postgres, QueryBuilder};

use crate::models::book::Book;

/// Optional list filters as received from the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookCriteria {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
}

/// Columns a filter clause can target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Title,
    Author,
    Category,
    Isbn,
}

impl FilterField {
    pub fn column(&self) -> &'static str {
        match self {
            FilterField::Title => "title",
            FilterField::Author => "author",
            FilterField::Category => "category",
            FilterField::Isbn => "isbn",
        }
    }

    fn value_of<'a>(&self, book: &'a Book) -> Option<&'a str> {
        match self {
            FilterField::Title => Some(&book.title),
            FilterField::Author => Some(&book.author),
            FilterField::Category => book.category.as_deref(),
            FilterField::Isbn => Some(&book.isbn),
        }
    }
}

/// One "field contains needle, ignoring case" clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainsClause {
    pub field: FilterField,
    /// Lowercased search term
    pub needle: String,
}

impl ContainsClause {
    fn matches(&self, book: &Book) -> bool {
        self.field
            .value_of(book)
            .map_or(false, |value| value.to_lowercase().contains(&self.needle))
    }

    /// ILIKE pattern with wildcard characters in the needle escaped
    fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.needle.len() + 2);
        pattern.push('%');
        for c in self.needle.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

/// Conjunction of contains clauses; no clauses matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    clauses: Vec<ContainsClause>,
}

impl BookFilter {
    /// Build the predicate, skipping unset and blank filters
    pub fn from_criteria(criteria: &BookCriteria) -> Self {
        let candidates = [
            (FilterField::Title, &criteria.title),
            (FilterField::Author, &criteria.author),
            (FilterField::Category, &criteria.category),
            (FilterField::Isbn, &criteria.isbn),
        ];

        let clauses = candidates
            .into_iter()
            .filter_map(|(field, value)| {
                let value = value.as_deref()?;
                if value.trim().is_empty() {
                    return None;
                }
                Some(ContainsClause {
                    field,
                    needle: value.to_lowercase(),
                })
            })
            .collect();

        Self { clauses }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.clauses.iter().all(|clause| clause.matches(book))
    }

    /// Append ` WHERE ...` (or nothing) to a query under construction
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        if self.is_unrestricted() {
            return;
        }
        builder.push(" WHERE ");
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                builder.push(" AND ");
            }
            builder
                .push(clause.field.column())
                .push(" ILIKE ")
                .push_bind(clause.like_pattern())
                .push(" ESCAPE '\\'");
        }
    }
}
