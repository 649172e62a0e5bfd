//! Pagination and sorting types shared by the list endpoint and the stores

use std::str::FromStr;

use serde::Serialize;
use utoipa::ToSchema;

use super::book::Book;

/// Sortable book columns, named as in the JSON representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Title,
    Author,
    Isbn,
    PublicationDate,
    Category,
    Publisher,
    Price,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Database column backing this field
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::Isbn => "isbn",
            SortField::PublicationDate => "publication_date",
            SortField::Category => "category",
            SortField::Publisher => "publisher",
            SortField::Price => "price",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "title" => Ok(SortField::Title),
            "author" => Ok(SortField::Author),
            "isbn" => Ok(SortField::Isbn),
            "publicationDate" => Ok(SortField::PublicationDate),
            "category" => Ok(SortField::Category),
            "publisher" => Ok(SortField::Publisher),
            "price" => Ok(SortField::Price),
            "createdAt" => Ok(SortField::CreatedAt),
            "updatedAt" => Ok(SortField::UpdatedAt),
            other => Err(format!("Unknown sort field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// "asc" in any case means ascending, anything else descending
    pub fn parse_lenient(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Zero-based page index, page size (>= 1) and sort specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: Sort,
}

impl PageRequest {
    pub fn new(page: u32, size: u32, sort: Sort) -> Self {
        Self {
            page,
            size: size.max(1),
            sort,
        }
    }

    pub fn offset(&self) -> i64 {
        self.page as i64 * self.size as i64
    }

    pub fn limit(&self) -> i64 {
        self.size as i64
    }
}

/// A bounded slice of matching records plus total-count metadata
#[derive(Debug, Serialize, ToSchema)]
#[aliases(BookPage = Page<Book>)]
#[serde(rename_all = "camelCase")]
pub struct Page<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub content: Vec<T>,
    /// Zero-based page index
    pub number: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
    pub number_of_elements: usize,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
}

impl<T> Page<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: i64) -> Self {
        let size = request.size.max(1) as i64;
        let total_pages = (total_elements + size - 1) / size;
        let number_of_elements = content.len();
        Self {
            number: request.page,
            size: request.size,
            total_elements,
            total_pages,
            number_of_elements,
            first: request.page == 0,
            last: request.page as i64 + 1 >= total_pages,
            empty: content.is_empty(),
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn books(count: i64) -> Vec<Book> {
        let now = Utc::now();
        (1..=count)
            .map(|id| Book {
                id,
                title: format!("Book {}", id),
                author: "Author".to_string(),
                isbn: format!("{:013}", id),
                publication_date: None,
                category: None,
                description: None,
                publisher: None,
                price: None,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    #[test]
    fn test_page_math() {
        let request = PageRequest::new(0, 2, Sort::default());
        let page = Page::new(books(2), &request, 3);
        assert_eq!(page.total_pages, 2);
        assert!(page.first);
        assert!(!page.last);
        assert_eq!(page.number_of_elements, 2);

        let request = PageRequest::new(1, 2, Sort::default());
        let page = Page::new(books(1), &request, 3);
        assert!(page.last);
        assert_eq!(request.offset(), 2);
    }

    #[test]
    fn test_empty_result() {
        let request = PageRequest::new(0, 10, Sort::default());
        let page = Page::new(books(0), &request, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.empty);
        assert!(page.last);
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("publicationDate".parse::<SortField>(), Ok(SortField::PublicationDate));
        assert!("publication_date".parse::<SortField>().is_err());
        assert_eq!(SortDirection::parse_lenient("ASC"), SortDirection::Asc);
        assert_eq!(SortDirection::parse_lenient("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::parse_lenient("sideways"), SortDirection::Desc);
    }
}
