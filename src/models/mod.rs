//! Data models for the book service

pub mod book;
pub mod page;

// Re-export commonly used types
pub use book::{Book, BookDraft, BookRequest};
pub use page::{Page, PageRequest, Sort, SortDirection, SortField};
