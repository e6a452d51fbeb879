//! Book catalog operations with domain-level error mapping.

use std::sync::Arc;

use bg_core::traits::CatalogStore;
use bg_core::types::{Book, NewBook};
use errors::{CoreError, StoreError};

pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Insert a book. A duplicate ISBN is a conflict detected through the
    /// store's structured constraint signal.
    pub async fn create_book(&self, book: &NewBook) -> Result<Book, CoreError> {
        if book.title.trim().is_empty() || book.title.len() > 255 {
            return Err(CoreError::invalid_argument(
                "title must be between 1 and 255 characters",
            ));
        }
        if book.author.trim().is_empty() || book.author.len() > 100 {
            return Err(CoreError::invalid_argument(
                "author must be between 1 and 100 characters",
            ));
        }
        if book.isbn.trim().is_empty() || book.isbn.len() > 13 {
            return Err(CoreError::invalid_argument(
                "isbn must be between 1 and 13 characters",
            ));
        }
        if book.publication_year < 1900 {
            return Err(CoreError::invalid_argument(
                "publication year must be 1900 or later",
            ));
        }

        self.catalog.insert_book(book).await.map_err(|e| match e {
            StoreError::UniqueViolation { .. } => {
                CoreError::conflict("a book with this ISBN already exists")
            }
            other => {
                tracing::error!(error = %other, "catalog insert failed");
                CoreError::internal(other.to_string())
            }
        })
    }

    pub async fn get_book(&self, book_id: &str) -> Result<Book, CoreError> {
        let book = self
            .catalog
            .get_book(book_id)
            .await
            .map_err(|e| CoreError::internal(e.to_string()))?;
        book.ok_or_else(|| CoreError::not_found(format!("book {book_id}")))
    }

    pub async fn list_books(&self, limit: i64, offset: i64) -> Result<Vec<Book>, CoreError> {
        self.catalog
            .list_books(limit, offset)
            .await
            .map_err(|e| CoreError::internal(e.to_string()))
    }
}
