//! Document-store adapter for the book catalog.
//!
//! Books are keyed by a store-generated `ObjectId` exposed to the rest of
//! the system as its hex string form. ISBN uniqueness is enforced by a
//! unique index; a duplicate insert surfaces as the store's structured
//! duplicate-key code, not as error-message text.

use async_trait::async_trait;
use bg_core::traits::CatalogStore;
use bg_core::types::{Book, NewBook};
use errors::StoreError;
use futures_util::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};

/// MongoDB duplicate-key error code.
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Serialize, Deserialize)]
struct BookDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    title: String,
    author: String,
    isbn: String,
    publication_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover_url: Option<String>,
}

impl BookDocument {
    fn from_new(book: &NewBook) -> Self {
        BookDocument {
            id: None,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            publication_year: book.publication_year,
            cover_url: book.cover_url.clone(),
        }
    }

    fn into_book(self) -> Option<Book> {
        let id = self.id?;
        Some(Book {
            id: id.to_hex(),
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            publication_year: self.publication_year,
            cover_url: self.cover_url,
        })
    }
}

fn map_mongo_error(err: mongodb::error::Error) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(ref write_err)) = *err.kind {
        if write_err.code == DUPLICATE_KEY {
            return StoreError::UniqueViolation {
                backend: "MongoDB".to_string(),
                constraint: "isbn".to_string(),
            };
        }
    }
    StoreError::Query {
        backend: "MongoDB".to_string(),
        reason: err.to_string(),
    }
}

pub struct MongoCatalogStore {
    collection: Collection<BookDocument>,
}

impl MongoCatalogStore {
    pub async fn new(connection_uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(connection_uri)
            .await
            .map_err(|e| StoreError::Connection {
                backend: "MongoDB".to_string(),
                reason: e.to_string(),
            })?;

        client
            .database(database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection {
                backend: "MongoDB".to_string(),
                reason: e.to_string(),
            })?;

        let collection = client.database(database).collection("books");
        Ok(Self { collection })
    }

    /// Create the unique ISBN index. Idempotent.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "isbn": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection
            .create_index(index)
            .await
            .map_err(map_mongo_error)?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MongoCatalogStore {
    async fn insert_book(&self, book: &NewBook) -> Result<Book, StoreError> {
        let document = BookDocument::from_new(book);
        let result = self
            .collection
            .insert_one(&document)
            .await
            .map_err(map_mongo_error)?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Serialization {
                reason: "inserted_id was not an ObjectId".to_string(),
            })?;

        Ok(Book {
            id: id.to_hex(),
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            publication_year: book.publication_year,
            cover_url: book.cover_url.clone(),
        })
    }

    async fn get_book(&self, book_id: &str) -> Result<Option<Book>, StoreError> {
        // A malformed id can never match a stored document.
        let Ok(oid) = ObjectId::parse_str(book_id) else {
            return Ok(None);
        };

        let document = self
            .collection
            .find_one(doc! { "_id": oid })
            .await
            .map_err(map_mongo_error)?;

        Ok(document.and_then(BookDocument::into_book))
    }

    async fn list_books(&self, limit: i64, offset: i64) -> Result<Vec<Book>, StoreError> {
        let mut cursor = self
            .collection
            .find(doc! {})
            .limit(limit)
            .skip(offset.max(0) as u64)
            .await
            .map_err(map_mongo_error)?;

        let mut books = Vec::new();
        while let Some(document) = cursor.try_next().await.map_err(map_mongo_error)? {
            if let Some(book) = document.into_book() {
                books.push(book);
            }
        }
        Ok(books)
    }
}
