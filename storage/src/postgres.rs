//! Relational adapter for the durable store of record.
//!
//! Unique-constraint violations are detected through the driver's
//! structured error signal (`DatabaseError::is_unique_violation`), never by
//! matching error-message text.

use async_trait::async_trait;
use bg_core::traits::IdentityStore;
use bg_core::types::{FollowEdge, Review, User};
use errors::StoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

pub struct PostgresIdentityStore {
    pool: PgPool,
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation {
                backend: "Postgres".to_string(),
                constraint: db_err.constraint().unwrap_or("unique").to_string(),
            };
        }
    }
    StoreError::Query {
        backend: "Postgres".to_string(),
        reason: err.to_string(),
    }
}

impl PostgresIdentityStore {
    pub async fn new(connection_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_url)
            .await
            .map_err(|e| StoreError::Connection {
                backend: "Postgres".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS follows (
                follower_id BIGINT NOT NULL,
                followee_id BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (follower_id, followee_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS reviews (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                book_id TEXT NOT NULL,
                rating INT NOT NULL CHECK (rating BETWEEN 1 AND 5),
                review_text TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_book_id ON reviews(book_id)")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

fn row_to_review(row: &sqlx::postgres::PgRow) -> Review {
    Review {
        id: row.get("id"),
        user_id: row.get("user_id"),
        book_id: row.get("book_id"),
        rating: row.get("rating"),
        review_text: row.get("review_text"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let row = sqlx::query(
            "INSERT INTO users (username, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row_to_user(&row))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.as_ref().map(row_to_user))
    }

    async fn insert_follow(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<FollowEdge, StoreError> {
        let row = sqlx::query(
            "INSERT INTO follows (follower_id, followee_id)
             VALUES ($1, $2)
             RETURNING follower_id, followee_id, created_at",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(FollowEdge {
            follower_id: row.get("follower_id"),
            followee_id: row.get("followee_id"),
            created_at: Some(row.get("created_at")),
        })
    }

    async fn follow_exists(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<bool, StoreError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.is_some())
    }

    async fn insert_review(
        &self,
        user_id: i64,
        book_id: &str,
        rating: i32,
        review_text: Option<&str>,
    ) -> Result<Review, StoreError> {
        let row = sqlx::query(
            "INSERT INTO reviews (user_id, book_id, rating, review_text)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, book_id, rating, review_text, created_at",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(rating)
        .bind(review_text)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row_to_review(&row))
    }

    async fn reviews_for_book(
        &self,
        book_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, book_id, rating, review_text, created_at
             FROM reviews
             WHERE book_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(book_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.iter().map(row_to_review).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlx_errors_without_db_detail_map_to_query() {
        let err = map_sqlx_error(sqlx::Error::Configuration("bad dsn".into()));
        match err {
            StoreError::Query { backend, reason } => {
                assert_eq!(backend, "Postgres");
                assert!(reason.contains("bad dsn"));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn identity_store_trait_is_object_safe() {
        fn assert_dyn(_: &dyn IdentityStore) {}
        let _ = assert_dyn;
    }
}
