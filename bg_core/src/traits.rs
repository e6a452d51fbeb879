//! Store traits for the bookgraph backend.
//!
//! Each trait is implemented once against the real store in the `storage`
//! crate and once in-memory in the `testing` crate. All methods are
//! suspension points; a store call in one request must never block another
//! request's processing.

use async_trait::async_trait;
use errors::StoreError;

use crate::types::{Book, FollowEdge, NewBook, RatingEdge, Review, User};

/// The durable relational store of record for identity, follow edges and
/// reviews. Source of truth for anything requiring uniqueness constraints
/// or transactional integrity.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert a new user. Duplicate email surfaces as
    /// [`StoreError::UniqueViolation`].
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a follow edge. An existing `(follower, followee)` pair
    /// surfaces as [`StoreError::UniqueViolation`].
    async fn insert_follow(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<FollowEdge, StoreError>;

    async fn follow_exists(&self, follower_id: i64, followee_id: i64)
    -> Result<bool, StoreError>;

    async fn insert_review(
        &self,
        user_id: i64,
        book_id: &str,
        rating: i32,
        review_text: Option<&str>,
    ) -> Result<Review, StoreError>;

    /// Reviews for one book, newest first.
    async fn reviews_for_book(
        &self,
        book_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, StoreError>;
}

/// The document store owning book metadata, with a unique index on ISBN.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a book with a store-generated identifier. Duplicate ISBN
    /// surfaces as [`StoreError::UniqueViolation`].
    async fn insert_book(&self, book: &NewBook) -> Result<Book, StoreError>;

    /// `Ok(None)` for both an unknown and a syntactically invalid id.
    async fn get_book(&self, book_id: &str) -> Result<Option<Book>, StoreError>;

    async fn list_books(&self, limit: i64, offset: i64) -> Result<Vec<Book>, StoreError>;
}

/// The key-value store used for active-session tracking and rate-limit
/// counters.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Store `session:<token> -> user_id` with the given TTL. Sessions die
    /// at TTL expiry; there is no explicit logout path.
    async fn put_session(
        &self,
        token: &str,
        user_id: i64,
        ttl_seconds: u64,
    ) -> Result<(), StoreError>;

    /// Liveness check. The cache is authoritative: a missing key means the
    /// session is expired or revoked regardless of token validity.
    async fn session_exists(&self, token: &str) -> Result<bool, StoreError>;

    /// Atomically increment the counter for `key` and, only when absent,
    /// set its expiry to `window_seconds`. Returns the post-increment
    /// count. The increment and conditional expiry execute as one unit so
    /// concurrent bursts from the same client cannot race.
    async fn incr_fixed_window(&self, key: &str, window_seconds: u64)
    -> Result<u64, StoreError>;
}

/// The property-graph store holding derived `User`/`Book` nodes and
/// `FOLLOWS`/`RATED` edges.
///
/// All writes use merge semantics and match nodes by the `id` property,
/// intentional denormalization keyed on the durable store's identifiers,
/// never on store-native node identity. Reads are single-hop, batched
/// primitives; multi-hop traversal and ranking live in the recommendation
/// engine.
#[async_trait]
pub trait SocialGraphStore: Send + Sync {
    /// Create the `User` node for a freshly registered user if absent.
    async fn merge_user(&self, user_id: i64) -> Result<(), StoreError>;

    /// Merge a directed `FOLLOWS` edge between two `User` nodes matched by
    /// id property. Never duplicates.
    async fn merge_follows(&self, follower_id: i64, followee_id: i64) -> Result<(), StoreError>;

    /// Merge a `RATED` edge, creating the `Book` node on demand. On create
    /// sets `rating` and `created_at`; on match updates `rating` and sets
    /// `updated_at` instead.
    async fn merge_rating(&self, user_id: i64, book_id: &str, rating: i32)
    -> Result<(), StoreError>;

    /// Users directly followed by `user_id`, in traversal order.
    async fn followees(&self, user_id: i64) -> Result<Vec<i64>, StoreError>;

    /// Distinct users followed by any of `user_ids`, in traversal order.
    async fn followees_of_many(&self, user_ids: &[i64]) -> Result<Vec<i64>, StoreError>;

    /// `RATED` edges with `rating >= min_rating` outgoing from any of
    /// `user_ids`.
    async fn high_ratings_by(
        &self,
        user_ids: &[i64],
        min_rating: i32,
    ) -> Result<Vec<RatingEdge>, StoreError>;

    /// Ids of books `user_id` has rated, any rating.
    async fn rated_book_ids(&self, user_id: i64) -> Result<Vec<String>, StoreError>;
}
