//! Domain types for the bookgraph backend.
//!
//! Ownership: the relational store is authoritative for identity, follow
//! edges and reviews. The catalog store owns book metadata. The graph store
//! holds a derived, eventually consistent mirror (`User`/`Book` nodes,
//! `FOLLOWS`/`RATED` relationships) used only for traversal queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user, as stored in the relational store.
///
/// Mirrored in the graph store as a `User` node keyed by the same integer
/// `id` held as a node property (not the store-native node identity). The
/// node exists iff signup's best-effort graph write succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 digest. Never serialized into API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Signup input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login input.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A book in the catalog store. `id` is the string form of the generated
/// 12-byte document identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

/// Book creation input. ISBN uniqueness is enforced by the catalog store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// A review row in the relational store. `book_id` is an opaque catalog
/// identifier, deliberately not validated as a cross-store foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub book_id: String,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Review creation input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i32,
    #[serde(default)]
    pub review_text: Option<String>,
}

/// A follow edge in the relational store, unique on
/// `(follower_id, followee_id)`.
///
/// `created_at` is `None` when the edge is a synthesized record standing in
/// for an already-existing row (idempotent re-follow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower_id: i64,
    pub followee_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FollowEdge {
    /// A record representing the logical outcome of a follow that already
    /// existed in the durable store.
    pub fn synthesized(follower_id: i64, followee_id: i64) -> Self {
        FollowEdge {
            follower_id,
            followee_id,
            created_at: None,
        }
    }
}

/// A `RATED` edge as read back from the graph store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingEdge {
    pub user_id: i64,
    pub book_id: String,
    pub rating: i32,
}

/// A ranked book suggestion produced by the recommendation engine.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BookRecommendation {
    pub book_id: String,
    /// Count of distinct followees who rated the book >= the qualifying
    /// threshold.
    pub score: u64,
}
