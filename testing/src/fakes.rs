use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bg_core::traits::{CatalogStore, IdentityStore, SessionCache, SocialGraphStore};
use bg_core::types::{Book, FollowEdge, NewBook, RatingEdge, Review, User};
use chrono::Utc;
use errors::StoreError;

fn unique_violation(backend: &str, constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        backend: backend.to_string(),
        constraint: constraint.to_string(),
    }
}

/// In-memory stand-in for the durable relational store.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    inner: Mutex<IdentityState>,
}

#[derive(Default)]
struct IdentityState {
    users: Vec<User>,
    follows: Vec<FollowEdge>,
    reviews: Vec<Review>,
    next_user_id: i64,
    next_review_id: i64,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }

    pub fn follow_count(&self) -> usize {
        self.inner.lock().unwrap().follows.len()
    }

    pub fn review_count(&self) -> usize {
        self.inner.lock().unwrap().reviews.len()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut state = self.inner.lock().unwrap();
        if state.users.iter().any(|u| u.email == email) {
            return Err(unique_violation("Postgres", "users_email_key"));
        }
        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.inner.lock().unwrap();
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_follow(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<FollowEdge, StoreError> {
        let mut state = self.inner.lock().unwrap();
        if state
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followee_id == followee_id)
        {
            return Err(unique_violation("Postgres", "follows_pkey"));
        }
        let edge = FollowEdge {
            follower_id,
            followee_id,
            created_at: Some(Utc::now()),
        };
        state.follows.push(edge.clone());
        Ok(edge)
    }

    async fn follow_exists(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<bool, StoreError> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followee_id == followee_id))
    }

    async fn insert_review(
        &self,
        user_id: i64,
        book_id: &str,
        rating: i32,
        review_text: Option<&str>,
    ) -> Result<Review, StoreError> {
        let mut state = self.inner.lock().unwrap();
        state.next_review_id += 1;
        let review = Review {
            id: state.next_review_id,
            user_id,
            book_id: book_id.to_string(),
            rating,
            review_text: review_text.map(str::to_string),
            created_at: Utc::now(),
        };
        state.reviews.push(review.clone());
        Ok(review)
    }

    async fn reviews_for_book(
        &self,
        book_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, StoreError> {
        let state = self.inner.lock().unwrap();
        let mut reviews: Vec<Review> = state
            .reviews
            .iter()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reviews
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

/// In-memory stand-in for the document catalog.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    inner: Mutex<CatalogState>,
}

#[derive(Default)]
struct CatalogState {
    books: Vec<Book>,
    next_id: u64,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn book_count(&self) -> usize {
        self.inner.lock().unwrap().books.len()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_book(&self, book: &NewBook) -> Result<Book, StoreError> {
        let mut state = self.inner.lock().unwrap();
        if state.books.iter().any(|b| b.isbn == book.isbn) {
            return Err(unique_violation("MongoDB", "isbn"));
        }
        state.next_id += 1;
        // 24 hex chars, the string form of a 12-byte identifier.
        let id = format!("{:024x}", state.next_id);
        let stored = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            publication_year: book.publication_year,
            cover_url: book.cover_url.clone(),
        };
        state.books.push(stored.clone());
        Ok(stored)
    }

    async fn get_book(&self, book_id: &str) -> Result<Option<Book>, StoreError> {
        let state = self.inner.lock().unwrap();
        Ok(state.books.iter().find(|b| b.id == book_id).cloned())
    }

    async fn list_books(&self, limit: i64, offset: i64) -> Result<Vec<Book>, StoreError> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .books
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

/// In-memory stand-in for the session cache, with a manually advanceable
/// clock so TTL and fixed-window expiry are testable without sleeping.
#[derive(Default)]
pub struct InMemorySessionCache {
    inner: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    /// token -> (user_id, expires_at)
    sessions: HashMap<String, (i64, Duration)>,
    /// key -> (count, expires_at)
    counters: HashMap<String, (u64, Duration)>,
    now: Duration,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the fake clock, expiring sessions and counters that have
    /// passed their TTL.
    pub fn advance(&self, by: Duration) {
        let mut state = self.inner.lock().unwrap();
        state.now += by;
        let now = state.now;
        state.sessions.retain(|_, (_, expires)| *expires > now);
        state.counters.retain(|_, (_, expires)| *expires > now);
    }

    /// Drop one session, as if its TTL expired or it was revoked.
    pub fn evict_session(&self, token: &str) {
        let mut state = self.inner.lock().unwrap();
        state.sessions.remove(&format!("session:{token}"));
    }

    pub fn session_user(&self, token: &str) -> Option<i64> {
        let state = self.inner.lock().unwrap();
        state
            .sessions
            .get(&format!("session:{token}"))
            .map(|(user_id, _)| *user_id)
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn put_session(
        &self,
        token: &str,
        user_id: i64,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.lock().unwrap();
        let expires = state.now + Duration::from_secs(ttl_seconds);
        state
            .sessions
            .insert(format!("session:{token}"), (user_id, expires));
        Ok(())
    }

    async fn session_exists(&self, token: &str) -> Result<bool, StoreError> {
        let state = self.inner.lock().unwrap();
        let key = format!("session:{token}");
        Ok(state
            .sessions
            .get(&key)
            .is_some_and(|(_, expires)| *expires > state.now))
    }

    async fn incr_fixed_window(
        &self,
        key: &str,
        window_seconds: u64,
    ) -> Result<u64, StoreError> {
        let mut state = self.inner.lock().unwrap();
        let now = state.now;
        let entry = state.counters.entry(key.to_string());
        let (count, expires) = entry.or_insert((0, now + Duration::from_secs(window_seconds)));
        if *expires <= now {
            // Window elapsed; the real store would have dropped the key.
            *count = 0;
            *expires = now + Duration::from_secs(window_seconds);
        }
        *count += 1;
        Ok(*count)
    }
}

/// In-memory stand-in for the social graph store, honoring merge semantics
/// and property-match node identity.
#[derive(Default)]
pub struct InMemoryGraphStore {
    inner: Mutex<GraphState>,
}

#[derive(Default)]
struct GraphState {
    user_nodes: Vec<i64>,
    book_nodes: Vec<String>,
    follows: Vec<(i64, i64)>,
    ratings: Vec<RatingRecord>,
}

struct RatingRecord {
    user_id: i64,
    book_id: String,
    rating: i32,
    updated: bool,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_node_exists(&self, user_id: i64) -> bool {
        self.inner.lock().unwrap().user_nodes.contains(&user_id)
    }

    pub fn follows_edge_count(&self, follower_id: i64, followee_id: i64) -> usize {
        self.inner
            .lock()
            .unwrap()
            .follows
            .iter()
            .filter(|&&(a, b)| a == follower_id && b == followee_id)
            .count()
    }

    /// `(rating, was_updated)` for the RATED edge, if present.
    pub fn rating_state(&self, user_id: i64, book_id: &str) -> Option<(i32, bool)> {
        self.inner
            .lock()
            .unwrap()
            .ratings
            .iter()
            .find(|r| r.user_id == user_id && r.book_id == book_id)
            .map(|r| (r.rating, r.updated))
    }
}

#[async_trait]
impl SocialGraphStore for InMemoryGraphStore {
    async fn merge_user(&self, user_id: i64) -> Result<(), StoreError> {
        let mut state = self.inner.lock().unwrap();
        if !state.user_nodes.contains(&user_id) {
            state.user_nodes.push(user_id);
        }
        Ok(())
    }

    async fn merge_follows(&self, follower_id: i64, followee_id: i64) -> Result<(), StoreError> {
        let mut state = self.inner.lock().unwrap();
        // MATCH on both endpoints: if either node is missing the merge
        // matches nothing and silently writes nothing, as in Cypher.
        if !state.user_nodes.contains(&follower_id) || !state.user_nodes.contains(&followee_id) {
            return Ok(());
        }
        if !state.follows.contains(&(follower_id, followee_id)) {
            state.follows.push((follower_id, followee_id));
        }
        Ok(())
    }

    async fn merge_rating(
        &self,
        user_id: i64,
        book_id: &str,
        rating: i32,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.lock().unwrap();
        if !state.user_nodes.contains(&user_id) {
            return Ok(());
        }
        if !state.book_nodes.iter().any(|b| b == book_id) {
            state.book_nodes.push(book_id.to_string());
        }
        if let Some(existing) = state
            .ratings
            .iter_mut()
            .find(|r| r.user_id == user_id && r.book_id == book_id)
        {
            existing.rating = rating;
            existing.updated = true;
        } else {
            state.ratings.push(RatingRecord {
                user_id,
                book_id: book_id.to_string(),
                rating,
                updated: false,
            });
        }
        Ok(())
    }

    async fn followees(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .follows
            .iter()
            .filter(|&&(a, _)| a == user_id)
            .map(|&(_, b)| b)
            .collect())
    }

    async fn followees_of_many(&self, user_ids: &[i64]) -> Result<Vec<i64>, StoreError> {
        let state = self.inner.lock().unwrap();
        let mut seen = Vec::new();
        for &source in user_ids {
            for &(a, b) in &state.follows {
                if a == source && !seen.contains(&b) {
                    seen.push(b);
                }
            }
        }
        Ok(seen)
    }

    async fn high_ratings_by(
        &self,
        user_ids: &[i64],
        min_rating: i32,
    ) -> Result<Vec<RatingEdge>, StoreError> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .ratings
            .iter()
            .filter(|r| r.rating >= min_rating && user_ids.contains(&r.user_id))
            .map(|r| RatingEdge {
                user_id: r.user_id,
                book_id: r.book_id.clone(),
                rating: r.rating,
            })
            .collect())
    }

    async fn rated_book_ids(&self, user_id: i64) -> Result<Vec<String>, StoreError> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.book_id.clone())
            .collect())
    }
}

/// A graph store where every call fails, simulating an unreachable Neo4j.
#[derive(Default)]
pub struct UnavailableGraphStore;

impl UnavailableGraphStore {
    pub fn new() -> Self {
        Self
    }

    fn unavailable() -> StoreError {
        StoreError::Connection {
            backend: "Neo4j".to_string(),
            reason: "graph store unavailable".to_string(),
        }
    }
}

#[async_trait]
impl SocialGraphStore for UnavailableGraphStore {
    async fn merge_user(&self, _user_id: i64) -> Result<(), StoreError> {
        Err(Self::unavailable())
    }

    async fn merge_follows(&self, _follower_id: i64, _followee_id: i64) -> Result<(), StoreError> {
        Err(Self::unavailable())
    }

    async fn merge_rating(
        &self,
        _user_id: i64,
        _book_id: &str,
        _rating: i32,
    ) -> Result<(), StoreError> {
        Err(Self::unavailable())
    }

    async fn followees(&self, _user_id: i64) -> Result<Vec<i64>, StoreError> {
        Err(Self::unavailable())
    }

    async fn followees_of_many(&self, _user_ids: &[i64]) -> Result<Vec<i64>, StoreError> {
        Err(Self::unavailable())
    }

    async fn high_ratings_by(
        &self,
        _user_ids: &[i64],
        _min_rating: i32,
    ) -> Result<Vec<RatingEdge>, StoreError> {
        Err(Self::unavailable())
    }

    async fn rated_book_ids(&self, _user_id: i64) -> Result<Vec<String>, StoreError> {
        Err(Self::unavailable())
    }
}
