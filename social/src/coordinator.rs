//! The polyglot write coordinator.
//!
//! Every compound operation is a two-step protocol: a primary durable
//! write, strictly ordered before a best-effort secondary write to the
//! graph store. Primary failures propagate and abort the operation.
//! Secondary failures are caught, logged with context and suppressed;
//! the caller sees success based on the primary outcome alone. The
//! resulting durable-edge-without-graph-edge state is accepted and never
//! reconciled.

use std::sync::Arc;

use bg_core::traits::{CatalogStore, IdentityStore, SocialGraphStore};
use bg_core::types::{FollowEdge, NewReview, NewUser, Review, User};
use errors::{CoreError, StoreError};

use crate::auth;

pub struct WriteCoordinator {
    identity: Arc<dyn IdentityStore>,
    catalog: Arc<dyn CatalogStore>,
    graph: Arc<dyn SocialGraphStore>,
}

fn primary_failure(err: StoreError) -> CoreError {
    tracing::error!(error = %err, "primary store write failed");
    CoreError::internal(err.to_string())
}

impl WriteCoordinator {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        catalog: Arc<dyn CatalogStore>,
        graph: Arc<dyn SocialGraphStore>,
    ) -> Self {
        Self {
            identity,
            catalog,
            graph,
        }
    }

    /// Create the identity record, then mirror a `User` node into the
    /// graph. The graph write is best-effort: its failure is logged and
    /// the freshly created user is returned regardless.
    pub async fn register_user(&self, signup: &NewUser) -> Result<User, CoreError> {
        if signup.username.trim().is_empty() {
            return Err(CoreError::invalid_argument("username must not be empty"));
        }
        if signup.email.trim().is_empty() || !signup.email.contains('@') {
            return Err(CoreError::invalid_argument("a valid email is required"));
        }
        if signup.password.is_empty() {
            return Err(CoreError::invalid_argument("password must not be empty"));
        }

        let existing = self
            .identity
            .get_user_by_email(&signup.email)
            .await
            .map_err(primary_failure)?;
        if existing.is_some() {
            return Err(CoreError::conflict("email already registered"));
        }

        let password_hash = auth::hash_password(&signup.password)?;
        let user = self
            .identity
            .create_user(&signup.username, &signup.email, &password_hash)
            .await
            .map_err(|e| match e {
                // Concurrent signup can slip past the pre-check; the
                // constraint is the real arbiter.
                StoreError::UniqueViolation { .. } => {
                    CoreError::conflict("email already registered")
                }
                other => primary_failure(other),
            })?;

        if let Err(e) = self.graph.merge_user(user.id).await {
            tracing::warn!(
                user_id = user.id,
                error = %e,
                "secondary graph write failed during signup; user node missing until repaired"
            );
        }

        Ok(user)
    }

    /// Insert the durable follow edge, treating an existing pair as
    /// idempotent success, then merge the `FOLLOWS` graph edge.
    pub async fn create_follow(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<FollowEdge, CoreError> {
        if follower_id == followee_id {
            return Err(CoreError::invalid_argument("you cannot follow yourself"));
        }

        let edge = match self.identity.insert_follow(follower_id, followee_id).await {
            Ok(edge) => edge,
            Err(e) if e.is_unique_violation() => {
                tracing::debug!(follower_id, followee_id, "follow edge already exists");
                FollowEdge::synthesized(follower_id, followee_id)
            }
            Err(other) => return Err(primary_failure(other)),
        };

        if let Err(e) = self.graph.merge_follows(follower_id, followee_id).await {
            tracing::warn!(
                follower_id,
                followee_id,
                error = %e,
                "secondary graph write failed during follow"
            );
        }

        Ok(edge)
    }

    /// Validate the book exists in the catalog (the single cross-store
    /// read-before-write check), insert the durable review row, then merge
    /// the `RATED` graph edge.
    pub async fn create_review(
        &self,
        user_id: i64,
        book_id: &str,
        review: &NewReview,
    ) -> Result<Review, CoreError> {
        if !(1..=5).contains(&review.rating) {
            return Err(CoreError::invalid_argument("rating must be between 1 and 5"));
        }
        if review
            .review_text
            .as_ref()
            .is_some_and(|t| t.len() > 5000)
        {
            return Err(CoreError::invalid_argument(
                "review text must be at most 5000 characters",
            ));
        }

        let book = self
            .catalog
            .get_book(book_id)
            .await
            .map_err(primary_failure)?;
        if book.is_none() {
            return Err(CoreError::not_found(format!("book {book_id}")));
        }

        let review = self
            .identity
            .insert_review(user_id, book_id, review.rating, review.review_text.as_deref())
            .await
            .map_err(primary_failure)?;

        if let Err(e) = self
            .graph
            .merge_rating(user_id, book_id, review.rating)
            .await
        {
            tracing::warn!(
                user_id,
                book_id,
                error = %e,
                "secondary graph write failed during review"
            );
        }

        Ok(review)
    }

    /// Whether `follower_id` currently follows `followee_id`, per the
    /// durable store.
    pub async fn follow_status(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<bool, CoreError> {
        self.identity
            .follow_exists(follower_id, followee_id)
            .await
            .map_err(primary_failure)
    }

    /// Reviews for one book, newest first.
    pub async fn reviews_for_book(
        &self,
        book_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, CoreError> {
        self.identity
            .reviews_for_book(book_id, limit, offset)
            .await
            .map_err(primary_failure)
    }
}
