//! Graph-based recommendation engine.
//!
//! Read-only traversal over the social graph store, composing single-hop
//! batched primitives into multi-hop queries with ranking. Unlike the
//! coordinator's secondary writes, a graph failure here always propagates:
//! the traversal result is the entire value of the request.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bg_core::traits::SocialGraphStore;
use bg_core::types::BookRecommendation;
use errors::{CoreError, StoreError};

/// A followee's rating must be at least this to count toward a book
/// suggestion.
const QUALIFYING_RATING: i32 = 4;

pub struct RecommendationEngine {
    graph: Arc<dyn SocialGraphStore>,
}

fn graph_failure(err: StoreError) -> CoreError {
    tracing::error!(error = %err, "recommendation traversal failed");
    CoreError::internal(err.to_string())
}

impl RecommendationEngine {
    pub fn new(graph: Arc<dyn SocialGraphStore>) -> Self {
        Self { graph }
    }

    /// Friend-of-friend suggestions: distinct users at exactly two
    /// `FOLLOWS` hops from `user_id`, excluding `user_id` itself and
    /// anyone already followed directly. Traversal order, capped at
    /// `limit`.
    pub async fn recommend_users(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<i64>, CoreError> {
        let direct = self
            .graph
            .followees(user_id)
            .await
            .map_err(graph_failure)?;
        if direct.is_empty() {
            return Ok(Vec::new());
        }

        let second_hop = self
            .graph
            .followees_of_many(&direct)
            .await
            .map_err(graph_failure)?;

        let already_followed: HashSet<i64> = direct.into_iter().collect();
        let mut suggestions = Vec::new();
        for candidate in second_hop {
            if candidate == user_id || already_followed.contains(&candidate) {
                continue;
            }
            if !suggestions.contains(&candidate) {
                suggestions.push(candidate);
            }
            if suggestions.len() == limit {
                break;
            }
        }
        Ok(suggestions)
    }

    /// Collaborative-filtering book suggestions: books rated >= 4 by the
    /// user's followees, excluding books the user already rated, scored by
    /// the count of distinct qualifying followees. Descending score,
    /// tie-broken by descending book id, a stable ordering rather than a
    /// business rule.
    pub async fn recommend_books(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<BookRecommendation>, CoreError> {
        let followees = self
            .graph
            .followees(user_id)
            .await
            .map_err(graph_failure)?;
        if followees.is_empty() {
            return Ok(Vec::new());
        }

        let ratings = self
            .graph
            .high_ratings_by(&followees, QUALIFYING_RATING)
            .await
            .map_err(graph_failure)?;

        let already_rated: HashSet<String> = self
            .graph
            .rated_book_ids(user_id)
            .await
            .map_err(graph_failure)?
            .into_iter()
            .collect();

        let mut voters: HashMap<String, HashSet<i64>> = HashMap::new();
        for edge in ratings {
            if already_rated.contains(&edge.book_id) {
                continue;
            }
            voters.entry(edge.book_id).or_default().insert(edge.user_id);
        }

        let mut scored: Vec<BookRecommendation> = voters
            .into_iter()
            .map(|(book_id, users)| BookRecommendation {
                book_id,
                score: users.len() as u64,
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.book_id.cmp(&a.book_id))
        });
        scored.truncate(limit);
        Ok(scored)
    }
}
