//! Property-graph adapter for the social graph.
//!
//! All mutations are parameterized Cypher merge writes matching `User` and
//! `Book` nodes by their `id` property: intentional denormalization keyed
//! on the durable stores' identifiers, never on Neo4j's internal node ids.
//! Reads are single-hop batched traversals; the recommendation engine does
//! the multi-hop composition and ranking.
//!
//! Every call is wrapped in a bounded timeout. A timed-out call is treated
//! exactly like any other failure of this store: fatal for reads, logged
//! and ignored for the coordinator's secondary writes.

use std::time::Duration;

use async_trait::async_trait;
use bg_core::traits::SocialGraphStore;
use bg_core::types::RatingEdge;
use errors::StoreError;
use neo4rs::{ConfigBuilder, Graph, Query, query};

pub struct Neo4jGraphStore {
    graph: Graph,
    op_timeout: Duration,
}

fn query_error(err: neo4rs::Error) -> StoreError {
    StoreError::Query {
        backend: "Neo4j".to_string(),
        reason: err.to_string(),
    }
}

fn decode_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization {
        reason: format!("Neo4j row decode failed: {err}"),
    }
}

impl Neo4jGraphStore {
    pub async fn new(
        uri: &str,
        user: &str,
        password: &str,
        op_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .build()
            .map_err(|e| StoreError::Connection {
                backend: "Neo4j".to_string(),
                reason: e.to_string(),
            })?;

        let graph = Graph::connect(config)
            .await
            .map_err(|e| StoreError::Connection {
                backend: "Neo4j".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { graph, op_timeout })
    }

    fn timeout_error(&self) -> StoreError {
        StoreError::Timeout {
            backend: "Neo4j".to_string(),
            timeout_ms: self.op_timeout.as_millis() as u64,
        }
    }

    async fn run(&self, q: Query) -> Result<(), StoreError> {
        tokio::time::timeout(self.op_timeout, self.graph.run(q))
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(query_error)
    }

    /// Execute a read query and collect one `i64` column per row.
    async fn collect_i64(&self, q: Query, column: &str) -> Result<Vec<i64>, StoreError> {
        tokio::time::timeout(self.op_timeout, async {
            let mut stream = self.graph.execute(q).await.map_err(query_error)?;
            let mut out = Vec::new();
            while let Some(row) = stream.next().await.map_err(query_error)? {
                out.push(row.get::<i64>(column).map_err(decode_error)?);
            }
            Ok(out)
        })
        .await
        .map_err(|_| self.timeout_error())?
    }

    async fn collect_strings(&self, q: Query, column: &str) -> Result<Vec<String>, StoreError> {
        tokio::time::timeout(self.op_timeout, async {
            let mut stream = self.graph.execute(q).await.map_err(query_error)?;
            let mut out = Vec::new();
            while let Some(row) = stream.next().await.map_err(query_error)? {
                out.push(row.get::<String>(column).map_err(decode_error)?);
            }
            Ok(out)
        })
        .await
        .map_err(|_| self.timeout_error())?
    }
}

#[async_trait]
impl SocialGraphStore for Neo4jGraphStore {
    async fn merge_user(&self, user_id: i64) -> Result<(), StoreError> {
        self.run(query("MERGE (:User {id: $id})").param("id", user_id))
            .await
    }

    async fn merge_follows(&self, follower_id: i64, followee_id: i64) -> Result<(), StoreError> {
        self.run(
            query(
                "MATCH (follower:User {id: $follower_id})
                 MATCH (followee:User {id: $followee_id})
                 MERGE (follower)-[:FOLLOWS]->(followee)",
            )
            .param("follower_id", follower_id)
            .param("followee_id", followee_id),
        )
        .await
    }

    async fn merge_rating(
        &self,
        user_id: i64,
        book_id: &str,
        rating: i32,
    ) -> Result<(), StoreError> {
        self.run(
            query(
                "MATCH (user:User {id: $user_id})
                 MERGE (book:Book {id: $book_id})
                 MERGE (user)-[r:RATED]->(book)
                 ON CREATE SET r.rating = $rating, r.created_at = datetime()
                 ON MATCH SET r.rating = $rating, r.updated_at = datetime()",
            )
            .param("user_id", user_id)
            .param("book_id", book_id)
            .param("rating", i64::from(rating)),
        )
        .await
    }

    async fn followees(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        self.collect_i64(
            query(
                "MATCH (:User {id: $id})-[:FOLLOWS]->(followee:User)
                 RETURN followee.id AS id",
            )
            .param("id", user_id),
            "id",
        )
        .await
    }

    async fn followees_of_many(&self, user_ids: &[i64]) -> Result<Vec<i64>, StoreError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.collect_i64(
            query(
                "UNWIND $ids AS uid
                 MATCH (:User {id: uid})-[:FOLLOWS]->(followee:User)
                 RETURN DISTINCT followee.id AS id",
            )
            .param("ids", user_ids.to_vec()),
            "id",
        )
        .await
    }

    async fn high_ratings_by(
        &self,
        user_ids: &[i64],
        min_rating: i32,
    ) -> Result<Vec<RatingEdge>, StoreError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let q = query(
            "UNWIND $ids AS uid
             MATCH (user:User {id: uid})-[r:RATED]->(book:Book)
             WHERE r.rating >= $min_rating
             RETURN user.id AS user_id, book.id AS book_id, r.rating AS rating",
        )
        .param("ids", user_ids.to_vec())
        .param("min_rating", i64::from(min_rating));

        tokio::time::timeout(self.op_timeout, async {
            let mut stream = self.graph.execute(q).await.map_err(query_error)?;
            let mut out = Vec::new();
            while let Some(row) = stream.next().await.map_err(query_error)? {
                out.push(RatingEdge {
                    user_id: row.get::<i64>("user_id").map_err(decode_error)?,
                    book_id: row.get::<String>("book_id").map_err(decode_error)?,
                    rating: row.get::<i64>("rating").map_err(decode_error)? as i32,
                });
            }
            Ok(out)
        })
        .await
        .map_err(|_| self.timeout_error())?
    }

    async fn rated_book_ids(&self, user_id: i64) -> Result<Vec<String>, StoreError> {
        self.collect_strings(
            query(
                "MATCH (:User {id: $id})-[:RATED]->(book:Book)
                 RETURN book.id AS id",
            )
            .param("id", user_id),
            "id",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_store_timeout() {
        let err = StoreError::Timeout {
            backend: "Neo4j".to_string(),
            timeout_ms: 5000,
        };
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn graph_store_trait_is_object_safe() {
        fn assert_dyn(_: &dyn SocialGraphStore) {}
        let _ = assert_dyn;
    }
}
