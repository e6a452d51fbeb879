//! # storage
//!
//! Adapters binding the `bg_core` store traits to the four real backends:
//!
//! - [`postgres`]: the durable relational store (identity, follows,
//!   reviews) via `sqlx`.
//! - [`catalog`]: the document store (book metadata) via `mongodb`.
//! - [`redis`]: the session cache and rate-limit counters.
//! - [`neo4j`]: the property-graph store for `FOLLOWS`/`RATED` traversal.
//!
//! Consistency across the stores is deliberately not transactional: each
//! adapter only guarantees what its own backend enforces (unique
//! constraints, merge/upsert semantics). The write coordinator in the
//! `social` crate layers the cross-store ordering policy on top.

pub mod catalog;
pub mod neo4j;
pub mod postgres;
pub mod redis;

pub use catalog::MongoCatalogStore;
pub use neo4j::Neo4jGraphStore;
pub use postgres::PostgresIdentityStore;
pub use redis::RedisSessionCache;
