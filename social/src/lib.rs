//! # social
//!
//! The core of the bookgraph backend: coordination of a single logical
//! write across heterogeneous stores, graph-based recommendations, and the
//! session/rate-limit guard.
//!
//! Design: durability and uniqueness guarantees live entirely in the
//! relational store. The graph store is an advisory secondary index whose
//! write path is deliberately decoupled: no distributed transaction, no
//! retry queue. A graph outage can make recommendations temporarily
//! incomplete but can never corrupt core application state.
//!
//! Every component takes its store handles as `Arc<dyn …>` at construction
//! time; nothing reaches for ambient global state.

pub mod auth;
pub mod catalog;
pub mod coordinator;
pub mod guard;
pub mod rate_limit;
pub mod recommend;

pub use auth::{AuthService, Claims, LoginResponse, TokenIssuer};
pub use catalog::CatalogService;
pub use coordinator::WriteCoordinator;
pub use guard::{AuthenticatedUser, SessionGuard};
pub use rate_limit::RateLimiter;
pub use recommend::RecommendationEngine;
