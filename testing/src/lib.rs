//! Shared test fakes for the bookgraph workspace.
//!
//! In-memory implementations of every store trait in `bg_core::traits`,
//! faithful to the behavior the real adapters surface: structured unique
//! violations, merge semantics on the graph, TTL-based session expiry with
//! a manually advanceable clock. No live store is required to run any test
//! suite in this workspace.

mod fakes;

pub use fakes::*;
