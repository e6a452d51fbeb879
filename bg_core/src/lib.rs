//! # bg_core
//!
//! Domain types and store traits shared across the bookgraph workspace.
//!
//! The traits in [`traits`] are the seams between the service layer and the
//! four heterogeneous stores; every component receives its handles by
//! reference (dependency injection), never through ambient global state, so
//! the core stays testable against the in-memory fakes in the `testing`
//! crate.

pub mod traits;
pub mod types;
