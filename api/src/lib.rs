//! # api
//!
//! The HTTP surface of the bookgraph backend: an Axum router over the
//! service layer in `social`, with domain errors mapped to HTTP statuses
//! and request tracing on every route.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, Result};
pub use routes::create_router;
pub use state::AppState;
