//! Route definitions for the bookgraph API.

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the Axum router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth = Router::new()
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login));

    let books = Router::new()
        .route("/", post(handlers::create_book).get(handlers::list_books))
        .route("/{id}", get(handlers::get_book))
        .route(
            "/{id}/reviews",
            post(handlers::create_review).get(handlers::list_reviews),
        );

    let users = Router::new()
        .route("/{id}/follow", post(handlers::follow_user))
        .route("/{id}/follow/status", get(handlers::follow_status))
        .route("/{id}/recommendations", get(handlers::recommend_users))
        .route(
            "/{id}/recommendations/books",
            get(handlers::recommend_books),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/auth", auth)
        .nest("/books", books)
        .nest("/users", users)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
