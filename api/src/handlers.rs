//! HTTP request handlers for the bookgraph API.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts, Path, Query, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::IntoResponse,
};
use bg_core::types::{
    Book, Credentials, FollowEdge, NewBook, NewReview, NewUser, Review, User,
};
use serde::{Deserialize, Serialize};
use social::LoginResponse;

use crate::error::Result;
use crate::state::AppState;

/// The key a client's requests are rate-limited under: the first
/// `X-Forwarded-For` hop when present, otherwise the peer address.
pub struct ClientKey(pub String);

impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Infallible> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let key = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|info| info.0.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ClientKey(key))
    }
}

fn bearer_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Pagination query parameters shared by the list endpoints.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "Pagination::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Pagination {
    fn default_limit() -> i64 {
        20
    }

    /// Clamp to sane bounds; a hostile `limit` must not become an
    /// unbounded scan.
    fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    #[serde(default = "RecommendationParams::default_limit")]
    pub limit: usize,
}

impl RecommendationParams {
    fn default_limit() -> usize {
        10
    }
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.coordinator.register_user(&body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/login
///
/// Rate-limited per client network origin before credentials are checked,
/// so a locked-out client learns nothing about credential validity.
pub async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientKey,
    Json(body): Json<Credentials>,
) -> Result<Json<LoginResponse>> {
    state.limiter.check(&client.0).await?;
    let response = state.auth.login(&body).await?;
    Ok(Json(response))
}

/// POST /books
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>)> {
    let book = state.catalog.create_book(&body).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /books
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Book>>> {
    let (limit, offset) = page.clamped();
    Ok(Json(state.catalog.list_books(limit, offset).await?))
}

/// GET /books/{id}
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<Book>> {
    Ok(Json(state.catalog.get_book(&book_id).await?))
}

/// POST /books/{id}/reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    let authed = state.guard.authorize(bearer_header(&headers)).await?;
    let review = state
        .coordinator
        .create_review(authed.user_id, &book_id, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /books/{id}/reviews
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Review>>> {
    let (limit, offset) = page.clamped();
    Ok(Json(
        state
            .coordinator
            .reviews_for_book(&book_id, limit, offset)
            .await?,
    ))
}

/// POST /users/{id}/follow
pub async fn follow_user(
    State(state): State<Arc<AppState>>,
    Path(followee_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<FollowEdge>> {
    let authed = state.guard.authorize(bearer_header(&headers)).await?;
    let edge = state
        .coordinator
        .create_follow(authed.user_id, followee_id)
        .await?;
    Ok(Json(edge))
}

#[derive(Debug, Serialize)]
pub struct FollowStatusResponse {
    pub following: bool,
}

/// GET /users/{id}/follow/status
pub async fn follow_status(
    State(state): State<Arc<AppState>>,
    Path(followee_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<FollowStatusResponse>> {
    let authed = state.guard.authorize(bearer_header(&headers)).await?;
    let following = state
        .coordinator
        .follow_status(authed.user_id, followee_id)
        .await?;
    Ok(Json(FollowStatusResponse { following }))
}

/// GET /users/{id}/recommendations
pub async fn recommend_users(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<RecommendationParams>,
) -> Result<Json<Vec<i64>>> {
    Ok(Json(
        state.engine.recommend_users(user_id, params.limit).await?,
    ))
}

/// GET /users/{id}/recommendations/books
///
/// Returns catalog identifiers in ranked order; clients hydrate the book
/// metadata through `GET /books/{id}`.
pub async fn recommend_books(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(params): Query<RecommendationParams>,
) -> Result<Json<Vec<String>>> {
    let ranked = state.engine.recommend_books(user_id, params.limit).await?;
    Ok(Json(ranked.into_iter().map(|r| r.book_id).collect()))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// GET /health
///
/// Returns 200 when the relational store answers a trivial query. The
/// other backends are exercised lazily by their endpoints.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(pool) = &state.pool else {
        return (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                database: "unchecked".to_string(),
            }),
        );
    };

    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                database: "connected".to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    database: "disconnected".to_string(),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn client_key_for(request: Request<()>) -> String {
        let (mut parts, ()) = request.into_parts();
        let ClientKey(key) = ClientKey::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        key
    }

    #[tokio::test]
    async fn client_key_prefers_first_forwarded_hop() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(client_key_for(request).await, "203.0.113.9");
    }

    #[tokio::test]
    async fn client_key_falls_back_to_peer_address() {
        let mut request = Request::builder().body(()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 55321))));
        assert_eq!(client_key_for(request).await, "192.0.2.4");
    }

    #[tokio::test]
    async fn client_key_without_any_origin_is_stable() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(client_key_for(request).await, "unknown");
    }

    #[test]
    fn pagination_clamps_hostile_values() {
        let page = Pagination {
            limit: 100_000,
            offset: -5,
        };
        assert_eq!(page.clamped(), (100, 0));
    }

    #[test]
    fn health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            database: "connected".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("connected"));
    }
}
