//! HTTP error mapping for the bookgraph API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use errors::CoreError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for the API layer.
pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    /// A domain-level failure from the service layer.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Server startup or lifecycle error.
    #[error("Server error: {0}")]
    Server(String),
}

/// Error response body for HTTP endpoints.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// The HTTP status for a domain error code.
fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Conflict { .. } => StatusCode::CONFLICT,
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
        CoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
        CoreError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
        CoreError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        CoreError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Core(core) => {
                let status = status_for(core);
                // Internal messages carry store detail that must not leak
                // into response bodies.
                let message = if matches!(core, CoreError::Internal { .. }) {
                    tracing::error!(error = %core, "internal error");
                    "An internal error occurred".to_string()
                } else {
                    core.to_string()
                };
                (status, core.code(), message)
            }
            Self::Server(msg) => {
                tracing::error!(message = %msg, "server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Self::Core(CoreError::RateLimited { retry_after }) = &self {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}
