use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::csrf::CsrfError;

/// ApiError
///
/// The application's error taxonomy. Every business-logic failure is caught at
/// the route-handler boundary and mapped to one of these variants; nothing
/// propagates past a handler unhandled.
///
/// Store and upstream failures are logged server-side with full detail but
/// surface to the client only as a generic message, so query text and stack
/// traces never leak.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Origin/Referer validation failure, surfaced as 403.
    #[error("{0}")]
    Csrf(CsrfError),

    /// Admin session missing, malformed, or expired.
    #[error("unauthorized")]
    Unauthorized,

    /// Referenced entity absent from the store.
    #[error("not found")]
    NotFound,

    /// Malformed request body (missing field, wrong shape).
    #[error("{0}")]
    Validation(String),

    /// External service (GitHub API) failure.
    #[error("upstream service unavailable")]
    Upstream(String),

    /// Underlying persistence failure.
    #[error("internal error")]
    Store(#[from] sqlx::Error),
}

impl From<CsrfError> for ApiError {
    fn from(err: CsrfError) -> Self {
        ApiError::Csrf(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Csrf(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(detail) => {
                tracing::error!("upstream error: {}", detail);
                StatusCode::BAD_GATEWAY
            }
            ApiError::Store(e) => {
                tracing::error!("store error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // `Display` for Store/Upstream is the generic message, not the source
        // error, so the body stays safe to return verbatim.
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
