//! Error types for the cache admin API
//!
//! Cache misses are not errors: engines return `Option`. Errors here cover
//! requests the API cannot serve.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == App Error Enum ==
/// Unified error type for the admin API.
#[derive(Error, Debug)]
pub enum AppError {
    /// No cache registered under that name
    #[error("Cache not found: {0}")]
    CacheNotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::CacheNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the admin API.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::CacheNotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_display() {
        let err = AppError::CacheNotFound("ai_query".into());
        assert_eq!(err.to_string(), "Cache not found: ai_query");
    }
}
