/// Unified error types for the bookmarks service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum BookmarksError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// View counter / ranking store errors
    #[error("Counter store error: {0}")]
    CounterStore(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),
}

impl From<redis::RedisError> for BookmarksError {
    fn from(err: redis::RedisError) -> Self {
        BookmarksError::CounterStore(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for BookmarksError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        BookmarksError::Jwt(err.to_string())
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl BookmarksError {
    /// Short machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            BookmarksError::Authentication(_) | BookmarksError::Jwt(_) => "AuthenticationRequired",
            BookmarksError::Authorization(_) => "Forbidden",
            BookmarksError::Validation(_) => "InvalidRequest",
            BookmarksError::NotFound(_) => "NotFound",
            BookmarksError::Conflict(_) => "Conflict",
            BookmarksError::CounterStore(_) => "CounterStoreUnavailable",
            BookmarksError::Database(_) | BookmarksError::Internal(_) | BookmarksError::Io(_) => {
                "InternalServerError"
            }
        }
    }
}

/// Convert BookmarksError to HTTP response
impl IntoResponse for BookmarksError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            BookmarksError::Authentication(_) | BookmarksError::Jwt(_) => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            BookmarksError::Authorization(_) => (StatusCode::FORBIDDEN, self.to_string()),
            BookmarksError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            BookmarksError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            BookmarksError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            BookmarksError::CounterStore(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Counter store unavailable".to_string(),
            ),
            BookmarksError::Database(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(), // Don't leak details
                )
            }
            BookmarksError::Internal(_) | BookmarksError::Io(_) => {
                tracing::error!(error = %self, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type BookmarksResult<T> = Result<T, BookmarksError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (BookmarksError::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (BookmarksError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (BookmarksError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (BookmarksError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (BookmarksError::Conflict("x".into()), StatusCode::CONFLICT),
            (BookmarksError::CounterStore("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (BookmarksError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = BookmarksError::Internal("secret connection string".to_string());
        assert_eq!(err.code(), "InternalServerError");
        assert!(err.to_string().contains("secret"));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
