use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth::TokenError;

/// Errors raised by a `Repository` implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    // Uniqueness or foreign-key violation detected outside of SQL.
    #[error("constraint violation: {0}")]
    Constraint(String),
}

/// ServiceError
///
/// The outcome of every CRUD and authorization call that is not a success. The router
/// maps each variant to exactly one status code.
#[derive(Debug, Error)]
pub enum ServiceError {
    // Missing, invalid or expired token, revoked session, or insufficient role.
    #[error("unauthorized")]
    Unauthorized,

    // Row missing, or request rejected by validation.
    #[error("not found or invalid")]
    NotFound,

    // Username already held by a different live row.
    #[error("username already taken")]
    Duplicate,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("credential hashing failed: {0}")]
    Credential(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Unauthorized" })),
            )
                .into_response(),
            ServiceError::NotFound => StatusCode::NO_CONTENT.into_response(),
            ServiceError::Duplicate => (
                StatusCode::CONFLICT,
                Json(json!({ "detail": "Username already taken" })),
            )
                .into_response(),
            ServiceError::Repository(_) | ServiceError::Token(_) | ServiceError::Credential(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
