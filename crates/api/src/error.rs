//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, StoreError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No or unknown actor credentials.
    Unauthorized(String),
    /// The actor is known but the policy denies the action.
    Forbidden,
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Valid request blocked by current state.
    Conflict(String),
    /// Domain rule outcome.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::InvalidCardNumber | DomainError::InvalidAmount => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        DomainError::InactiveCard
        | DomainError::InsufficientBalance
        | DomainError::DuplicateCardNumber => (StatusCode::CONFLICT, err.to_string()),
        DomainError::CardNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::CardNotCreated(_)
        | DomainError::CardNotUpdated(_)
        | DomainError::DepositFailed(_)
        | DomainError::ExpenseNotCreated(_) => {
            // The wrapped store error stays in the logs, not the body.
            tracing::error!(error = ?err, "domain operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{entity} {id} not found"))
            }
            StoreError::DuplicateEmail | StoreError::UserHasCards(_) => {
                ApiError::Conflict(err.to_string())
            }
            StoreError::DuplicateNumber => ApiError::Conflict(err.to_string()),
            other => {
                tracing::error!(error = ?other, "store operation failed");
                ApiError::Internal("storage failure".to_string())
            }
        }
    }
}
