//! Error types for Folio server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable machine-readable error codes exposed in the JSON envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    NoSuchLoan = 6,
    ForbiddenAction = 7,
    LoanAlreadyReturned = 8,
    LoanLimitExceeded = 9,
    PriceLimitExceeded = 10,
    BookUnavailable = 11,
    Duplicate = 12,
    BadValue = 13,
    Conflict = 14,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    #[error("Forbidden: {0}")]
    ForbiddenAction(String),

    #[error("Loan already returned: {0}")]
    LoanAlreadyReturned(String),

    #[error("Loan limit exceeded: {0}")]
    LoanLimitExceeded(String),

    #[error("Price limit exceeded: {0}")]
    PriceLimitExceeded(String),

    #[error("Book unavailable: {0}")]
    BookUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

/// True when a database error is a transient serialization/lock conflict
/// (SQLSTATE 40001/40P01) or a CHECK/unique violation raised by a racing
/// writer. These are surfaced as 409 so the caller can decide to retry.
fn is_retryable_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some("40001") | Some("40P01") | Some("23514") | Some("23505")
        ),
        _ => false,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::UserNotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchUser, msg.clone())
            }
            AppError::BookNotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook, msg.clone())
            }
            AppError::LoanNotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchLoan, msg.clone())
            }
            AppError::ForbiddenAction(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::ForbiddenAction, msg.clone())
            }
            AppError::LoanAlreadyReturned(msg) => {
                (StatusCode::CONFLICT, ErrorCode::LoanAlreadyReturned, msg.clone())
            }
            AppError::LoanLimitExceeded(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::LoanLimitExceeded, msg.clone())
            }
            AppError::PriceLimitExceeded(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::PriceLimitExceeded, msg.clone())
            }
            AppError::BookUnavailable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::BookUnavailable, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Conflict, msg.clone())
            }
            AppError::Database(e) if is_retryable_conflict(e) => {
                tracing::warn!("Concurrent update conflict: {:?}", e);
                (
                    StatusCode::CONFLICT,
                    ErrorCode::Conflict,
                    "Concurrent update conflict, retry the request".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
