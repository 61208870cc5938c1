//! Centralized API error handling for the loan funding engine
//!
//! One error type for API responses, mapping the funding-domain taxonomy
//! (validation, wrong state, overfunding, not found, storage, notification)
//! to HTTP status codes and JSON error bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ledger::LedgerError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Transition attempted from the wrong lifecycle state. Client/workflow
    /// misuse; never retried.
    #[error("Invalid loan state: {0}")]
    InvalidState(String),

    /// Same investor committing twice to the same loan.
    #[error("Duplicate investment: {0}")]
    DuplicateInvestment(String),

    /// Investment would exceed the remaining principal capacity. May be
    /// retried with a smaller amount, never with the same one.
    #[error("Overfunding: {0}")]
    Overfunding(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Post-funding pipeline failure. Logged for operators, never returned
    /// to the investor whose request completed funding.
    #[error("Notification error: {0}")]
    Notification(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::DuplicateInvestment(_) => "DUPLICATE_INVESTMENT",
            ApiError::Overfunding(_) => "OVERFUNDING",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Notification(_) => "NOTIFICATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_) => StatusCode::CONFLICT,
            ApiError::DuplicateInvestment(_) => StatusCode::CONFLICT,
            ApiError::Overfunding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log server errors
        match &self {
            ApiError::Storage(_) | ApiError::Notification(_) => {
                tracing::error!(error = %message, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversions from common error types

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound => ApiError::NotFound("loan not found".to_string()),
            LedgerError::InvalidState { .. } => ApiError::InvalidState(err.to_string()),
            LedgerError::Overfunding { .. } => ApiError::Overfunding(err.to_string()),
            LedgerError::DuplicateInvestor => ApiError::DuplicateInvestment(err.to_string()),
            LedgerError::Storage(e) => ApiError::Storage(e.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            _ => ApiError::Storage(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Validation(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::LoanState;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::Validation("test".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            ApiError::InvalidState("test".to_string()).error_code(),
            "INVALID_STATE"
        );
        assert_eq!(
            ApiError::Overfunding("test".to_string()).error_code(),
            "OVERFUNDING"
        );
        assert_eq!(
            ApiError::NotFound("test".to_string()).error_code(),
            "NOT_FOUND"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidState("test".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Overfunding("test".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Storage("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_ledger_error_mapping() {
        let err: ApiError = LedgerError::Overfunding {
            requested: 300_000,
            remaining: 200_000,
        }
        .into();
        assert_eq!(err.error_code(), "OVERFUNDING");

        let err: ApiError = LedgerError::InvalidState {
            expected: LoanState::Proposed,
            actual: LoanState::Approved,
        }
        .into();
        assert_eq!(err.error_code(), "INVALID_STATE");

        let err: ApiError = LedgerError::NotFound.into();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
