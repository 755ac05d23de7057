use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    #[error("Duplicate email: {0}")]
    DuplicateEmail(String),

    #[error("Wrong role: {0}")]
    WrongRole(String),

    #[error("No availability: {0}")]
    NoAvailability(String),

    #[error("Store conflict: {0}")]
    StoreConflict(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} with id {} not found", resource, id))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::DuplicateName(_)
            | AppError::DuplicateEmail(_)
            | AppError::WrongRole(_)
            | AppError::NoAvailability(_)
            | AppError::StoreConflict(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateName(_) => "DUPLICATE_NAME",
            AppError::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            AppError::WrongRole(_) => "WRONG_ROLE",
            AppError::NoAvailability(_) => "NO_AVAILABILITY",
            AppError::StoreConflict(_) => "STORE_CONFLICT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Message safe to hand to the client. Store internals stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::DuplicateName(msg)
            | AppError::DuplicateEmail(msg)
            | AppError::WrongRole(msg)
            | AppError::NoAvailability(msg)
            | AppError::StoreConflict(msg) => msg.clone(),
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::InternalServerError(msg) => {
                error!(message = %msg, "Internal server error");
            }
            _ if self.status_code().is_client_error() => {
                warn!(code = self.code(), message = %self.public_message(), "Request rejected");
            }
            _ => {
                error!(error = ?self, "Application error");
            }
        }
    }
}

/// Maps integrity violations raised by PostgreSQL to `StoreConflict`; every
/// other sqlx error stays a `DatabaseError`.
pub fn from_store(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        // unique_violation, foreign_key_violation, check_violation
        if let Some("23505" | "23503" | "23514") = db_err.code().as_deref() {
            return AppError::StoreConflict(db_err.message().to_string());
        }
    }
    AppError::DatabaseError(err)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Do not expose internal details in the API response
        error_response(code, self.public_message(), None, status)
    }
}
