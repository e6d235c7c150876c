use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::responses::{ApiResponse, FieldError};
use crate::storage::StorageError;

pub const MSG_REQUIRED: &str = "This field is required";
pub const MSG_NOT_FOUND: &str = "The requested resource was not found";
pub const MSG_UNAUTHORIZED: &str = "You are not authorized to perform this action";
pub const MSG_FORBIDDEN: &str = "You do not have permission to access this resource";
pub const MSG_VALIDATION_FAILED: &str = "Validation failed";

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Migrate(sqlx::migrate::MigrateError),
    Storage(StorageError),
    Hash(String),
    Session(String),
    Unauthorized,
    PermissionDenied(String),
    NotFound,
    BadRequest(String),
    Validation(Vec<FieldError>),
}

impl AppError {
    /// Shorthand for a single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Migrate(e) => write!(f, "Migration error: {e}"),
            AppError::Storage(e) => write!(f, "Storage error: {e}"),
            AppError::Hash(e) => write!(f, "Hash error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::Unauthorized => write!(f, "{MSG_UNAUTHORIZED}"),
            AppError::PermissionDenied(code) => write!(f, "Permission denied: {code}"),
            AppError::NotFound => write!(f, "{MSG_NOT_FOUND}"),
            AppError::BadRequest(msg) => write!(f, "{msg}"),
            AppError::Validation(errors) => write!(f, "{MSG_VALIDATION_FAILED} ({} errors)", errors.len()),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Session(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            AppError::Validation(errors) => {
                ApiResponse::error_response(status, MSG_VALIDATION_FAILED, errors.clone())
            }
            AppError::BadRequest(msg) => ApiResponse::error_response(status, msg.clone(), vec![]),
            AppError::NotFound | AppError::Storage(StorageError::NotFound(_)) => {
                ApiResponse::error_response(status, MSG_NOT_FOUND, vec![])
            }
            AppError::Unauthorized | AppError::Session(_) => {
                ApiResponse::error_response(status, MSG_UNAUTHORIZED, vec![])
            }
            AppError::PermissionDenied(code) => {
                log::warn!("Permission denied: {code}");
                ApiResponse::error_response(status, MSG_FORBIDDEN, vec![])
            }
            _ => {
                log::error!("{self}");
                ApiResponse::error_response(status, "Internal Server Error", vec![])
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound,
            other => AppError::Db(other),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Migrate(e)
    }
}

impl From<crate::audit::AuditError> for AppError {
    fn from(e: crate::audit::AuditError) -> Self {
        match e {
            crate::audit::AuditError::DbError(db) => AppError::Db(db),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Storage(e)
    }
}
