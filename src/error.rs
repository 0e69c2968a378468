//! Error types for Librarium server

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    NoSuchBorrow = 6,
    AlreadyBorrowed = 7,
    Duplicate = 8,
    BadValue = 9,
    StillBorrowed = 10,
}

/// Entity referenced by a failed lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Book,
    Borrow,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::User => write!(f, "User"),
            Entity::Book => write!(f, "Book"),
            Entity::Borrow => write!(f, "Borrow"),
        }
    }
}

/// State conflicts detected by the stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictKind {
    #[error("Book is already borrowed")]
    AlreadyBorrowed,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Book is currently borrowed and cannot be deleted")]
    BookBorrowed,
    #[error("User has borrowed books that must be returned first")]
    UserHasBorrows,
}

/// Why a request could not be tied to a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("No token provided, access denied")]
    MissingToken,
    #[error("Invalid token, access denied")]
    InvalidToken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User not found, access denied")]
    PrincipalNotFound,
}

/// Per-field validation messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Unauthenticated(AuthFailure),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(Entity),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Validation failed")]
    ValidationFailed(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Validation failure on a single field
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.to_string()]);
        AppError::ValidationFailed(fields)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(AuthFailure::PrincipalNotFound) => StatusCode::FORBIDDEN,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationFailed(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            AppError::Unauthenticated(_) | AppError::Forbidden(_) => ErrorCode::NotAuthorized,
            AppError::NotFound(Entity::User) => ErrorCode::NoSuchUser,
            AppError::NotFound(Entity::Book) => ErrorCode::NoSuchBook,
            AppError::NotFound(Entity::Borrow) => ErrorCode::NoSuchBorrow,
            AppError::Conflict(ConflictKind::AlreadyBorrowed) => ErrorCode::AlreadyBorrowed,
            AppError::Conflict(ConflictKind::EmailTaken) => ErrorCode::Duplicate,
            AppError::Conflict(_) => ErrorCode::StillBorrowed,
            AppError::ValidationFailed(_) | AppError::BadRequest(_) => ErrorCode::BadValue,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        AppError::ValidationFailed(fields)
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Per-field messages, present on validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<HashMap<String, Vec<String>>>)]
    pub fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, fields) = match self {
            AppError::Unauthenticated(reason) => (reason.to_string(), None),
            AppError::Forbidden(msg) | AppError::BadRequest(msg) => (msg, None),
            AppError::NotFound(entity) => (format!("{} not found", entity), None),
            AppError::Conflict(kind) => (kind.to_string(), None),
            AppError::ValidationFailed(fields) => ("Validation failed".to_string(), Some(fields)),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error".to_string(), None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            fields,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
