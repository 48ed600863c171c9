//! Error types shared by the gateway.
//!
//! Every failure a client can trigger maps onto one `AppError` variant. The
//! session loop turns these into error replies on the wire; the admin HTTP
//! surface turns them into `ApiResponse` error bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Gateway error taxonomy.
#[derive(Debug, Error)]
pub enum AppError {
    /// Framing violation: fewer than two lines, no colon in the header, empty
    /// header parts or non UTF-8 input.
    #[error("invalid request: {0}")]
    MalformedRequest(String),

    /// `connection` body without a `=`.
    #[error("invalid dsn: {0}")]
    MalformedDsn(String),

    /// `dbKind` outside the supported set.
    #[error("not support db type: {0}")]
    UnsupportedDatabaseType(String),

    /// `method` outside the supported set.
    #[error("not support method: {0}")]
    UnsupportedMethod(String),

    /// No handle registered for the requested `dbKind`.
    #[error("no db connection: {0}")]
    NoConnection(String),

    /// The backend refused to open a handle.
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    /// The backend rejected an exec or query.
    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    /// A result could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable machine-readable code for logs and admin responses.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MalformedRequest(_) => "MALFORMED_REQUEST",
            AppError::MalformedDsn(_) => "MALFORMED_DSN",
            AppError::UnsupportedDatabaseType(_) => "UNSUPPORTED_DATABASE_TYPE",
            AppError::UnsupportedMethod(_) => "UNSUPPORTED_METHOD",
            AppError::NoConnection(_) => "NO_CONNECTION",
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION",
            AppError::DatabaseQuery(_) => "DATABASE_QUERY",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether the error originates from the database backend.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseConnection(_) | AppError::DatabaseQuery(_)
        )
    }

    /// HTTP status used by the admin surface.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MalformedRequest(_)
            | AppError::MalformedDsn(_)
            | AppError::UnsupportedDatabaseType(_)
            | AppError::UnsupportedMethod(_) => StatusCode::BAD_REQUEST,
            AppError::NoConnection(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseConnection(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseQuery(_)
            | AppError::Serialization(_)
            | AppError::Io(_)
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
