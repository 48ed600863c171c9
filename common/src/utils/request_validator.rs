//! Request validator.
//!
//! Checks a decoded request against the supported database kinds and methods.

use crate::errors::AppError;
use crate::models::{Command, DbType, Method, Request};

/// Validates decoded requests before dispatch.
pub struct RequestValidator;

impl RequestValidator {
    /// Validates a request and resolves its kind and method.
    ///
    /// # Errors
    /// Returns `AppError::UnsupportedDatabaseType` for an unknown `dbKind`,
    /// otherwise `AppError::UnsupportedMethod` for an unknown `method`.
    /// No method accepts an empty body; that is `AppError::MalformedRequest`.
    pub fn validate(req: &Request) -> Result<Command, AppError> {
        let db_type: DbType = req.db_kind.parse()?;
        let method: Method = req.method.parse()?;
        if req.body.trim().is_empty() {
            return Err(AppError::MalformedRequest(format!(
                "empty body for method {}",
                method
            )));
        }
        Ok(Command {
            db_type,
            method,
            body: req.body.clone(),
        })
    }
}
