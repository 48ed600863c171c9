//! Wire reply models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Method echoed when a request could not be decoded.
pub const UNKNOWN_METHOD: &str = "unknown";

/// Outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// Reply written back for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub status: ReplyStatus,
    /// Method echoed from the request, or `unknown`.
    pub method: String,
    /// Payload on success, error description on failure.
    pub body: String,
}

impl Reply {
    /// Creates a success reply.
    pub fn success(method: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Success,
            method: method.into(),
            body: body.into(),
        }
    }

    /// Creates an error reply carrying the error's description.
    pub fn error(method: impl Into<String>, err: impl fmt::Display) -> Self {
        Self {
            status: ReplyStatus::Error,
            method: method.into(),
            body: err.to_string(),
        }
    }

    /// Whether the request succeeded.
    pub fn is_success(&self) -> bool {
        self.status == ReplyStatus::Success
    }
}
