//! Wire request models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::AppError;
use crate::models::connection::DbType;

/// A decoded but not yet validated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Request {
    /// Which database connection to use.
    #[validate(length(min = 1, message = "dbKind is required"))]
    pub db_kind: String,

    /// Operation name.
    #[validate(length(min = 1, message = "method is required"))]
    pub method: String,

    /// Operation payload: a DSN for `connection`, SQL text otherwise.
    pub body: String,
}

/// Supported operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Open and register a handle.
    Connection,
    /// Run a statement, no rows expected.
    Exec,
    /// Run a query and return its rows.
    Query,
}

impl Method {
    /// Every method the gateway accepts.
    pub const ALL: [Method; 3] = [Method::Connection, Method::Exec, Method::Query];

    /// Wire name of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Connection => "connection",
            Method::Exec => "exec",
            Method::Query => "query",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| AppError::UnsupportedMethod(s.to_string()))
    }
}

/// A validated request, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub db_type: DbType,
    pub method: Method,
    pub body: String,
}
